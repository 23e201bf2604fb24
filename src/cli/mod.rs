//! CLI module for fixpilot
//!
//! Handles command-line argument parsing.

pub mod args;

pub use crate::telemetry::Verbosity;
pub use args::{Args, Commands, TrackCommand};
