//! fixpilot - Autonomous Test-Failure Fix Loop
//!
//! Triage and repair of failing tests in a CI loop: failures are classified,
//! fixes proposed and applied under a protected-path policy, and a
//! convergence controller decides whether another iteration is warranted.
//!
//! # Architecture
//!
//! - **types**: normalized failure records and batch ingestion
//! - **classifier**: keyword-table categories, confidence and priority
//! - **proposer**: candidate fixes from failure text and repository lookups
//! - **applier**: guarded, snapshot-protected file edits
//! - **analysis**: iteration history and stop decisions

pub mod errors;
pub mod types;
pub mod classifier;
pub mod proposer;
pub mod applier;
pub mod analysis;
pub mod pipeline;

// Re-export commonly used types
pub use errors::{FixError, Result};

// Interface layer
pub mod telemetry;
pub mod cli;
pub mod config;
