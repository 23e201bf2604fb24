//! Logging setup for fixpilot
//!
//! Installs a tracing subscriber writing to stderr so reports printed on
//! stdout stay machine-readable. `RUST_LOG` overrides the level chosen from
//! the command-line verbosity.

use crate::errors::{FixError, Result};
use std::io;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
}

impl Verbosity {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "quiet",
            Verbosity::Normal => "normal",
            Verbosity::Verbose => "verbose",
            Verbosity::VeryVerbose => "very_verbose",
        }
    }

    /// Parse the configuration file spelling
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "quiet" => Some(Verbosity::Quiet),
            "normal" => Some(Verbosity::Normal),
            "verbose" => Some(Verbosity::Verbose),
            "very_verbose" => Some(Verbosity::VeryVerbose),
            _ => None,
        }
    }

    /// Default log level when `RUST_LOG` is unset
    pub fn level(&self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::ERROR,
            Verbosity::Normal => LevelFilter::WARN,
            Verbosity::Verbose => LevelFilter::INFO,
            Verbosity::VeryVerbose => LevelFilter::DEBUG,
        }
    }

    /// Whether human-readable summaries should be printed
    pub fn show_summary(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

/// Install the global subscriber
pub fn init(verbosity: Verbosity, json: bool) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.level().into())
        .from_env_lossy();

    let layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(io::stderr)
            .with_target(true)
            .with_filter(filter)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stderr)
            .with_target(false)
            .with_filter(filter)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| FixError::Config(format!("Failed to initialize logging: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_names_roundtrip() {
        for verbosity in [
            Verbosity::Quiet,
            Verbosity::Normal,
            Verbosity::Verbose,
            Verbosity::VeryVerbose,
        ] {
            assert_eq!(Verbosity::from_name(verbosity.as_str()), Some(verbosity));
        }
        assert_eq!(Verbosity::from_name("loud"), None);
    }

    #[test]
    fn test_levels() {
        assert_eq!(Verbosity::Quiet.level(), LevelFilter::ERROR);
        assert_eq!(Verbosity::VeryVerbose.level(), LevelFilter::DEBUG);
        assert!(!Verbosity::Quiet.show_summary());
    }
}
