//! Command-line argument parsing for fixpilot
//!
//! Provides clap-based CLI with one subcommand per fix-loop stage and
//! verbosity control.

use crate::telemetry::Verbosity;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// fixpilot - Classify failing tests, propose fixes and apply them safely
#[derive(Parser, Debug)]
#[command(name = "fixpilot")]
#[command(author = "Jerome (Kubashen) Naidoo")]
#[command(version)]
#[command(about = "Autonomous test-failure triage and guarded fix application", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Repository root (current directory by default)
    #[arg(long, global = true)]
    pub repo: Option<PathBuf>,

    /// Verbosity level: -q (quiet), default (normal), -v (verbose), -vv (very verbose)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only machine-readable output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify failures from a test-results document
    Analyze {
        /// JSON document with a `failures` array
        input: PathBuf,

        /// Write the report here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Propose fixes for an analysis report
    Propose {
        /// Output of `analyze`
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Apply proposed fixes under the protected-path policy
    Apply {
        /// Output of `propose`
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Confidence threshold (overrides configuration)
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,
    },

    /// Classify, propose and apply in one pass
    Iterate {
        /// JSON document with a `failures` array
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,
    },

    /// Track iteration progress
    Track {
        #[command(subcommand)]
        command: TrackCommand,
    },

    /// Display current configuration
    Config,
}

/// Progress tracking subcommands
#[derive(Subcommand, Debug)]
pub enum TrackCommand {
    /// Record an iteration; exits with status 2 when the loop should stop
    Add {
        /// Iteration JSON (`failureCount` plus metrics), or `-` for stdin
        input: String,

        /// History file shared across invocations
        #[arg(long)]
        state: PathBuf,
    },

    /// Summarize the recorded run
    Summary {
        #[arg(long)]
        state: PathBuf,
    },
}

/// Confidence threshold in [0, 1]
fn parse_threshold(value: &str) -> Result<f64, String> {
    let threshold: f64 = value
        .parse()
        .map_err(|e| format!("invalid number '{}': {}", value, e))?;
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(format!("threshold must be between 0.0 and 1.0, got {}", value))
    }
}

impl Args {
    /// Get verbosity level based on flags, falling back to `default`
    pub fn verbosity(&self, default: Verbosity) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => default,
                1 => Verbosity::Verbose,
                _ => Verbosity::VeryVerbose,
            }
        }
    }

    /// Get repository root (current dir if not specified)
    pub fn repo_root(&self) -> PathBuf {
        self.repo.clone().unwrap_or_else(|| {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_quiet() {
        let args = Args::try_parse_from(["fixpilot", "-q", "config"]).unwrap();
        assert_eq!(args.verbosity(Verbosity::Normal), Verbosity::Quiet);
    }

    #[test]
    fn test_verbosity_default_and_counts() {
        let args = Args::try_parse_from(["fixpilot", "config"]).unwrap();
        assert_eq!(args.verbosity(Verbosity::Normal), Verbosity::Normal);

        let args = Args::try_parse_from(["fixpilot", "-v", "config"]).unwrap();
        assert_eq!(args.verbosity(Verbosity::Normal), Verbosity::Verbose);

        let args = Args::try_parse_from(["fixpilot", "config", "-vv"]).unwrap();
        assert_eq!(args.verbosity(Verbosity::Normal), Verbosity::VeryVerbose);
    }

    #[test]
    fn test_apply_threshold() {
        let args =
            Args::try_parse_from(["fixpilot", "apply", "solutions.json", "--threshold", "0.8"])
                .unwrap();
        match args.command {
            Commands::Apply {
                input, threshold, ..
            } => {
                assert_eq!(input, PathBuf::from("solutions.json"));
                assert_eq!(threshold, Some(0.8));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        for bad in ["NaN", "-0.1", "1.5", "inf", "high"] {
            assert!(
                Args::try_parse_from(["fixpilot", "apply", "s.json", "--threshold", bad]).is_err(),
                "accepted {}",
                bad
            );
            assert!(
                Args::try_parse_from(["fixpilot", "iterate", "r.json", "--threshold", bad]).is_err(),
                "accepted {}",
                bad
            );
        }
        assert!(Args::try_parse_from(["fixpilot", "apply", "s.json", "--threshold", "1"]).is_ok());
    }

    #[test]
    fn test_track_add_requires_state() {
        assert!(Args::try_parse_from(["fixpilot", "track", "add", "-"]).is_err());

        let args = Args::try_parse_from([
            "fixpilot", "track", "add", "-", "--state", "history.json",
        ])
        .unwrap();
        assert!(matches!(
            args.command,
            Commands::Track {
                command: TrackCommand::Add { .. }
            }
        ));
    }

    #[test]
    fn test_repo_root_override() {
        let args = Args::try_parse_from(["fixpilot", "--repo", "/srv/repo", "config"]).unwrap();
        assert_eq!(args.repo_root(), PathBuf::from("/srv/repo"));
    }
}
