//! Convergence control for the fix/re-test loop
//!
//! Keeps an append-only history of iteration failure counts and decides,
//! after each new record, whether another iteration is warranted.

use crate::analysis::types::{
    HistoryFile, IterationDecision, IterationInput, IterationRecord, ProgressState,
    ProgressStatus, RunStatus, RunSummary, StopReason, RESERVED_KEYS,
};
use crate::applier::write_atomic;
use crate::classifier::round2;
use crate::errors::{FixError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Convergence controller configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvergenceConfig {
    /// Hard cap on recorded iterations
    pub max_iterations: usize,

    /// Number of trailing iterations that must share one nonzero failure
    /// count to be considered a plateau
    pub no_progress_window: usize,
}

impl Default for ConvergenceConfig {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            no_progress_window: 3,
        }
    }
}

/// Convergence controller over an append-only iteration history
#[derive(Debug, Clone)]
pub struct ConvergenceController {
    config: ConvergenceConfig,
    history: Vec<IterationRecord>,
}

impl ConvergenceController {
    /// Create controller with default configuration
    pub fn new() -> Self {
        Self::with_config(ConvergenceConfig::default())
    }

    /// Create controller with custom configuration
    pub fn with_config(config: ConvergenceConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
        }
    }

    /// Load a persisted history; a missing file starts a new run
    pub fn load(path: &Path, config: ConvergenceConfig) -> Result<Self> {
        let mut controller = Self::with_config(config);
        if !path.exists() {
            return Ok(controller);
        }

        let contents = std::fs::read_to_string(path)?;
        let file: HistoryFile = serde_json::from_str(&contents)?;

        for (index, record) in file.iterations.iter().enumerate() {
            if record.iteration as usize != index + 1 {
                return Err(FixError::Generic(format!(
                    "History {} is out of sequence at entry {}",
                    path.display(),
                    index + 1
                )));
            }
        }

        controller.history = file.iterations;
        tracing::debug!(path = %path.display(), iterations = controller.history.len(), "Loaded history");
        Ok(controller)
    }

    /// Persist the history
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = HistoryFile {
            iterations: self.history.clone(),
        };
        write_atomic(path, serde_json::to_string_pretty(&file)?.as_bytes())
    }

    /// Append an iteration and decide whether to continue
    pub fn record_iteration(&mut self, input: IterationInput) -> IterationDecision {
        let mut metrics = input.metrics;
        for key in RESERVED_KEYS {
            metrics.remove(key);
        }

        let record = IterationRecord {
            iteration: self.history.len() as u32 + 1,
            timestamp: Utc::now(),
            failure_count: input.failure_count,
            metrics,
        };
        self.history.push(record.clone());

        let progress = self.progress();
        let stop_reason = self.stop_reason();

        tracing::info!(
            iteration = record.iteration,
            failures = record.failure_count,
            status = ?progress.status,
            should_continue = stop_reason.is_none(),
            "Recorded iteration"
        );

        IterationDecision {
            iteration: record,
            progress,
            should_continue: stop_reason.is_none(),
            stop_reason,
        }
    }

    /// Transition between the two latest records
    pub fn progress(&self) -> ProgressState {
        let [.., previous, current] = self.history.as_slice() else {
            return ProgressState {
                status: ProgressStatus::Initial,
                message: "First iteration - no comparison yet".to_string(),
                improvement: None,
                regression: None,
            };
        };

        let (before, after) = (previous.failure_count, current.failure_count);
        if after < before {
            ProgressState {
                status: ProgressStatus::Improving,
                message: format!("Failures decreased from {} to {}", before, after),
                improvement: Some(before - after),
                regression: None,
            }
        } else if after > before {
            ProgressState {
                status: ProgressStatus::Regressing,
                message: format!("Failures increased from {} to {}", before, after),
                improvement: None,
                regression: Some(after - before),
            }
        } else {
            ProgressState {
                status: ProgressStatus::NoChange,
                message: format!("Failures unchanged at {}", after),
                improvement: None,
                regression: None,
            }
        }
    }

    /// Reason to stop after the latest record, if any.
    ///
    /// Checked in order: iteration cap, regression, insufficient history,
    /// plateau.
    pub fn stop_reason(&self) -> Option<StopReason> {
        let recorded = self.history.len();

        if recorded >= self.config.max_iterations {
            return Some(StopReason::MaxIterations);
        }

        if self.progress().status == ProgressStatus::Regressing {
            return Some(StopReason::Regression);
        }

        let window = self.config.no_progress_window;
        if recorded < window {
            return None;
        }

        let recent = &self.history[recorded - window..];
        let first = recent.first()?.failure_count;
        if first > 0 && recent.iter().all(|r| r.failure_count == first) {
            return Some(StopReason::Plateau);
        }

        None
    }

    /// Whether another iteration is warranted
    pub fn should_continue(&self) -> bool {
        self.stop_reason().is_none()
    }

    /// Summary derived from the full history
    pub fn summary(&self) -> RunSummary {
        let (Some(first), Some(last)) = (self.history.first(), self.history.last()) else {
            return RunSummary {
                iterations: 0,
                initial_failures: 0,
                current_failures: 0,
                total_improvement: 0,
                improvement_rate: 0.0,
                improvements: 0,
                regressions: 0,
                no_changes: 0,
                status: RunStatus::NoIterations,
            };
        };

        let initial = first.failure_count;
        let current = last.failure_count;
        let improvement = initial as i64 - current as i64;

        let (mut improvements, mut regressions, mut no_changes) = (0, 0, 0);
        for pair in self.history.windows(2) {
            let (before, after) = (pair[0].failure_count, pair[1].failure_count);
            if after < before {
                improvements += 1;
            } else if after > before {
                regressions += 1;
            } else {
                no_changes += 1;
            }
        }

        let improvement_rate = if initial > 0 {
            round2(improvement as f64 / initial as f64 * 100.0)
        } else {
            0.0
        };

        let status = if current == 0 {
            RunStatus::Success
        } else if improvement > 0 {
            RunStatus::InProgress
        } else {
            RunStatus::Stalled
        };

        RunSummary {
            iterations: self.history.len(),
            initial_failures: initial,
            current_failures: current,
            total_improvement: improvement,
            improvement_rate,
            improvements,
            regressions,
            no_changes,
            status,
        }
    }

    /// Recorded iterations, oldest first
    pub fn history(&self) -> &[IterationRecord] {
        &self.history
    }

    /// Get configuration
    pub fn config(&self) -> &ConvergenceConfig {
        &self.config
    }
}

impl Default for ConvergenceController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tempfile::TempDir;

    fn failures(count: u64) -> IterationInput {
        IterationInput {
            failure_count: count,
            ..Default::default()
        }
    }

    fn run(counts: &[u64]) -> (ConvergenceController, Vec<IterationDecision>) {
        let mut controller = ConvergenceController::new();
        let decisions = counts
            .iter()
            .map(|c| controller.record_iteration(failures(*c)))
            .collect();
        (controller, decisions)
    }

    #[test]
    fn test_first_iteration_is_initial() {
        let (_, decisions) = run(&[10]);
        assert_eq!(decisions[0].progress.status, ProgressStatus::Initial);
        assert_eq!(decisions[0].iteration.iteration, 1);
        assert!(decisions[0].should_continue);
    }

    #[test]
    fn test_plateau_stops() {
        let (_, decisions) = run(&[10, 7, 7, 7]);
        let flags: Vec<bool> = decisions.iter().map(|d| d.should_continue).collect();
        assert_eq!(flags, vec![true, true, true, false]);
        assert_eq!(decisions[3].stop_reason, Some(StopReason::Plateau));
        assert_eq!(decisions[3].progress.status, ProgressStatus::NoChange);
    }

    #[test]
    fn test_regression_stops_immediately() {
        let (_, decisions) = run(&[10, 12]);
        assert!(!decisions[1].should_continue);
        assert_eq!(decisions[1].stop_reason, Some(StopReason::Regression));
        assert_eq!(decisions[1].progress.regression, Some(2));
    }

    #[test]
    fn test_zero_plateau_continues() {
        let (_, decisions) = run(&[3, 0, 0, 0]);
        assert!(decisions.iter().all(|d| d.should_continue));
    }

    #[test]
    fn test_max_iterations() {
        let config = ConvergenceConfig {
            max_iterations: 3,
            no_progress_window: 3,
        };
        let mut controller = ConvergenceController::with_config(config);
        controller.record_iteration(failures(9));
        controller.record_iteration(failures(8));
        let decision = controller.record_iteration(failures(7));

        assert!(!decision.should_continue);
        assert_eq!(decision.stop_reason, Some(StopReason::MaxIterations));
    }

    #[test]
    fn test_reserved_metric_keys_dropped() {
        let mut controller = ConvergenceController::new();
        let mut input = failures(4);
        input.metrics.insert("iteration".to_string(), Value::from(99));
        input.metrics.insert("applied".to_string(), Value::from(2));

        let decision = controller.record_iteration(input);
        assert_eq!(decision.iteration.iteration, 1);
        assert!(!decision.iteration.metrics.contains_key("iteration"));
        assert_eq!(decision.iteration.metrics.get("applied"), Some(&Value::from(2)));
    }

    #[test]
    fn test_summary_counts() {
        let (controller, _) = run(&[10, 7, 7, 9, 4]);
        let summary = controller.summary();

        assert_eq!(summary.iterations, 5);
        assert_eq!(summary.initial_failures, 10);
        assert_eq!(summary.current_failures, 4);
        assert_eq!(summary.total_improvement, 6);
        assert_eq!(summary.improvement_rate, 60.0);
        assert_eq!(summary.improvements, 2);
        assert_eq!(summary.regressions, 1);
        assert_eq!(summary.no_changes, 1);
        assert_eq!(summary.status, RunStatus::InProgress);
    }

    #[test]
    fn test_summary_statuses() {
        assert_eq!(ConvergenceController::new().summary().status, RunStatus::NoIterations);
        assert_eq!(run(&[5, 0]).0.summary().status, RunStatus::Success);
        assert_eq!(run(&[5, 6]).0.summary().status, RunStatus::Stalled);

        let zero_start = run(&[0]).0.summary();
        assert_eq!(zero_start.improvement_rate, 0.0);
        assert_eq!(zero_start.status, RunStatus::Success);
    }

    #[test]
    fn test_improvement_rate_rounding() {
        let summary = run(&[3, 2]).0.summary();
        assert_eq!(summary.improvement_rate, 33.33);
    }

    #[test]
    fn test_save_and_load_history() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state").join("history.json");

        let (controller, _) = run(&[10, 7]);
        controller.save(&path).unwrap();

        let mut restored = ConvergenceController::load(&path, ConvergenceConfig::default()).unwrap();
        assert_eq!(restored.history(), controller.history());

        let decision = restored.record_iteration(failures(7));
        assert_eq!(decision.iteration.iteration, 3);
        assert_eq!(decision.progress.status, ProgressStatus::NoChange);
    }

    #[test]
    fn test_load_missing_history() {
        let temp = TempDir::new().unwrap();
        let controller =
            ConvergenceController::load(&temp.path().join("none.json"), ConvergenceConfig::default())
                .unwrap();
        assert!(controller.history().is_empty());
    }
}
