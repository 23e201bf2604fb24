//! Convergence tracking type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Keys owned by `IterationRecord` that caller metrics may not shadow
pub(crate) const RESERVED_KEYS: [&str; 3] = ["iteration", "timestamp", "failureCount"];

/// One fix/re-test iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationRecord {
    /// 1-based, strictly increasing
    pub iteration: u32,

    pub timestamp: DateTime<Utc>,

    /// Failures observed at iteration start
    pub failure_count: u64,

    /// Caller-supplied metrics
    #[serde(flatten)]
    pub metrics: BTreeMap<String, Value>,
}

/// Caller input for one iteration: a failure count plus arbitrary metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationInput {
    #[serde(default)]
    pub failure_count: u64,

    #[serde(flatten)]
    pub metrics: BTreeMap<String, Value>,
}

/// Transition between the two latest records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    /// Zero or one record
    Initial,
    Improving,
    Regressing,
    NoChange,
}

/// Progress status with a human-readable message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressState {
    pub status: ProgressStatus,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub improvement: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regression: Option<u64>,
}

/// Why the loop should stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxIterations,
    Regression,
    Plateau,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::MaxIterations => "maximum iterations reached",
            StopReason::Regression => "failures increased",
            StopReason::Plateau => "no progress across the window",
        };
        f.write_str(text)
    }
}

/// Result of recording an iteration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationDecision {
    pub iteration: IterationRecord,
    pub progress: ProgressState,
    pub should_continue: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<StopReason>,
}

/// Terminal classification of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Latest failure count is zero
    Success,
    /// Fewer failures than at the start
    InProgress,
    Stalled,
    NoIterations,
}

/// Derived view over the iteration history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub iterations: usize,
    pub initial_failures: u64,
    pub current_failures: u64,
    pub total_improvement: i64,

    /// Percent of the initial failures resolved, two decimals
    pub improvement_rate: f64,
    pub improvements: usize,
    pub regressions: usize,
    pub no_changes: usize,
    pub status: RunStatus,
}

/// Persisted history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFile {
    #[serde(default)]
    pub iterations: Vec<IterationRecord>,
}
