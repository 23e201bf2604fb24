//! Convergence tracking
//!
//! Iteration history, progress transitions, stop decisions and run summaries.

pub mod convergence;
pub mod types;

pub use convergence::{ConvergenceConfig, ConvergenceController};
pub use types::{
    IterationDecision, IterationInput, IterationRecord, ProgressState, ProgressStatus, RunStatus,
    RunSummary, StopReason,
};
