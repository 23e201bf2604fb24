//! Failure classification system
//! Maps raw failures to a category, confidence score and priority rank

pub mod classifier;
pub mod types;

pub use classifier::{ProblemClassifier, HIGH_CONFIDENCE, MEDIUM_CONFIDENCE};
pub(crate) use classifier::round2;
pub use types::{AnalysisReport, AnalysisStatistics, ClassifiedFailure, FailureCategory};
