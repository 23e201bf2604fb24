//! Type definitions module
//!
//! The normalized failure record and batch ingestion.

pub mod failure;
pub mod ingest;

// Re-export commonly used types
pub use failure::{FailureContext, FailureRecord};
pub use ingest::{ingest_failures, IngestReport, RejectedRecord};
