//! Guarded applier
//!
//! Enforces confidence thresholds and protected paths, then edits files
//! under a snapshot with optional post-edit verification.

pub mod applier;
pub mod backup;
pub mod edits;
pub mod guard;
pub mod types;
pub mod verify;

pub use applier::{ApplierConfig, GuardedApplier};
pub use backup::{write_atomic, FileBackup};
pub use edits::Edit;
pub use guard::{PathVerdict, ProtectedPaths};
pub use types::{ApplyReport, ApplySummary, FixOutcome, OutcomeStatus, SkipReason};
pub use verify::{AcceptAll, CommandVerifier, Verifier};
