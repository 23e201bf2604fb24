//! Solution proposer
//!
//! Turns classified failures into fix candidates by pattern-matching the
//! failure text and searching the repository for concrete targets.

pub mod diagnostics;
pub mod proposer;
pub mod repository;
pub mod types;

pub use diagnostics::{DiagnosticPatterns, JvmDiagnostics};
pub use proposer::SolutionProposer;
pub use repository::{RepositoryContext, RepositoryLayout};
pub use types::{
    ChangePayload, DependencyCoordinates, EditKind, FixCandidate, FixKind, ProposalReport,
    ProposalSummary, Solution,
};
