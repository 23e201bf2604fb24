//! Applier type definitions

use crate::proposer::FixCandidate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a candidate was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// The owning failure's confidence is below threshold
    FailureBelowThreshold,
    /// The candidate's own confidence is below threshold
    BelowThreshold,
    /// No target file could be determined
    PathUnresolvable,
    /// Target matches a protected-path rule or lies outside the root
    ProtectedFile,
    FileNotFound,
    /// Post-edit verification rejected the change; file restored
    VerificationFailed,
    /// Edit kind is not implemented (fix-assertion)
    Unsupported,
    /// Edit would not change the file
    NoOp,
    /// Read/transform/write failed; file restored
    MutationFailed,
    /// Snapshot could not be taken; file untouched
    BackupFailed,
}

impl SkipReason {
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::FailureBelowThreshold => "failure-below-threshold",
            SkipReason::BelowThreshold => "below-threshold",
            SkipReason::PathUnresolvable => "path-unresolvable",
            SkipReason::ProtectedFile => "protected-file",
            SkipReason::FileNotFound => "file-not-found",
            SkipReason::VerificationFailed => "verification-failed",
            SkipReason::Unsupported => "unsupported",
            SkipReason::NoOp => "no-op",
            SkipReason::MutationFailed => "mutation-failed",
            SkipReason::BackupFailed => "backup-failed",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Final state of one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Applied,
    Skipped,
}

/// Exactly one per candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixOutcome {
    pub failure_id: String,
    pub fix: FixCandidate,
    pub status: OutcomeStatus,

    /// Human-readable skip reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<SkipReason>,

    /// Resolved root-relative target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Root-relative snapshot kept for rollback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup: Option<String>,
}

impl FixOutcome {
    pub fn applied(
        failure_id: impl Into<String>,
        fix: FixCandidate,
        file: String,
        backup: Option<String>,
    ) -> Self {
        Self {
            failure_id: failure_id.into(),
            fix,
            status: OutcomeStatus::Applied,
            reason: None,
            reason_code: None,
            file: Some(file),
            backup,
        }
    }

    pub fn skipped(
        failure_id: impl Into<String>,
        fix: FixCandidate,
        code: SkipReason,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            failure_id: failure_id.into(),
            fix,
            status: OutcomeStatus::Skipped,
            reason: Some(reason.into()),
            reason_code: Some(code),
            file: None,
            backup: None,
        }
    }

    /// Attach the resolved target path
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn is_applied(&self) -> bool {
        self.status == OutcomeStatus::Applied
    }
}

/// Run-level counts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySummary {
    pub total_fixes: usize,
    pub applied: usize,
    pub skipped: usize,
}

/// Applier output for one batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyReport {
    pub applied: Vec<FixOutcome>,
    pub skipped: Vec<FixOutcome>,
    pub summary: ApplySummary,
}

impl ApplyReport {
    /// Split outcomes into applied/skipped lists and count them
    pub fn from_outcomes(outcomes: Vec<FixOutcome>) -> Self {
        let (applied, skipped): (Vec<FixOutcome>, Vec<FixOutcome>) =
            outcomes.into_iter().partition(FixOutcome::is_applied);

        let summary = ApplySummary {
            total_fixes: applied.len() + skipped.len(),
            applied: applied.len(),
            skipped: skipped.len(),
        };

        Self {
            applied,
            skipped,
            summary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposer::{ChangePayload, FixKind};

    fn candidate() -> FixCandidate {
        FixCandidate::new(
            FixKind::AddImport,
            "Add missing import",
            None,
            ChangePayload::text("import a.B;"),
            "top_of_file",
            0.95,
        )
    }

    #[test]
    fn test_report_partition() {
        let report = ApplyReport::from_outcomes(vec![
            FixOutcome::applied("a", candidate(), "A.java".to_string(), None),
            FixOutcome::skipped("b", candidate(), SkipReason::NoOp, "already present"),
            FixOutcome::skipped("c", candidate(), SkipReason::ProtectedFile, "File is protected"),
        ]);

        assert_eq!(report.summary.total_fixes, 3);
        assert_eq!(report.summary.applied, 1);
        assert_eq!(report.summary.skipped, 2);
        assert_eq!(report.skipped[1].reason_code, Some(SkipReason::ProtectedFile));
    }

    #[test]
    fn test_skip_reason_wire_name() {
        let json = serde_json::to_string(&SkipReason::VerificationFailed).unwrap();
        assert_eq!(json, "\"verification-failed\"");
        assert_eq!(SkipReason::NoOp.to_string(), "no-op");
    }
}
