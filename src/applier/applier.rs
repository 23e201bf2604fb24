//! Guarded fix application
//!
//! Gates every candidate (failure confidence, candidate confidence, target
//! resolution, protected paths), then edits under a snapshot: the target
//! ends either edited and verified, or byte-identical to how it started.

use crate::applier::backup::{write_atomic, FileBackup};
use crate::applier::edits::{self, Edit};
use crate::applier::guard::{PathVerdict, ProtectedPaths};
use crate::applier::types::{ApplyReport, FixOutcome, SkipReason};
use crate::applier::verify::{AcceptAll, CommandVerifier, Verifier};
use crate::errors::{FixError, Result};
use crate::proposer::{
    ChangePayload, DependencyCoordinates, EditKind, FixCandidate, RepositoryContext,
    RepositoryLayout, Solution,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Applier configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplierConfig {
    /// Minimum failure and candidate confidence to apply
    pub confidence_threshold: f64,

    /// Protected-path rules file, relative to the repository root
    pub protected_rules_file: String,

    /// Build check run after editing a source file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify_command: Option<Vec<String>>,

    /// Keep snapshots of applied edits
    pub keep_backups: bool,
}

impl Default for ApplierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.90,
            protected_rules_file: "scripts/agents/qa-protected-files.txt".to_string(),
            verify_command: None,
            keep_backups: true,
        }
    }
}

/// Why a mutation attempt ended without an applied edit
struct Declined {
    code: SkipReason,
    reason: String,
}

impl Declined {
    fn new(code: SkipReason, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }
}

/// Applies candidates under the protected-path policy
pub struct GuardedApplier {
    guard: ProtectedPaths,
    repo: RepositoryContext,
    verifier: Box<dyn Verifier>,
    keep_backups: bool,
}

impl GuardedApplier {
    /// Create applier that accepts every edit without verification
    pub fn new(guard: ProtectedPaths, layout: RepositoryLayout) -> Self {
        let repo = RepositoryContext::new(guard.root().to_path_buf(), layout);
        Self {
            guard,
            repo,
            verifier: Box::new(AcceptAll),
            keep_backups: true,
        }
    }

    /// Build from configuration: rules file under `root`, optional
    /// verification command
    pub fn from_config(root: &Path, config: &ApplierConfig, layout: RepositoryLayout) -> Result<Self> {
        let guard = ProtectedPaths::load(root, Path::new(&config.protected_rules_file))?;
        let services_dir = layout.services_dir.clone();
        let mut applier = Self::new(guard, layout).with_keep_backups(config.keep_backups);

        if let Some(argv) = &config.verify_command {
            applier = applier.with_verifier(Box::new(CommandVerifier::new(argv.clone(), services_dir)?));
        }

        Ok(applier)
    }

    /// Replace the verifier
    pub fn with_verifier(mut self, verifier: Box<dyn Verifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Keep or discard snapshots of applied edits
    pub fn with_keep_backups(mut self, keep: bool) -> Self {
        self.keep_backups = keep;
        self
    }

    /// Protected-path policy in force
    pub fn guard(&self) -> &ProtectedPaths {
        &self.guard
    }

    /// Apply every candidate of every solution; one outcome per candidate
    pub fn apply(&self, solutions: &[Solution], threshold: f64) -> ApplyReport {
        tracing::info!(solutions = solutions.len(), threshold, "Applying fixes");

        let mut outcomes = Vec::new();
        for solution in solutions {
            if !(solution.confidence >= threshold) {
                tracing::debug!(
                    failure_id = %solution.failure_id,
                    confidence = solution.confidence,
                    "Failure below threshold"
                );
                for fix in &solution.suggested_fixes {
                    outcomes.push(FixOutcome::skipped(
                        &solution.failure_id,
                        fix.clone(),
                        SkipReason::FailureBelowThreshold,
                        format!(
                            "Confidence {} below threshold {}",
                            solution.confidence, threshold
                        ),
                    ));
                }
                continue;
            }

            for fix in &solution.suggested_fixes {
                outcomes.push(self.apply_candidate(solution, fix, threshold));
            }
        }

        let report = ApplyReport::from_outcomes(outcomes);
        tracing::info!(
            total = report.summary.total_fixes,
            applied = report.summary.applied,
            skipped = report.summary.skipped,
            "Fix application complete"
        );
        report
    }

    /// Gate and apply one candidate of an eligible failure
    pub fn apply_candidate(&self, solution: &Solution, fix: &FixCandidate, threshold: f64) -> FixOutcome {
        let failure_id = solution.failure_id.as_str();

        if !(fix.confidence >= threshold) {
            return FixOutcome::skipped(
                failure_id,
                fix.clone(),
                SkipReason::BelowThreshold,
                format!("Fix confidence {} below threshold {}", fix.confidence, threshold),
            );
        }

        let Some(target) = self.resolve_target(solution, fix) else {
            return FixOutcome::skipped(
                failure_id,
                fix.clone(),
                SkipReason::PathUnresolvable,
                "Could not determine file path",
            );
        };

        let (relative, absolute) = match self.guard.check(&target) {
            PathVerdict::Allowed { relative, absolute } => (relative, absolute),
            PathVerdict::Protected { reason } => {
                tracing::info!(failure_id, file = %target, "Skipping protected file");
                return FixOutcome::skipped(failure_id, fix.clone(), SkipReason::ProtectedFile, reason)
                    .with_file(target);
            }
        };

        match self.mutate(fix, &relative, &absolute) {
            Ok(backup) => {
                tracing::info!(failure_id, file = %relative, kind = ?fix.kind, "Applied fix");
                FixOutcome::applied(failure_id, fix.clone(), relative, backup)
            }
            Err(declined) => {
                tracing::debug!(
                    failure_id,
                    file = %relative,
                    reason = %declined.code,
                    "Fix not applied"
                );
                FixOutcome::skipped(failure_id, fix.clone(), declined.code, declined.reason)
                    .with_file(relative)
            }
        }
    }

    /// Candidate file, else the failure's source file, else a test file
    /// found from the failure id
    fn resolve_target(&self, solution: &Solution, fix: &FixCandidate) -> Option<String> {
        fix.file
            .clone()
            .or_else(|| {
                solution
                    .failure
                    .failure
                    .source_file
                    .clone()
                    .filter(|f| !f.is_empty())
            })
            .or_else(|| self.repo.find_test_file(&solution.failure_id))
    }

    /// Snapshot, edit, verify. Returns the kept snapshot reference.
    fn mutate(
        &self,
        fix: &FixCandidate,
        relative: &str,
        absolute: &Path,
    ) -> std::result::Result<Option<String>, Declined> {
        let kind = fix.kind.edit_kind();
        if kind == EditKind::FixAssertion {
            return Err(Declined::new(
                SkipReason::Unsupported,
                "Assertion rewriting is not supported; left unchanged",
            ));
        }

        if !absolute.is_file() {
            return Err(Declined::new(
                SkipReason::FileNotFound,
                format!("File not found: {}", relative),
            ));
        }

        let content = fs::read_to_string(absolute)
            .map_err(|e| Declined::new(SkipReason::MutationFailed, format!("Failed to read {}: {}", relative, e)))?;

        let updated = match transform(kind, &content, fix) {
            Ok(Edit::Changed(updated)) => updated,
            Ok(Edit::Unchanged) => {
                return Err(Declined::new(
                    SkipReason::NoOp,
                    format!("No change needed in {}", relative),
                ))
            }
            Err(e) => return Err(Declined::new(SkipReason::MutationFailed, e.to_string())),
        };

        let backup = FileBackup::create(absolute)
            .map_err(|e| Declined::new(SkipReason::BackupFailed, e.to_string()))?;

        if let Err(e) = write_atomic(absolute, updated.as_bytes()) {
            return Err(rolled_back(backup, SkipReason::MutationFailed, e.to_string()));
        }

        if self.needs_verification(relative) {
            if let Err(e) = self.verifier.verify(self.guard.root(), relative) {
                tracing::warn!(file = %relative, error = %e, "Verification failed, restoring snapshot");
                return Err(rolled_back(backup, SkipReason::VerificationFailed, e.to_string()));
            }
        }

        Ok(settle(backup, self.keep_backups, relative))
    }

    fn needs_verification(&self, relative: &str) -> bool {
        Path::new(relative)
            .extension()
            .map_or(false, |ext| ext == self.repo.layout().source_extension.as_str())
    }
}

/// Restore the snapshot and describe the failure that caused it
fn rolled_back(backup: FileBackup, code: SkipReason, cause: String) -> Declined {
    match backup.restore() {
        Ok(()) => Declined::new(code, cause),
        Err(restore) => Declined::new(
            SkipReason::MutationFailed,
            format!("{}; restore failed: {}", cause, restore),
        ),
    }
}

/// Accept an edit that was written and verified. A snapshot that cannot
/// be discarded does not undo the edit, so it is only logged.
fn settle(backup: FileBackup, keep: bool, relative: &str) -> Option<String> {
    match backup.commit(keep) {
        Ok(kept) => kept.and_then(|path| backup_reference(relative, &path)),
        Err(e) => {
            tracing::warn!(file = %relative, error = %e, "Edit applied but snapshot was not discarded");
            None
        }
    }
}

/// Root-relative path of a snapshot that sits next to `relative`
fn backup_reference(relative: &str, backup: &Path) -> Option<String> {
    let name = backup.file_name()?.to_string_lossy().into_owned();
    let path: PathBuf = Path::new(relative).with_file_name(name);
    Some(path.to_string_lossy().replace('\\', "/"))
}

/// Apply the edit for `kind` to `content`
fn transform(kind: EditKind, content: &str, fix: &FixCandidate) -> Result<Edit> {
    Ok(match kind {
        EditKind::AddImport => edits::add_import(content, &fix.change.summary()),
        EditKind::AddDependency => {
            let coords = match &fix.change {
                ChangePayload::Dependency(coords) => coords.clone(),
                ChangePayload::Text { text } => DependencyCoordinates::from_xml(text).ok_or_else(|| {
                    FixError::Generic("Dependency change lacks groupId/artifactId/version".to_string())
                })?,
            };
            edits::add_dependency(content, &coords)
        }
        EditKind::AddNullCheck => edits::add_null_check(content, &fix.change.summary()),
        EditKind::GenericAnnotate => edits::annotate(content, &fix.change.summary()),
        EditKind::FixAssertion => Edit::Unchanged,
    })
}
