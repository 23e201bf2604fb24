//! One fix iteration end to end
//!
//! classify → propose → apply. Re-running the tests and recording the new
//! failure count is left to the caller.

use crate::applier::{ApplyReport, GuardedApplier};
use crate::classifier::{AnalysisReport, ProblemClassifier};
use crate::config::Config;
use crate::errors::Result;
use crate::proposer::{ProposalReport, RepositoryContext, SolutionProposer};
use crate::types::{FailureRecord, RejectedRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Reports of every stage of one iteration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationReport {
    pub analysis: AnalysisReport,
    pub proposals: ProposalReport,
    pub apply: ApplyReport,
}

/// Classifier, proposer and applier wired to one repository
pub struct FixPipeline {
    classifier: ProblemClassifier,
    proposer: SolutionProposer,
    applier: GuardedApplier,
    threshold: f64,
}

impl FixPipeline {
    /// Create pipeline from its stages
    pub fn new(
        classifier: ProblemClassifier,
        proposer: SolutionProposer,
        applier: GuardedApplier,
        threshold: f64,
    ) -> Self {
        Self {
            classifier,
            proposer,
            applier,
            threshold,
        }
    }

    /// Build every stage from configuration for the repository at `root`
    pub fn from_config(root: &Path, config: &Config) -> Result<Self> {
        let repo = RepositoryContext::new(root, config.repository.clone());
        let proposer = SolutionProposer::new(repo)?;
        let applier = GuardedApplier::from_config(root, &config.apply, config.repository.clone())?;

        Ok(Self::new(
            ProblemClassifier::new(),
            proposer,
            applier,
            config.apply.confidence_threshold,
        ))
    }

    /// Override the confidence threshold
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Classify, propose and apply for one batch of failures
    pub fn run_iteration(&self, records: &[FailureRecord], rejected: Vec<RejectedRecord>) -> IterationReport {
        let mut analysis = self.classifier.analyze_all(records);
        analysis.rejected = rejected;

        let proposals = self.proposer.propose_all(&analysis.failures);
        let apply = self.applier.apply(&proposals.solutions, self.threshold);

        tracing::info!(
            failures = analysis.statistics.total,
            fixes = proposals.summary.total_fixes,
            applied = apply.summary.applied,
            "Iteration complete"
        );

        IterationReport {
            analysis,
            proposals,
            apply,
        }
    }
}
