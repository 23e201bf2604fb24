//! Fix candidate generation
//!
//! Dispatches on the failure category, consults the repository for concrete
//! targets and emits zero or more candidates. Nothing here writes to disk.

use crate::classifier::{ClassifiedFailure, FailureCategory};
use crate::errors::Result;
use crate::proposer::diagnostics::{DiagnosticPatterns, JvmDiagnostics};
use crate::proposer::repository::RepositoryContext;
use crate::proposer::types::{
    ChangePayload, FixCandidate, FixKind, ProposalReport, ProposalSummary, Solution,
};
use crate::types::FailureRecord;

/// Candidate confidences per kind
const ADD_IMPORT_CONFIDENCE: f64 = 0.95;
const ADD_DEPENDENCY_CONFIDENCE: f64 = 0.95;
const FALLBACK_IMPORT_CONFIDENCE: f64 = 0.90;
const NULL_CHECK_CONFIDENCE: f64 = 0.80;
const TEST_DATA_CONFIDENCE: f64 = 0.75;
const ASSERTION_CONFIDENCE: f64 = 0.70;
const TIMEOUT_CONFIDENCE: f64 = 0.65;
const OPTIMIZE_CONFIDENCE: f64 = 0.60;
const PATTERN_MATCH_CONFIDENCE: f64 = 0.60;

/// Largest boost a concrete candidate gives the failure confidence
const CONFIDENCE_BOOST: f64 = 0.10;

/// Service name the build tool reports for reactor-level failures
const BUILD_SERVICE: &str = "build";

/// Proposes fixes for classified failures
pub struct SolutionProposer {
    repo: RepositoryContext,
    patterns: Box<dyn DiagnosticPatterns>,
}

impl SolutionProposer {
    /// Create proposer with the JVM diagnostic patterns
    pub fn new(repo: RepositoryContext) -> Result<Self> {
        Ok(Self::with_patterns(repo, Box::new(JvmDiagnostics::new()?)))
    }

    /// Create proposer with custom diagnostic patterns
    pub fn with_patterns(repo: RepositoryContext, patterns: Box<dyn DiagnosticPatterns>) -> Self {
        Self { repo, patterns }
    }

    /// Repository the proposer searches
    pub fn repository(&self) -> &RepositoryContext {
        &self.repo
    }

    /// Solution for one failure, with the confidence raised when a concrete
    /// candidate was found
    pub fn propose(&self, failure: &ClassifiedFailure) -> Solution {
        let mut solution = Solution {
            failure_id: failure.failure.id.clone(),
            suggested_fixes: self.candidates(failure),
            confidence: failure.confidence,
            strategy: failure.fix_strategy.clone(),
            failure: failure.clone(),
        };

        if let Some(best) = solution.best_confidence() {
            let boosted = (failure.confidence + best * CONFIDENCE_BOOST).min(1.0);
            solution.confidence = failure.confidence.max(crate::classifier::round2(boosted));
        }

        tracing::debug!(
            failure_id = %solution.failure_id,
            category = %failure.category,
            candidates = solution.suggested_fixes.len(),
            confidence = solution.confidence,
            "Proposed fixes"
        );

        solution
    }

    /// Solutions for a batch plus totals
    pub fn propose_all(&self, failures: &[ClassifiedFailure]) -> ProposalReport {
        let solutions: Vec<Solution> = failures.iter().map(|f| self.propose(f)).collect();

        let summary = ProposalSummary {
            total_failures: failures.len(),
            failures_with_solutions: solutions
                .iter()
                .filter(|s| !s.suggested_fixes.is_empty())
                .count(),
            total_fixes: solutions.iter().map(|s| s.suggested_fixes.len()).sum(),
        };

        tracing::info!(
            total_failures = summary.total_failures,
            with_solutions = summary.failures_with_solutions,
            total_fixes = summary.total_fixes,
            "Proposal batch complete"
        );

        ProposalReport { solutions, summary }
    }

    /// Candidates for one failure, dispatched on category
    pub fn candidates(&self, failure: &ClassifiedFailure) -> Vec<FixCandidate> {
        let record = &failure.failure;
        match failure.category {
            FailureCategory::Compilation => self.compilation_fixes(record),
            FailureCategory::NullReference => self.null_reference_fixes(record),
            FailureCategory::Assertion => self.assertion_fixes(record),
            FailureCategory::Timeout => self.timeout_fixes(record),
            FailureCategory::Infrastructure | FailureCategory::Runtime | FailureCategory::Flaky => {
                self.similar_test_fixes(record)
            }
        }
    }

    fn compilation_fixes(&self, record: &FailureRecord) -> Vec<FixCandidate> {
        let mut fixes = Vec::new();
        let source_file = record.source_file.clone();

        if let Some(class_name) = self.patterns.unresolved_class(&record.error_message) {
            if let Some(import_path) = self.repo.find_import_path(&class_name, record.service()) {
                fixes.push(FixCandidate::new(
                    FixKind::AddImport,
                    format!("Add missing import: {}", import_path),
                    source_file.clone(),
                    ChangePayload::text(format!("import {};", import_path)),
                    "top_of_file",
                    ADD_IMPORT_CONFIDENCE,
                ));
            }
        }

        let package = self
            .patterns
            .missing_package(&record.error_message)
            .or_else(|| self.patterns.missing_package(&record.stack_trace));

        let Some(package) = package else {
            return fixes;
        };

        if package.contains(&self.repo.layout().shared_namespace) {
            if let Some(fix) = self.shared_dependency_fix(record) {
                fixes.push(fix);
            }
        }

        if source_file.is_some() {
            fixes.push(FixCandidate::new(
                FixKind::FixImport,
                format!("Fix import for package: {}", package),
                source_file,
                ChangePayload::text(format!(
                    "Ensure import statement matches package: {}",
                    package
                )),
                "imports_section",
                FALLBACK_IMPORT_CONFIDENCE,
            ));
        } else if fixes.is_empty() {
            fixes.push(FixCandidate::new(
                FixKind::FixPackage,
                format!("Fix package declaration or add dependency for: {}", package),
                None,
                ChangePayload::text(
                    "Check package declaration matches directory structure or add dependency",
                ),
                "package_declaration",
                FALLBACK_IMPORT_CONFIDENCE,
            ));
        }

        fixes
    }

    /// add-dependency for the owning service's descriptor, unless the
    /// descriptor cannot be found or already declares the artifact
    fn shared_dependency_fix(&self, record: &FailureRecord) -> Option<FixCandidate> {
        let from_context = record
            .service()
            .filter(|s| *s != BUILD_SERVICE)
            .map(str::to_string);
        let from_source = record
            .source_file
            .as_deref()
            .and_then(|path| self.repo.service_in_text(path));
        let from_details = record
            .details
            .as_deref()
            .and_then(|details| self.repo.service_in_text(details));

        let (service, descriptor) = [from_context, from_source, from_details]
            .into_iter()
            .flatten()
            .find_map(|service| {
                self.repo
                    .descriptor_for(&service)
                    .map(|descriptor| (service, descriptor))
            })?;

        let coords = self.repo.layout().shared_dependency.clone();
        if self.repo.descriptor_declares(&descriptor, &coords.artifact_id) {
            tracing::debug!(
                descriptor = %descriptor,
                artifact = %coords.artifact_id,
                "Dependency already declared"
            );
            return None;
        }

        Some(FixCandidate::new(
            FixKind::AddDependency,
            format!("Add {} dependency to {}", coords.artifact_id, service),
            Some(descriptor),
            ChangePayload::Dependency(coords),
            "dependencies_section",
            ADD_DEPENDENCY_CONFIDENCE,
        ))
    }

    fn null_reference_fixes(&self, record: &FailureRecord) -> Vec<FixCandidate> {
        let mut fixes = Vec::new();

        let variable = self
            .patterns
            .null_dereference(&record.stack_trace)
            .or_else(|| self.patterns.null_dereference(&record.error_message));

        if let Some(variable) = variable {
            fixes.push(FixCandidate::new(
                FixKind::AddNullCheck,
                format!("Add null check for variable: {}", variable),
                record.source_file.clone(),
                ChangePayload::text(format!(
                    "if ({} == null) {{ /* handle null case */ }}",
                    variable
                )),
                format!("before_{}_usage", variable),
                NULL_CHECK_CONFIDENCE,
            ));
        }

        let is_test = record
            .test_method()
            .map_or(false, |m| m.to_lowercase().contains("test"));
        if is_test {
            fixes.push(FixCandidate::new(
                FixKind::InitializeTestData,
                "Initialize test data before use",
                record.source_file.clone(),
                ChangePayload::text("Ensure all test data is properly initialized in @BeforeEach"),
                "test_setup",
                TEST_DATA_CONFIDENCE,
            ));
        }

        fixes
    }

    fn assertion_fixes(&self, record: &FailureRecord) -> Vec<FixCandidate> {
        self.patterns
            .assertion_mismatch(&record.error_message)
            .map(|(expected, actual)| {
                FixCandidate::new(
                    FixKind::FixAssertion,
                    format!("Fix assertion: expected {}, got {}", expected, actual),
                    record.source_file.clone(),
                    ChangePayload::text("Update assertion to match actual value or fix test data"),
                    "assertion_line",
                    ASSERTION_CONFIDENCE,
                )
            })
            .into_iter()
            .collect()
    }

    fn timeout_fixes(&self, record: &FailureRecord) -> Vec<FixCandidate> {
        vec![
            FixCandidate::new(
                FixKind::IncreaseTimeout,
                "Increase test timeout",
                record.source_file.clone(),
                ChangePayload::text(
                    "Add @Timeout annotation or increase timeout in test configuration",
                ),
                "test_method",
                TIMEOUT_CONFIDENCE,
            ),
            FixCandidate::new(
                FixKind::OptimizeTest,
                "Optimize test performance",
                record.source_file.clone(),
                ChangePayload::text("Review test for performance bottlenecks"),
                "test_method",
                OPTIMIZE_CONFIDENCE,
            ),
        ]
    }

    fn similar_test_fixes(&self, record: &FailureRecord) -> Vec<FixCandidate> {
        let (Some(test_class), Some(service)) = (record.test_class(), record.service()) else {
            return Vec::new();
        };

        let similar = self.repo.find_similar_tests(test_class, service);
        if similar.is_empty() {
            return Vec::new();
        }

        vec![FixCandidate::new(
            FixKind::PatternMatch,
            format!("Found {} similar tests - review for patterns", similar.len()),
            record.source_file.clone(),
            ChangePayload::text("Apply patterns from similar tests"),
            "test_class",
            PATTERN_MATCH_CONFIDENCE,
        )]
    }
}
