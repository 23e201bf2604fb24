//! Failure classification with confidence scoring
//!
//! Category selection is a pure function of keyword overlap with the
//! case-normalized error text; confidence is the category base adjusted by
//! a fixed set of signal checks.

use crate::classifier::types::{
    AnalysisReport, AnalysisStatistics, CategoryRule, ClassifiedFailure, FailureCategory,
    CATEGORY_TABLE,
};
use crate::types::FailureRecord;
use std::collections::BTreeMap;

/// Messages longer than this are treated as low-signal
const LONG_MESSAGE_CHARS: usize = 500;

/// Traces with more line breaks than this are treated as low-signal
const DEEP_TRACE_LINES: usize = 50;

/// Confidence boundaries used for statistics and recommendations
pub const HIGH_CONFIDENCE: f64 = 0.90;
pub const MEDIUM_CONFIDENCE: f64 = 0.70;

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Keyword-table failure classifier
#[derive(Debug, Clone)]
pub struct ProblemClassifier {
    table: &'static [CategoryRule],
}

impl ProblemClassifier {
    /// Create classifier over the built-in category table
    pub fn new() -> Self {
        Self {
            table: &CATEGORY_TABLE,
        }
    }

    /// Classify a single failure
    pub fn classify(&self, record: &FailureRecord) -> ClassifiedFailure {
        let rule = self.select_rule(record);
        let confidence = self.score(record, rule.base_confidence);
        let priority = Self::priority(rule.category, confidence);

        ClassifiedFailure {
            failure: record.enriched(),
            category: rule.category,
            confidence,
            fix_strategy: rule.category.strategy().to_string(),
            priority,
        }
    }

    /// Classify a batch, sort it and derive statistics and recommendations
    pub fn analyze_all(&self, records: &[FailureRecord]) -> AnalysisReport {
        let mut failures: Vec<ClassifiedFailure> =
            records.iter().map(|r| self.classify(r)).collect();

        failures.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.confidence.total_cmp(&a.confidence))
        });

        let statistics = Self::statistics(&failures);
        let recommendations = Self::recommendations(&statistics);

        tracing::info!(
            total = statistics.total,
            average_confidence = statistics.average_confidence,
            high = statistics.high_confidence,
            "Classified failures"
        );

        AnalysisReport {
            failures,
            statistics,
            recommendations,
            rejected: Vec::new(),
        }
    }

    /// Pick the category with the strictly highest keyword count.
    /// Ties resolve to the earlier table row; all-zero falls back to runtime.
    fn select_rule(&self, record: &FailureRecord) -> &CategoryRule {
        let corpus = format!(
            "{} {} {}",
            record.error_type, record.error_message, record.stack_trace
        )
        .to_lowercase();

        let mut best: Option<(&CategoryRule, usize)> = None;
        for rule in self.table {
            let hits = rule.keywords.iter().filter(|k| corpus.contains(*k)).count();
            if hits > best.map_or(0, |(_, h)| h) {
                best = Some((rule, hits));
            }
        }

        match best {
            Some((rule, _)) => rule,
            None => self.rule_for(FailureCategory::Runtime),
        }
    }

    fn rule_for(&self, category: FailureCategory) -> &CategoryRule {
        self.table
            .iter()
            .find(|r| r.category == category)
            .unwrap_or(&CATEGORY_TABLE[5])
    }

    /// Base confidence adjusted by high/low signal checks, clamped and rounded
    fn score(&self, record: &FailureRecord, base: f64) -> f64 {
        let error_type = record.error_type.to_lowercase();
        let message = record.error_message.to_lowercase();

        let mut adjustment = 0.0;

        // High-signal phrasing
        if message.contains("cannot find symbol") {
            adjustment += 0.10;
        }
        if message.contains("package") && message.contains("does not exist") {
            adjustment += 0.10;
        }
        if message.contains("import") {
            adjustment += 0.05;
        }

        // Low-signal conditions
        if record.error_message.chars().count() > LONG_MESSAGE_CHARS {
            adjustment -= 0.10;
        }
        if error_type.contains("unknown") {
            adjustment -= 0.15;
        }
        if record.stack_trace.matches('\n').count() > DEEP_TRACE_LINES {
            adjustment -= 0.10;
        }

        round2((base + adjustment).clamp(0.0, 1.0))
    }

    /// Priority rank, 1 = most urgent
    pub fn priority(category: FailureCategory, confidence: f64) -> u8 {
        use FailureCategory::*;

        if category == Compilation && confidence > 0.90 {
            return 1;
        }
        if matches!(category, NullReference | Assertion) && confidence > 0.80 {
            return 2;
        }
        if matches!(category, Infrastructure | Flaky) || confidence < 0.60 {
            return 5;
        }
        if confidence > 0.70 {
            return 3;
        }
        4
    }

    fn statistics(failures: &[ClassifiedFailure]) -> AnalysisStatistics {
        let mut by_category = BTreeMap::new();
        for failure in failures {
            *by_category.entry(failure.category).or_insert(0) += 1;
        }

        let average_confidence = if failures.is_empty() {
            0.0
        } else {
            round2(failures.iter().map(|f| f.confidence).sum::<f64>() / failures.len() as f64)
        };

        let count = |pred: &dyn Fn(f64) -> bool| {
            failures.iter().filter(|f| pred(f.confidence)).count()
        };

        AnalysisStatistics {
            total: failures.len(),
            by_category,
            average_confidence,
            high_confidence: count(&|c: f64| c > HIGH_CONFIDENCE),
            medium_confidence: count(&|c: f64| (MEDIUM_CONFIDENCE..=HIGH_CONFIDENCE).contains(&c)),
            low_confidence: count(&|c: f64| c < MEDIUM_CONFIDENCE),
        }
    }

    /// Informational hints keyed off category counts
    fn recommendations(stats: &AnalysisStatistics) -> Vec<String> {
        let mut recommendations = Vec::new();
        let count = |category: FailureCategory| stats.by_category.get(&category).copied().unwrap_or(0);

        if stats.high_confidence > 0 {
            recommendations.push(format!(
                "Found {} failures with high confidence (>90%) - good candidates for auto-fix",
                stats.high_confidence
            ));
        }

        let compilation = count(FailureCategory::Compilation);
        if compilation > 0 {
            recommendations.push(format!(
                "Found {} compilation errors - should be fixed first",
                compilation
            ));
        }

        let infrastructure = count(FailureCategory::Infrastructure);
        if infrastructure > 0 {
            recommendations.push(format!(
                "Found {} infrastructure issues - may require manual intervention",
                infrastructure
            ));
        }

        let flaky = count(FailureCategory::Flaky);
        if flaky > 0 {
            recommendations.push(format!(
                "Found {} potentially flaky tests - consider adding retries",
                flaky
            ));
        }

        recommendations
    }
}

impl Default for ProblemClassifier {
    fn default() -> Self {
        Self::new()
    }
}
