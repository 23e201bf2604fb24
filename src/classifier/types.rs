//! Classifier type definitions

use crate::types::{FailureRecord, RejectedRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Closed set of failure categories
///
/// Declaration order is the tie-break order used when two categories
/// score the same keyword count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureCategory {
    Compilation,
    #[serde(alias = "null-pointer")]
    NullReference,
    Assertion,
    Timeout,
    Infrastructure,
    Runtime,
    Flaky,
}

impl FailureCategory {
    /// Get category name
    pub fn name(&self) -> &'static str {
        match self {
            FailureCategory::Compilation => "compilation",
            FailureCategory::NullReference => "null-reference",
            FailureCategory::Assertion => "assertion",
            FailureCategory::Timeout => "timeout",
            FailureCategory::Infrastructure => "infrastructure",
            FailureCategory::Runtime => "runtime",
            FailureCategory::Flaky => "flaky",
        }
    }

    /// Suggested remediation strategy
    pub fn strategy(&self) -> &'static str {
        match self {
            FailureCategory::Compilation => "Add missing imports or fix syntax errors",
            FailureCategory::NullReference => "Add null checks or initialize variables",
            FailureCategory::Assertion => "Fix test expectations or update test data",
            FailureCategory::Timeout => "Increase timeout or optimize test performance",
            FailureCategory::Infrastructure => "Check service health or network connectivity",
            FailureCategory::Runtime => "Fix logic errors or validate inputs",
            FailureCategory::Flaky => "Add retries or fix race conditions",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of the keyword table
#[derive(Debug, Clone, Copy)]
pub struct CategoryRule {
    pub category: FailureCategory,

    /// Lower-case keywords matched as substrings of the search corpus
    pub keywords: &'static [&'static str],

    /// Confidence before signal adjustments
    pub base_confidence: f64,
}

/// Keyword table, in tie-break order
pub static CATEGORY_TABLE: [CategoryRule; 7] = [
    CategoryRule {
        category: FailureCategory::Compilation,
        keywords: &[
            "compilation",
            "syntax",
            "cannot find symbol",
            "package does not exist",
            "import",
            "cannot resolve",
            "unresolved reference",
        ],
        base_confidence: 0.95,
    },
    CategoryRule {
        category: FailureCategory::NullReference,
        keywords: &["nullpointerexception", "null", "npe"],
        base_confidence: 0.85,
    },
    CategoryRule {
        category: FailureCategory::Assertion,
        keywords: &[
            "assertion",
            "expected",
            "but was",
            "assertequals",
            "asserttrue",
            "assertfalse",
        ],
        base_confidence: 0.75,
    },
    CategoryRule {
        category: FailureCategory::Timeout,
        keywords: &["timeout", "timed out", "deadline exceeded", "execution timeout"],
        base_confidence: 0.70,
    },
    CategoryRule {
        category: FailureCategory::Infrastructure,
        keywords: &[
            "connection",
            "refused",
            "unreachable",
            "network",
            "docker",
            "container",
            "kafka",
            "mongodb",
            "opensearch",
        ],
        base_confidence: 0.60,
    },
    CategoryRule {
        category: FailureCategory::Runtime,
        keywords: &[
            "illegalargument",
            "illegalstate",
            "indexoutofbounds",
            "classcastexception",
        ],
        base_confidence: 0.65,
    },
    CategoryRule {
        category: FailureCategory::Flaky,
        keywords: &["intermittent", "sometimes", "race condition", "timing"],
        base_confidence: 0.50,
    },
];

/// A failure after classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedFailure {
    /// Enriched copy of the input record
    #[serde(flatten)]
    pub failure: FailureRecord,

    /// Selected category
    pub category: FailureCategory,

    /// Confidence in [0, 1], two decimals
    pub confidence: f64,

    /// Suggested remediation strategy
    pub fix_strategy: String,

    /// Priority rank (1 = most urgent, 5 = least)
    pub priority: u8,
}

/// Aggregate statistics over one batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatistics {
    pub total: usize,
    pub by_category: BTreeMap<FailureCategory, usize>,
    pub average_confidence: f64,

    /// confidence > 0.90
    pub high_confidence: usize,

    /// 0.70 <= confidence <= 0.90
    pub medium_confidence: usize,

    /// confidence < 0.70
    pub low_confidence: usize,
}

/// Classifier output for one batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Sorted by (priority asc, confidence desc)
    pub failures: Vec<ClassifiedFailure>,
    pub statistics: AnalysisStatistics,
    pub recommendations: Vec<String>,

    /// Input entries that could not be ingested
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_follows_tie_break_order() {
        let order: Vec<FailureCategory> = CATEGORY_TABLE.iter().map(|r| r.category).collect();
        let mut sorted = order.clone();
        sorted.sort();
        assert_eq!(order, sorted);
    }

    #[test]
    fn test_keywords_are_lowercase() {
        for rule in CATEGORY_TABLE.iter() {
            for keyword in rule.keywords {
                assert_eq!(*keyword, keyword.to_lowercase());
            }
        }
    }

    #[test]
    fn test_category_serde_names() {
        let json = serde_json::to_string(&FailureCategory::NullReference).unwrap();
        assert_eq!(json, "\"null-reference\"");

        let legacy: FailureCategory = serde_json::from_str("\"null-pointer\"").unwrap();
        assert_eq!(legacy, FailureCategory::NullReference);
    }
}
