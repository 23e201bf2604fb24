//! Normalized failure records
//!
//! A `FailureRecord` is the unit every stage of the fix loop operates on.
//! Records are produced by ingestion adapters and are read-only afterwards;
//! enrichment returns a new record.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Maximum stack/trace length kept on a record (characters)
pub const MAX_STACK_TRACE_CHARS: usize = 16_384;

/// Placeholder used for unknown context fields in derived records
pub const UNKNOWN: &str = "unknown";

/// Named context attached to a failure, plus one explicit extension map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureContext {
    /// Owning service or component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,

    /// Test class (or compilation unit for non-test failures)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_class: Option<String>,

    /// Test method name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_method: Option<String>,

    /// First source line referenced by the trace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_line: Option<u32>,

    /// Adapter-specific extras not modelled above
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// One observed test or build failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRecord {
    /// Stable identity across repeated analyses
    pub id: String,

    /// Error kind label (exception type, `CompilationError`, ...)
    #[serde(default)]
    pub error_type: String,

    /// Error message text
    #[serde(default)]
    pub error_message: String,

    /// Stack or trace text, bounded to `MAX_STACK_TRACE_CHARS`
    #[serde(default)]
    pub stack_trace: String,

    /// Originating source file, relative to the repository root when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,

    /// Raw tool detail (e.g. the compiler line that produced the failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// Named context
    #[serde(default)]
    pub context: FailureContext,
}

impl FailureRecord {
    /// Create a record with the identity key and error triple
    pub fn new(
        id: impl Into<String>,
        error_type: impl Into<String>,
        error_message: impl Into<String>,
        stack_trace: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            error_type: error_type.into(),
            error_message: error_message.into(),
            stack_trace: bound_trace(stack_trace.into()),
            source_file: None,
            details: None,
            context: FailureContext::default(),
        }
    }

    /// Composite identity for test failures: `service-class-method`
    pub fn composite_id(service: &str, test_class: &str, test_method: &str) -> String {
        format!("{}-{}-{}", service, test_class, test_method)
    }

    /// Set the source file
    pub fn with_source_file(mut self, path: impl Into<String>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    /// Set raw tool details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the owning service
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.context.service = Some(service.into());
        self
    }

    /// Set the test class and method
    pub fn with_test(mut self, test_class: impl Into<String>, test_method: impl Into<String>) -> Self {
        self.context.test_class = Some(test_class.into());
        self.context.test_method = Some(test_method.into());
        self
    }

    /// Owning service, if known and meaningful
    pub fn service(&self) -> Option<&str> {
        self.context
            .service
            .as_deref()
            .filter(|s| !s.is_empty() && *s != UNKNOWN)
    }

    /// Test method name, if known
    pub fn test_method(&self) -> Option<&str> {
        self.context.test_method.as_deref().filter(|s| !s.is_empty())
    }

    /// Test class name, if known
    pub fn test_class(&self) -> Option<&str> {
        self.context
            .test_class
            .as_deref()
            .filter(|s| !s.is_empty() && *s != UNKNOWN)
    }

    /// Derived record with defaulted service/class/method and the first
    /// trace line number filled in
    pub fn enriched(&self) -> FailureRecord {
        let mut derived = self.clone();
        let ctx = &mut derived.context;

        for field in [&mut ctx.service, &mut ctx.test_class, &mut ctx.test_method] {
            if field.as_deref().map_or(true, str::is_empty) {
                *field = Some(UNKNOWN.to_string());
            }
        }

        if ctx.suggested_line.is_none() {
            ctx.suggested_line = first_trace_line(&self.stack_trace);
        }

        derived
    }
}

/// Truncate a trace to the bound on a char boundary
pub(crate) fn bound_trace(trace: String) -> String {
    if trace.chars().count() <= MAX_STACK_TRACE_CHARS {
        return trace;
    }
    trace.chars().take(MAX_STACK_TRACE_CHARS).collect()
}

/// First `(File.java:N)` line number in a trace
fn first_trace_line(trace: &str) -> Option<u32> {
    static FRAME: OnceLock<Regex> = OnceLock::new();
    let frame = FRAME.get_or_init(|| Regex::new(r"\(.*?\.java:(\d+)\)").expect("static regex"));

    frame
        .captures(trace)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enriched_defaults_unknown_fields() {
        let record = FailureRecord::new("x", "CompilationError", "boom", "");
        let derived = record.enriched();

        assert_eq!(derived.context.service.as_deref(), Some(UNKNOWN));
        assert_eq!(derived.context.test_class.as_deref(), Some(UNKNOWN));
        assert_eq!(derived.context.test_method.as_deref(), Some(UNKNOWN));
        // original untouched
        assert!(record.context.service.is_none());
    }

    #[test]
    fn test_enriched_extracts_first_line() {
        let trace = "java.lang.NullPointerException\n\tat a.B.c(B.java:42)\n\tat a.D.e(D.java:7)";
        let record = FailureRecord::new("x", "NPE", "null", trace);

        assert_eq!(record.enriched().context.suggested_line, Some(42));
    }

    #[test]
    fn test_trace_is_bounded() {
        let long = "x".repeat(MAX_STACK_TRACE_CHARS + 100);
        let record = FailureRecord::new("x", "E", "m", long);
        assert_eq!(record.stack_trace.chars().count(), MAX_STACK_TRACE_CHARS);
    }

    #[test]
    fn test_unknown_service_is_none() {
        let record = FailureRecord::new("x", "E", "m", "").with_service(UNKNOWN);
        assert!(record.service().is_none());
    }

    #[test]
    fn test_serde_camel_case() {
        let record = FailureRecord::new("orders-OrderTest-create", "AssertionError", "m", "")
            .with_test("OrderTest", "create");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"errorType\""));
        assert!(json.contains("\"testClass\""));
    }
}
