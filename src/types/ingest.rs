//! Batch ingestion of failure documents
//!
//! Accepts the JSON shape emitted by the result parsers (`{"failures": [...]}`
//! or a bare array). Malformed entries are rejected with a reason and the
//! rest of the batch is kept.

use crate::errors::{FixError, Result};
use crate::types::failure::{bound_trace, FailureContext, FailureRecord};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Entry that could not be turned into a `FailureRecord`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    /// Position in the input batch
    pub index: usize,

    /// Why it was rejected
    pub reason: String,
}

/// Outcome of ingesting one batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    pub records: Vec<FailureRecord>,
    pub rejected: Vec<RejectedRecord>,
}

/// Wire shape written by the parsers. Several producers disagree on field
/// names, so aliases are kept as separate fields and merged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFailure {
    id: Option<String>,
    service: Option<String>,
    class_name: Option<String>,
    test_class: Option<String>,
    test_name: Option<String>,
    test_method: Option<String>,
    error_type: Option<String>,
    error_message: Option<String>,
    stack_trace: Option<String>,
    source_file: Option<String>,
    file: Option<String>,
    details: Option<String>,
    #[serde(default)]
    context: FailureContext,
}

/// Ingest a whole document, never failing as a whole
pub fn ingest_failures(document: &Value) -> IngestReport {
    let entries: &[Value] = match document {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("failures") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => {
                return IngestReport {
                    records: Vec::new(),
                    rejected: vec![RejectedRecord {
                        index: 0,
                        reason: "`failures` is not an array".to_string(),
                    }],
                }
            }
            None => &[],
        },
        _ => {
            return IngestReport {
                records: Vec::new(),
                rejected: vec![RejectedRecord {
                    index: 0,
                    reason: "document is neither an array nor an object".to_string(),
                }],
            }
        }
    };

    let mut report = IngestReport::default();
    for (index, entry) in entries.iter().enumerate() {
        match parse_record(index, entry) {
            Ok(record) => report.records.push(record),
            Err(err) => {
                tracing::warn!(index, error = %err, "Skipping malformed failure record");
                report.rejected.push(RejectedRecord {
                    index,
                    reason: err.to_string(),
                });
            }
        }
    }
    report
}

/// Parse a single failure entry
pub fn parse_record(index: usize, entry: &Value) -> Result<FailureRecord> {
    let malformed = |reason: String| FixError::MalformedRecord { index, reason };

    if !entry.is_object() {
        return Err(malformed("entry is not an object".to_string()));
    }

    let raw: RawFailure =
        serde_json::from_value(entry.clone()).map_err(|e| malformed(e.to_string()))?;

    if raw.error_type.is_none() && raw.error_message.is_none() && raw.stack_trace.is_none() {
        return Err(malformed(
            "missing errorType, errorMessage and stackTrace".to_string(),
        ));
    }

    let mut context = raw.context;
    context.service = non_empty(raw.service).or(context.service);
    context.test_class = non_empty(raw.test_class)
        .or(non_empty(raw.class_name))
        .or(context.test_class);
    context.test_method = non_empty(raw.test_method)
        .or(non_empty(raw.test_name))
        .or(context.test_method);

    let id = match non_empty(raw.id) {
        Some(id) => id,
        None => match (&context.service, &context.test_class, &context.test_method) {
            (Some(s), Some(c), Some(m)) => FailureRecord::composite_id(s, c, m),
            _ => return Err(malformed("missing id and composite identity".to_string())),
        },
    };

    Ok(FailureRecord {
        id,
        error_type: raw.error_type.unwrap_or_default(),
        error_message: raw.error_message.unwrap_or_default(),
        stack_trace: bound_trace(raw.stack_trace.unwrap_or_default()),
        source_file: non_empty(raw.source_file).or(non_empty(raw.file)),
        details: non_empty(raw.details),
        context,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
