//! Fix candidate type definitions

use crate::classifier::ClassifiedFailure;
use serde::{Deserialize, Serialize};

/// Kind of proposed change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixKind {
    AddImport,
    AddDependency,
    FixImport,
    FixPackage,
    AddNullCheck,
    InitializeTestData,
    FixAssertion,
    IncreaseTimeout,
    OptimizeTest,
    PatternMatch,
}

/// How the applier edits a file for a given fix kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Insert an import after the package declaration
    AddImport,

    /// Insert a dependency into the build descriptor
    AddDependency,

    /// Advisory marker at the first test method body
    AddNullCheck,

    /// Documented no-op
    FixAssertion,

    /// Advisory marker after the import block
    GenericAnnotate,
}

impl FixKind {
    /// Edit performed when this candidate is applied
    pub fn edit_kind(&self) -> EditKind {
        match self {
            FixKind::AddImport => EditKind::AddImport,
            FixKind::AddDependency => EditKind::AddDependency,
            FixKind::AddNullCheck => EditKind::AddNullCheck,
            FixKind::FixAssertion => EditKind::FixAssertion,
            FixKind::FixImport
            | FixKind::FixPackage
            | FixKind::InitializeTestData
            | FixKind::IncreaseTimeout
            | FixKind::OptimizeTest
            | FixKind::PatternMatch => EditKind::GenericAnnotate,
        }
    }
}

/// Build-descriptor coordinates of a dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyCoordinates {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl DependencyCoordinates {
    /// Render as a `<dependency>` element, every line prefixed with `indent`
    pub fn to_xml(&self, indent: &str) -> String {
        format!(
            "{i}<dependency>\n\
             {i}    <groupId>{g}</groupId>\n\
             {i}    <artifactId>{a}</artifactId>\n\
             {i}    <version>{v}</version>\n\
             {i}</dependency>",
            i = indent,
            g = self.group_id,
            a = self.artifact_id,
            v = self.version,
        )
    }

    /// Parse coordinates from a `<dependency>` XML fragment
    pub fn from_xml(xml: &str) -> Option<Self> {
        let element = |tag: &str| {
            let open = format!("<{}>", tag);
            let close = format!("</{}>", tag);
            let start = xml.find(&open)? + open.len();
            let end = start + xml[start..].find(&close)?;
            Some(xml[start..end].trim().to_string())
        };

        Some(Self {
            group_id: element("groupId")?,
            artifact_id: element("artifactId")?,
            version: element("version")?,
        })
    }
}

/// What a candidate would change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangePayload {
    /// Text to insert (or advisory text for annotations)
    Text { text: String },

    /// Structured dependency descriptor
    Dependency(DependencyCoordinates),
}

impl ChangePayload {
    pub fn text(text: impl Into<String>) -> Self {
        ChangePayload::Text { text: text.into() }
    }

    /// Human-readable rendering of the payload
    pub fn summary(&self) -> String {
        match self {
            ChangePayload::Text { text } => text.clone(),
            ChangePayload::Dependency(coords) => format!(
                "{}:{}:{}",
                coords.group_id, coords.artifact_id, coords.version
            ),
        }
    }
}

/// A proposed, not-yet-applied change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixCandidate {
    #[serde(rename = "type")]
    pub kind: FixKind,

    pub description: String,

    /// Target file, relative to the repository root when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    pub change: ChangePayload,

    /// Insertion anchor / location tag (advisory for low-information kinds)
    pub location: String,

    /// Confidence in [0, 1]
    pub confidence: f64,
}

impl FixCandidate {
    /// Create candidate
    pub fn new(
        kind: FixKind,
        description: impl Into<String>,
        file: Option<String>,
        change: ChangePayload,
        location: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            kind,
            description: description.into(),
            file: file.filter(|f| !f.is_empty()),
            change,
            location: location.into(),
            confidence,
        }
    }
}

/// Proposals for one classified failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Solution {
    pub failure_id: String,
    pub suggested_fixes: Vec<FixCandidate>,

    /// Failure confidence, raised when a concrete fix was found
    pub confidence: f64,
    pub strategy: String,

    /// Classified failure the fixes address
    pub failure: ClassifiedFailure,
}

impl Solution {
    /// Best candidate confidence, if any candidate exists
    pub fn best_confidence(&self) -> Option<f64> {
        self.suggested_fixes
            .iter()
            .map(|f| f.confidence)
            .max_by(|a, b| a.total_cmp(b))
    }
}

/// Batch totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalSummary {
    pub total_failures: usize,
    pub failures_with_solutions: usize,
    pub total_fixes: usize,
}

/// Proposer output for one batch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalReport {
    pub solutions: Vec<Solution>,
    pub summary: ProposalSummary,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_kind_mapping() {
        assert_eq!(FixKind::AddImport.edit_kind(), EditKind::AddImport);
        assert_eq!(FixKind::FixAssertion.edit_kind(), EditKind::FixAssertion);
        assert_eq!(FixKind::IncreaseTimeout.edit_kind(), EditKind::GenericAnnotate);
    }

    #[test]
    fn test_dependency_xml() {
        let coords = DependencyCoordinates {
            group_id: "io.leanda.ng".to_string(),
            artifact_id: "shared-models".to_string(),
            version: "1.0.0-SNAPSHOT".to_string(),
        };
        let xml = coords.to_xml("  ");
        assert!(xml.starts_with("  <dependency>"));
        assert!(xml.contains("      <artifactId>shared-models</artifactId>"));
        assert!(xml.ends_with("  </dependency>"));
        assert_eq!(DependencyCoordinates::from_xml(&xml), Some(coords));
        assert!(DependencyCoordinates::from_xml("<dependency/>").is_none());
    }

    #[test]
    fn test_candidate_wire_shape() {
        let fix = FixCandidate::new(
            FixKind::AddImport,
            "Add missing import",
            Some(String::new()),
            ChangePayload::text("import a.B;"),
            "top_of_file",
            0.95,
        );
        assert!(fix.file.is_none());

        let json = serde_json::to_value(&fix).unwrap();
        assert_eq!(json["type"], "add_import");
        assert_eq!(json["change"]["kind"], "text");
        assert_eq!(json["change"]["text"], "import a.B;");
    }
}
