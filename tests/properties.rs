//! Property tests for classification bounds and edit idempotence

use fixpilot::applier::edits::{add_dependency, add_import};
use fixpilot::applier::{Edit, ProtectedPaths};
use fixpilot::classifier::ProblemClassifier;
use fixpilot::proposer::DependencyCoordinates;
use fixpilot::types::FailureRecord;
use quickcheck::TestResult;
use quickcheck_macros::quickcheck;
use tempfile::TempDir;

fn identifier(raw: &str) -> Option<String> {
    let ident: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(24)
        .collect();
    match ident.chars().next() {
        Some(c) if c.is_ascii_alphabetic() => Some(ident),
        _ => None,
    }
}

fn apply(content: &str, edit: Edit) -> String {
    match edit {
        Edit::Changed(updated) => updated,
        Edit::Unchanged => content.to_string(),
    }
}

#[quickcheck]
fn prop_classification_is_deterministic_and_bounded(
    error_type: String,
    message: String,
    trace: String,
) -> bool {
    let classifier = ProblemClassifier::new();
    let record = FailureRecord::new("prop", error_type, message, trace);

    let first = classifier.classify(&record);
    let second = classifier.classify(&record);

    first == second
        && (0.0..=1.0).contains(&first.confidence)
        && (1..=5).contains(&first.priority)
}

#[quickcheck]
fn prop_add_import_is_idempotent(class: String, body: String) -> TestResult {
    let Some(class) = identifier(&class) else {
        return TestResult::discard();
    };
    let statement = format!("import io.leanda.ng.shared.models.{};", class);
    let source = format!("package acme.orders;\n\n// {}\nclass Order {{}}\n", body.replace('\n', " "));

    let once = apply(&source, add_import(&source, &statement));
    let twice = add_import(&once, &statement);

    TestResult::from_bool(
        !twice.is_changed() && once.matches(statement.as_str()).count() == 1,
    )
}

#[quickcheck]
fn prop_add_dependency_is_idempotent(artifact: String, existing: bool) -> TestResult {
    let Some(artifact) = identifier(&artifact) else {
        return TestResult::discard();
    };
    let coords = DependencyCoordinates {
        group_id: "io.leanda.ng".to_string(),
        artifact_id: format!("x-{}", artifact),
        version: "1.0.0".to_string(),
    };
    let pom = if existing {
        "<project>\n    <dependencies>\n    </dependencies>\n</project>\n"
    } else {
        "<project>\n</project>\n"
    };

    let once = apply(pom, add_dependency(pom, &coords));
    let twice = add_dependency(&once, &coords);
    let tag = format!("<artifactId>{}</artifactId>", coords.artifact_id);

    TestResult::from_bool(
        !twice.is_changed()
            && once.matches(tag.as_str()).count() == 1
            && once.matches("<dependencies>").count() == 1,
    )
}

#[quickcheck]
fn prop_everything_below_protected_dir_is_protected(segments: Vec<String>) -> TestResult {
    let parts: Vec<String> = segments.iter().filter_map(|s| identifier(s)).take(6).collect();
    if parts.is_empty() {
        return TestResult::discard();
    }

    let temp = TempDir::new().unwrap();
    let guard = ProtectedPaths::from_rules(temp.path(), ["scripts/**"]).unwrap();

    let inside = format!("scripts/{}", parts.join("/"));
    let outside = format!("services/{}", parts.join("/"));

    TestResult::from_bool(guard.is_protected(&inside) && !guard.is_protected(&outside))
}
