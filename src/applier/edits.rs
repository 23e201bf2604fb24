//! In-memory text edits
//!
//! Each edit is a pure function of the current content. Re-running an edit
//! on its own output returns `Edit::Unchanged`.

use crate::proposer::DependencyCoordinates;
use regex::Regex;
use std::sync::OnceLock;

/// Prefix of advisory comments inserted into source files
pub const MARKER_PREFIX: &str = "// FIXPILOT: suggested fix -";

/// Indentation used for inserted dependency blocks
const XML_INDENT: &str = "    ";

/// Result of an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// New content
    Changed(String),

    /// Target text already present, or no anchor to attach to
    Unchanged,
}

impl Edit {
    pub fn is_changed(&self) -> bool {
        matches!(self, Edit::Changed(_))
    }
}

fn package_declaration() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*package\s+[^;]+;").expect("static regex"))
}

fn import_block() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)(?:^[ \t]*import\s+[^;]+;[ \t]*\r?\n?)+").expect("static regex"))
}

fn test_method_body() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)@Test\b.*?void\s+\w+\s*\([^)]*\)[^{;]*\{").expect("static regex")
    })
}

/// Insert `statement` on its own line after the package declaration
pub fn add_import(content: &str, statement: &str) -> Edit {
    let statement = statement.trim();
    if content.lines().any(|line| line.trim() == statement) {
        return Edit::Unchanged;
    }

    match package_declaration().find(content) {
        Some(package) => {
            let at = package.end();
            Edit::Changed(format!(
                "{}\n{}\n{}",
                &content[..at],
                statement,
                &content[at..]
            ))
        }
        None => Edit::Unchanged,
    }
}

/// Insert a dependency into the project's dependency block, creating the
/// block when there is none
pub fn add_dependency(content: &str, coords: &DependencyCoordinates) -> Edit {
    if content.contains(&format!("<artifactId>{}</artifactId>", coords.artifact_id)) {
        return Edit::Unchanged;
    }

    if let Some(at) = project_dependencies(content) {
        let indent = format!("{}{}", line_indent(content, at), XML_INDENT);
        let insert_at = at + "<dependencies>".len();
        return Edit::Changed(format!(
            "{}\n{}{}",
            &content[..insert_at],
            coords.to_xml(&indent),
            &content[insert_at..]
        ));
    }

    let block = format!(
        "{i}<dependencies>\n{dep}\n{i}</dependencies>\n",
        i = XML_INDENT,
        dep = coords.to_xml(&XML_INDENT.repeat(2))
    );

    match content.find("</project>") {
        Some(at) => Edit::Changed(format!("{}{}{}", &content[..at], block, &content[at..])),
        None => {
            let separator = if content.ends_with('\n') || content.is_empty() {
                ""
            } else {
                "\n"
            };
            Edit::Changed(format!("{}{}{}", content, separator, block))
        }
    }
}

/// Position of the first `<dependencies>` that belongs to the project itself
/// rather than dependency management or a plugin
fn project_dependencies(content: &str) -> Option<usize> {
    content.match_indices("<dependencies>").map(|(at, _)| at).find(|&at| {
        let before = &content[..at];
        !inside(before, "<dependencyManagement>", "</dependencyManagement>")
            && !inside(before, "<plugin>", "</plugin>")
    })
}

fn inside(before: &str, open: &str, close: &str) -> bool {
    before.matches(open).count() > before.matches(close).count()
}

fn line_indent(content: &str, at: usize) -> &str {
    let line_start = content[..at].rfind('\n').map_or(0, |i| i + 1);
    let line = &content[line_start..at];
    let width = line.len() - line.trim_start().len();
    &line[..width]
}

/// Advisory comment line for `text`
pub fn marker(text: &str) -> String {
    format!("{} {}", MARKER_PREFIX, text.trim())
}

fn has_marker(content: &str, marker: &str) -> bool {
    content.lines().any(|line| line.trim() == marker)
}

/// Advisory comment inside the first test method body
pub fn add_null_check(content: &str, text: &str) -> Edit {
    let marker = marker(text);
    if has_marker(content, &marker) {
        return Edit::Unchanged;
    }

    match test_method_body().find(content) {
        Some(body) => {
            let at = body.end();
            let indent = format!("{}{}", line_indent(content, body.start()), XML_INDENT);
            Edit::Changed(format!(
                "{}\n{}{}{}",
                &content[..at],
                indent,
                marker,
                &content[at..]
            ))
        }
        None => Edit::Unchanged,
    }
}

/// Advisory comment after the import block, or at the top of the file
pub fn annotate(content: &str, text: &str) -> Edit {
    let marker = marker(text);
    if has_marker(content, &marker) {
        return Edit::Unchanged;
    }

    match import_block().find(content) {
        Some(imports) => {
            let at = imports.end();
            let lead = if content[..at].ends_with('\n') { "" } else { "\n" };
            Edit::Changed(format!("{}{}{}\n{}", &content[..at], lead, marker, &content[at..]))
        }
        None => Edit::Changed(format!("{}\n{}", marker, content)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "package com.acme.orders;\n\nimport java.util.List;\nimport java.util.Map;\n\npublic class OrderTest {\n    @Test\n    void createsOrder() {\n        assertTrue(true);\n    }\n}\n";

    fn coords() -> DependencyCoordinates {
        DependencyCoordinates {
            group_id: "io.leanda.ng".to_string(),
            artifact_id: "shared-models".to_string(),
            version: "1.0.0-SNAPSHOT".to_string(),
        }
    }

    fn changed(edit: Edit) -> String {
        match edit {
            Edit::Changed(content) => content,
            Edit::Unchanged => panic!("expected a change"),
        }
    }

    #[test]
    fn test_add_import_after_package() {
        let updated = changed(add_import(SOURCE, "import io.leanda.ng.shared.models.Widget;"));
        assert!(updated.starts_with(
            "package com.acme.orders;\nimport io.leanda.ng.shared.models.Widget;\n"
        ));
        assert_eq!(add_import(&updated, "import io.leanda.ng.shared.models.Widget;"), Edit::Unchanged);
    }

    #[test]
    fn test_add_import_without_package() {
        assert_eq!(add_import("class A {}\n", "import a.B;"), Edit::Unchanged);
    }

    #[test]
    fn test_add_dependency_into_existing_block() {
        let pom = "<project>\n  <dependencies>\n    <dependency>\n      <artifactId>junit</artifactId>\n    </dependency>\n  </dependencies>\n</project>\n";
        let updated = changed(add_dependency(pom, &coords()));

        assert!(updated.contains("  <dependencies>\n      <dependency>\n          <groupId>io.leanda.ng</groupId>"));
        assert!(updated.contains("<artifactId>junit</artifactId>"));
        assert_eq!(add_dependency(&updated, &coords()), Edit::Unchanged);
    }

    #[test]
    fn test_add_dependency_skips_management_block() {
        let pom = "<project>\n  <dependencyManagement>\n    <dependencies>\n    </dependencies>\n  </dependencyManagement>\n  <dependencies>\n  </dependencies>\n</project>\n";
        let updated = changed(add_dependency(pom, &coords()));

        let managed_end = updated.find("</dependencyManagement>").unwrap();
        let inserted = updated.find("shared-models").unwrap();
        assert!(inserted > managed_end);
    }

    #[test]
    fn test_add_dependency_creates_block() {
        let pom = "<project>\n  <artifactId>orders</artifactId>\n</project>\n";
        let updated = changed(add_dependency(pom, &coords()));

        assert!(updated.contains("    <dependencies>\n        <dependency>"));
        assert!(updated.ends_with("    </dependencies>\n</project>\n"));
    }

    #[test]
    fn test_add_dependency_appends_without_project() {
        let updated = changed(add_dependency("<!-- fragment -->", &coords()));
        assert!(updated.starts_with("<!-- fragment -->\n    <dependencies>\n"));
    }

    #[test]
    fn test_null_check_marker_in_test_body() {
        let updated = changed(add_null_check(SOURCE, "if (order == null) { /* handle null case */ }"));
        assert!(updated.contains(
            "    void createsOrder() {\n        // FIXPILOT: suggested fix - if (order == null)"
        ));
        assert_eq!(
            add_null_check(&updated, "if (order == null) { /* handle null case */ }"),
            Edit::Unchanged
        );
    }

    #[test]
    fn test_null_check_without_test_method() {
        assert_eq!(add_null_check("class A {}\n", "x"), Edit::Unchanged);
    }

    #[test]
    fn test_annotate_after_imports() {
        let updated = changed(annotate(SOURCE, "Review test for performance bottlenecks"));
        assert!(updated.contains(
            "import java.util.Map;\n// FIXPILOT: suggested fix - Review test for performance bottlenecks\n\npublic class"
        ));
        assert_eq!(annotate(&updated, "Review test for performance bottlenecks"), Edit::Unchanged);
    }

    #[test]
    fn test_annotate_top_of_file() {
        let updated = changed(annotate("class A {}\n", "note"));
        assert_eq!(updated, "// FIXPILOT: suggested fix - note\nclass A {}\n");
    }
}
