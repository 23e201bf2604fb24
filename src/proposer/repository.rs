//! Repository lookups used while proposing fixes
//!
//! Resolves class names to import paths, locates build descriptors and
//! test sources under the configured repository layout.

use crate::proposer::types::DependencyCoordinates;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Directory and naming conventions of the repository under repair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryLayout {
    /// Directory holding one sub-directory per service
    pub services_dir: String,

    /// Shared-library source root
    pub shared_models_dir: String,

    /// Main source root inside a service
    pub source_root: String,

    /// Test source root inside a service
    pub test_root: String,

    /// Extension of language source files (verified after edits)
    pub source_extension: String,

    /// Build descriptor file name inside a service
    pub build_descriptor: String,

    /// Package prefix owned by the shared library
    pub shared_namespace: String,

    /// Package of types found under `shared_models_dir`
    pub shared_models_package: String,

    /// Dependency that provides the shared namespace
    pub shared_dependency: DependencyCoordinates,
}

impl Default for RepositoryLayout {
    fn default() -> Self {
        Self {
            services_dir: "services".to_string(),
            shared_models_dir: "shared/models".to_string(),
            source_root: "src/main/java".to_string(),
            test_root: "src/test".to_string(),
            source_extension: "java".to_string(),
            build_descriptor: "pom.xml".to_string(),
            shared_namespace: "io.leanda.ng.shared".to_string(),
            shared_models_package: "io.leanda.ng.shared.models".to_string(),
            shared_dependency: DependencyCoordinates {
                group_id: "io.leanda.ng".to_string(),
                artifact_id: "shared-models".to_string(),
                version: "1.0.0-SNAPSHOT".to_string(),
            },
        }
    }
}

/// Read-only view of the repository
#[derive(Debug, Clone)]
pub struct RepositoryContext {
    root: PathBuf,
    layout: RepositoryLayout,
}

impl RepositoryContext {
    /// Create context rooted at `root`
    pub fn new(root: impl Into<PathBuf>, layout: RepositoryLayout) -> Self {
        Self {
            root: root.into(),
            layout,
        }
    }

    /// Repository root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Layout conventions
    pub fn layout(&self) -> &RepositoryLayout {
        &self.layout
    }

    /// Directory of a service
    pub fn service_dir(&self, service: &str) -> PathBuf {
        self.root.join(&self.layout.services_dir).join(service)
    }

    /// Root-relative build descriptor of a service, if it exists
    pub fn descriptor_for(&self, service: &str) -> Option<String> {
        let path = self.service_dir(service).join(&self.layout.build_descriptor);
        if path.is_file() {
            Some(format!(
                "{}/{}/{}",
                self.layout.services_dir, service, self.layout.build_descriptor
            ))
        } else {
            None
        }
    }

    /// Service named by a `services/<name>/` segment in free text or a path
    pub fn service_in_text(&self, text: &str) -> Option<String> {
        let marker = format!("{}/", self.layout.services_dir);
        let start = text.find(&marker)? + marker.len();
        let name: String = text[start..]
            .chars()
            .take_while(|c| *c != '/' && *c != '\\' && !c.is_whitespace())
            .collect();

        if name.is_empty() || !text[start + name.len()..].starts_with(['/', '\\']) {
            return None;
        }
        Some(name)
    }

    /// Whether a root-relative descriptor already declares `artifact_id`
    pub fn descriptor_declares(&self, descriptor: &str, artifact_id: &str) -> bool {
        fs::read_to_string(self.root.join(descriptor))
            .map(|content| content.contains(&format!("<artifactId>{}</artifactId>", artifact_id)))
            .unwrap_or(false)
    }

    /// Fully-qualified import path for a class, searching the service's
    /// source root first and the shared library second
    pub fn find_import_path(&self, class_name: &str, service: Option<&str>) -> Option<String> {
        if let Some(service) = service {
            let source_root = self.service_dir(service).join(&self.layout.source_root);
            let package = self
                .find_sources(&source_root, class_name)
                .find_map(|file| {
                    declared_package(&file).or_else(|| package_from_path(&source_root, &file))
                });
            if let Some(package) = package {
                return Some(format!("{}.{}", package, class_name));
            }
        }

        let shared_dir = self.root.join(&self.layout.shared_models_dir);
        self.find_sources(&shared_dir, class_name)
            .next()
            .map(|_| format!("{}.{}", self.layout.shared_models_package, class_name))
    }

    /// Source files under `dir` named after `class_name`
    fn find_sources<'a>(
        &'a self,
        dir: &Path,
        class_name: &'a str,
    ) -> impl Iterator<Item = PathBuf> + 'a {
        let extension = self.layout.source_extension.as_str();
        dir.is_dir()
            .then(|| source_files(dir))
            .into_iter()
            .flatten()
            .filter(move |path| path.extension().and_then(|e| e.to_str()) == Some(extension))
            .filter(move |path| file_stem(path) == class_name)
    }

    /// Root-relative test files in a service whose name overlaps `test_class`
    pub fn find_similar_tests(&self, test_class: &str, service: &str) -> Vec<String> {
        let test_dir = self.service_dir(service).join(&self.layout.test_root);
        if !test_dir.is_dir() {
            return Vec::new();
        }

        let needle = test_class.to_lowercase();
        let suffix = format!("Test.{}", self.layout.source_extension);

        source_files(&test_dir)
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.ends_with(&suffix))
            })
            .filter(|path| {
                let stem = file_stem(path).to_lowercase();
                stem.contains(&needle) || needle.contains(&stem)
            })
            .filter_map(|path| self.relative(&path))
            .collect()
    }

    /// First test source for a `service-TestClass-...` failure id
    pub fn find_test_file(&self, failure_id: &str) -> Option<String> {
        let mut parts = failure_id.split('-');
        let service = parts.next().filter(|s| !s.is_empty())?;
        let test_class = parts.next().filter(|s| !s.is_empty())?;

        let test_dir = self.service_dir(service).join(&self.layout.test_root);
        if !test_dir.is_dir() {
            return None;
        }

        let extension = self.layout.source_extension.as_str();
        source_files(&test_dir)
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(extension))
            .find(|path| file_stem(path).contains(test_class))
            .and_then(|path| self.relative(&path))
    }

    /// Root-relative, `/`-separated form of a path under the root
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}

/// Regular files under `dir`, in a stable order, skipping backup artifacts
fn source_files(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map_or(true, |e| e != "backup"))
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `package a.b.c;` declaration of a source file
fn declared_package(file: &Path) -> Option<String> {
    static PACKAGE: OnceLock<Regex> = OnceLock::new();
    let package = PACKAGE
        .get_or_init(|| Regex::new(r"(?m)^\s*package\s+([\w.]+)\s*;").expect("static regex"));

    let content = fs::read_to_string(file).ok()?;
    package
        .captures(&content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Package derived from the directory path below the source root
fn package_from_path(source_root: &Path, file: &Path) -> Option<String> {
    let parent = file.parent()?.strip_prefix(source_root).ok()?;
    let segments: Vec<String> = parent
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_repo() -> (TempDir, RepositoryContext) {
        let temp = TempDir::new().unwrap();
        let root = temp.path();

        fs::create_dir_all(root.join("services/orders/src/main/java/com/acme/orders")).unwrap();
        fs::create_dir_all(root.join("services/orders/src/test/java/com/acme/orders")).unwrap();
        fs::create_dir_all(root.join("shared/models")).unwrap();

        fs::write(
            root.join("services/orders/src/main/java/com/acme/orders/Order.java"),
            "package com.acme.orders;\n\npublic class Order {}\n",
        )
        .unwrap();
        fs::write(
            root.join("services/orders/src/main/java/com/acme/orders/Line.java"),
            "public class Line {}\n",
        )
        .unwrap();
        fs::write(
            root.join("services/orders/src/test/java/com/acme/orders/OrderServiceTest.java"),
            "class OrderServiceTest {}\n",
        )
        .unwrap();
        fs::write(root.join("services/orders/pom.xml"), "<project></project>\n").unwrap();
        fs::write(root.join("shared/models/Widget.java"), "class Widget {}\n").unwrap();

        let ctx = RepositoryContext::new(root, RepositoryLayout::default());
        (temp, ctx)
    }

    #[test]
    fn test_import_from_declared_package() {
        let (_temp, ctx) = setup_repo();
        assert_eq!(
            ctx.find_import_path("Order", Some("orders")),
            Some("com.acme.orders.Order".to_string())
        );
    }

    #[test]
    fn test_import_from_directory_path() {
        let (_temp, ctx) = setup_repo();
        assert_eq!(
            ctx.find_import_path("Line", Some("orders")),
            Some("com.acme.orders.Line".to_string())
        );
    }

    #[test]
    fn test_import_falls_back_to_shared() {
        let (_temp, ctx) = setup_repo();
        assert_eq!(
            ctx.find_import_path("Widget", Some("orders")),
            Some("io.leanda.ng.shared.models.Widget".to_string())
        );
        assert_eq!(
            ctx.find_import_path("Widget", None),
            Some("io.leanda.ng.shared.models.Widget".to_string())
        );
        assert!(ctx.find_import_path("Gadget", Some("orders")).is_none());
    }

    #[test]
    fn test_import_ignores_non_source_namesakes() {
        let (temp, ctx) = setup_repo();
        let root = temp.path();
        fs::create_dir_all(root.join("services/orders/docs")).unwrap();
        fs::write(root.join("services/orders/docs/Invoice.md"), "# Invoice\n").unwrap();
        fs::create_dir_all(root.join("services/orders/src/main/java/com/acme/billing")).unwrap();
        fs::write(
            root.join("services/orders/src/main/java/com/acme/billing/Invoice.java"),
            "package com.acme.billing;\n\npublic class Invoice {}\n",
        )
        .unwrap();

        assert_eq!(
            ctx.find_import_path("Invoice", Some("orders")),
            Some("com.acme.billing.Invoice".to_string())
        );
    }

    #[test]
    fn test_descriptor_lookup() {
        let (_temp, ctx) = setup_repo();
        assert_eq!(ctx.descriptor_for("orders"), Some("services/orders/pom.xml".to_string()));
        assert!(ctx.descriptor_for("billing").is_none());
        assert!(!ctx.descriptor_declares("services/orders/pom.xml", "shared-models"));
    }

    #[test]
    fn test_service_in_text() {
        let (_temp, ctx) = setup_repo();
        assert_eq!(
            ctx.service_in_text("[ERROR] /ci/services/orders/src/main/java/X.java:[3,1]"),
            Some("orders".to_string())
        );
        assert!(ctx.service_in_text("no path here").is_none());
        assert!(ctx.service_in_text("services/orders").is_none());
    }

    #[test]
    fn test_similar_tests_and_test_file() {
        let (_temp, ctx) = setup_repo();

        let similar = ctx.find_similar_tests("OrderService", "orders");
        assert_eq!(
            similar,
            vec!["services/orders/src/test/java/com/acme/orders/OrderServiceTest.java".to_string()]
        );

        assert_eq!(
            ctx.find_test_file("orders-OrderServiceTest-createsOrder"),
            Some("services/orders/src/test/java/com/acme/orders/OrderServiceTest.java".to_string())
        );
        assert!(ctx.find_test_file("billing-X-y").is_none());
    }
}
