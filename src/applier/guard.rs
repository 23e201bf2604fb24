//! Protected-path policy
//!
//! Every target path is reduced to a root-relative form before it is
//! matched against the rule set. Anything that cannot be reduced that way
//! (home-relative, absolute outside the root, `..` escapes, symlinks leaving
//! the root) is treated as protected.

use crate::errors::{FixError, Result};
use regex::Regex;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Outcome of checking one target path
#[derive(Debug, Clone, PartialEq)]
pub enum PathVerdict {
    /// Path may be written
    Allowed {
        /// Root-relative, `/`-separated path
        relative: String,
        /// Absolute path under the root
        absolute: PathBuf,
    },

    /// Path must not be written
    Protected { reason: String },
}

/// Compiled protected-path rule
#[derive(Debug, Clone)]
struct ProtectedRule {
    pattern: String,
    regex: Regex,
}

/// Repository root plus the immutable rule set for a run
#[derive(Debug, Clone)]
pub struct ProtectedPaths {
    root: PathBuf,
    rules: Vec<ProtectedRule>,
}

impl ProtectedPaths {
    /// Compile rules for a repository root.
    ///
    /// Blank lines and `#` comments are ignored so a rules file can be
    /// passed through line by line.
    pub fn from_rules<I, S>(root: impl AsRef<Path>, rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(FixError::Config(format!(
                "Repository root does not exist: {}",
                root.display()
            )));
        }

        let root = root.canonicalize().map_err(|e| {
            FixError::Config(format!("Failed to canonicalize repository root: {}", e))
        })?;

        let mut compiled = Vec::new();
        for line in rules {
            let pattern = line.as_ref().trim();
            if pattern.is_empty() || pattern.starts_with('#') {
                continue;
            }
            let regex = Regex::new(&glob_to_regex(pattern))
                .map_err(|e| FixError::Pattern(format!("{}: {}", pattern, e)))?;
            compiled.push(ProtectedRule {
                pattern: pattern.to_string(),
                regex,
            });
        }

        Ok(Self {
            root,
            rules: compiled,
        })
    }

    /// Load rules from a file; a missing file yields an empty rule set.
    /// Relative `rules_file` paths are resolved against `root`.
    pub fn load(root: impl AsRef<Path>, rules_file: &Path) -> Result<Self> {
        let root = root.as_ref();
        let rules_path = if rules_file.is_absolute() {
            rules_file.to_path_buf()
        } else {
            root.join(rules_file)
        };

        let contents = match fs::read_to_string(&rules_path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %rules_path.display(), "No protected-path rules file");
                String::new()
            }
            Err(e) => return Err(FixError::Io(e)),
        };

        let guard = Self::from_rules(root, contents.lines())?;
        tracing::debug!(rules = guard.rules.len(), "Loaded protected-path rules");
        Ok(guard)
    }

    /// Canonical repository root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Rule patterns in load order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.pattern.as_str())
    }

    /// Root-relative, `/`-separated form of `path`
    pub fn relative_to_root(&self, path: &str) -> Result<String> {
        if path.starts_with('~') {
            return Err(FixError::PathOutsideRoot(path.to_string()));
        }

        let candidate = Path::new(path);
        let within_root = if candidate.is_absolute() {
            let resolved = resolve_existing(candidate);
            resolved
                .strip_prefix(&self.root)
                .map(Path::to_path_buf)
                .map_err(|_| FixError::PathOutsideRoot(path.to_string()))?
        } else {
            candidate.to_path_buf()
        };

        let parts = normalize(&within_root)
            .ok_or_else(|| FixError::PathOutsideRoot(path.to_string()))?;
        if parts.is_empty() {
            return Err(FixError::PathOutsideRoot(path.to_string()));
        }

        // Symlinks inside the tree must not lead out of it
        let absolute = self.root.join(parts.join("/"));
        if absolute.exists() && !resolve_existing(&absolute).starts_with(&self.root) {
            return Err(FixError::PathOutsideRoot(path.to_string()));
        }

        Ok(parts.join("/"))
    }

    /// First rule matching a root-relative path
    fn matching_rule(&self, relative: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.regex.is_match(relative))
            .map(|rule| rule.pattern.as_str())
    }

    /// Decide whether `path` may be written
    pub fn check(&self, path: &str) -> PathVerdict {
        match self.relative_to_root(path) {
            Err(_) => PathVerdict::Protected {
                reason: format!("File is protected (outside repository root): {}", path),
            },
            Ok(relative) => match self.matching_rule(&relative) {
                Some(rule) => PathVerdict::Protected {
                    reason: format!("File is protected by rule '{}': {}", rule, relative),
                },
                None => PathVerdict::Allowed {
                    absolute: self.root.join(&relative),
                    relative,
                },
            },
        }
    }

    /// Whether `path` is protected
    pub fn is_protected(&self, path: &str) -> bool {
        matches!(self.check(path), PathVerdict::Protected { .. })
    }
}

/// Canonicalize what exists of a path: the path itself, else its parent
/// joined with the file name, else the path unchanged
fn resolve_existing(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|p| p.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}

/// Lexically resolve `.` and `..`; `None` if the path climbs above its start
fn normalize(path: &Path) -> Option<Vec<String>> {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(parts)
}

/// Compile a glob rule into an anchored regular expression.
///
/// `**/` matches zero or more directories, `**` any run of characters,
/// `*` any run within one path segment and `?` one segment character.
/// A rule starting with `*` may match below any directory, and a match
/// also covers everything beneath the matched path.
pub fn glob_to_regex(pattern: &str) -> String {
    let pattern = pattern.trim_start_matches("./").trim_start_matches('/');
    let pattern = pattern.trim_end_matches('/');

    let mut regex = String::from("^");
    if pattern.starts_with('*') {
        regex.push_str("(?:.*/)?");
    }

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                if chars.get(i + 2) == Some(&'/') {
                    regex.push_str("(?:.*/)?");
                    i += 3;
                } else {
                    regex.push_str(".*");
                    i += 2;
                }
                continue;
            }
            '*' => regex.push_str("[^/]*"),
            '?' => regex.push_str("[^/]"),
            c => regex.push_str(&regex::escape(&c.to_string())),
        }
        i += 1;
    }

    regex.push_str("(?:/.*)?$");
    regex
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn guard(rules: &[&str]) -> (TempDir, ProtectedPaths) {
        let temp = TempDir::new().unwrap();
        let guard = ProtectedPaths::from_rules(temp.path(), rules.iter().copied()).unwrap();
        (temp, guard)
    }

    #[test]
    fn test_glob_translation() {
        assert_eq!(glob_to_regex("docs/*.md"), r"^docs/[^/]*\.md(?:/.*)?$");
        assert_eq!(glob_to_regex("**/pom.xml"), r"^(?:.*/)?(?:.*/)?pom\.xml(?:/.*)?$");
        assert_eq!(glob_to_regex("a?c"), r"^a[^/]c(?:/.*)?$");
    }

    #[test]
    fn test_directory_rule_protects_contents() {
        let (_temp, guard) = guard(&["scripts/agents"]);
        assert!(guard.is_protected("scripts/agents/qa-auto-fix.py"));
        assert!(guard.is_protected("scripts/agents"));
        assert!(!guard.is_protected("scripts/agentsmith.py"));
    }

    #[test]
    fn test_star_rules() {
        let (_temp, guard) = guard(&["*.md", ".github/**"]);
        assert!(guard.is_protected("README.md"));
        assert!(guard.is_protected("docs/guide.md"));
        assert!(guard.is_protected(".github/workflows/ci.yml"));
        assert!(!guard.is_protected("services/orders/src/Order.java"));
    }

    #[test]
    fn test_double_star_segment() {
        let (_temp, guard) = guard(&["services/**/secrets.properties"]);
        assert!(guard.is_protected("services/secrets.properties"));
        assert!(guard.is_protected("services/orders/conf/secrets.properties"));
        assert!(!guard.is_protected("services/orders/conf/app.properties"));
    }

    #[test]
    fn test_fail_safe_paths() {
        let (temp, guard) = guard(&[]);
        assert!(guard.is_protected("~/notes.txt"));
        assert!(guard.is_protected("/etc/passwd"));
        assert!(guard.is_protected("../outside.txt"));
        assert!(guard.is_protected("a/../../outside.txt"));
        assert!(guard.is_protected("."));

        let inside = temp.path().join("inside.txt");
        std::fs::write(&inside, "x").unwrap();
        assert!(!guard.is_protected(inside.to_str().unwrap()));
    }

    #[test]
    fn test_relative_normalization() {
        let (_temp, guard) = guard(&["secret/*"]);
        assert_eq!(guard.relative_to_root("./a/./b/../c.txt").unwrap(), "a/c.txt");
        assert!(guard.is_protected("public/../secret/key.pem"));
    }

    #[test]
    fn test_check_reports_rule() {
        let (_temp, guard) = guard(&["pom.xml"]);
        match guard.check("pom.xml") {
            PathVerdict::Protected { reason } => {
                assert!(reason.contains("protected"));
                assert!(reason.contains("pom.xml"));
            }
            other => panic!("expected protected, got {:?}", other),
        }
        match guard.check("services/orders/pom.xml") {
            PathVerdict::Allowed { relative, absolute } => {
                assert_eq!(relative, "services/orders/pom.xml");
                assert!(absolute.starts_with(guard.root()));
            }
            other => panic!("expected allowed, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rules_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("rules.txt"),
            "# protected\n\nscripts/agents\n  *.lock  \n",
        )
        .unwrap();

        let guard = ProtectedPaths::load(temp.path(), Path::new("rules.txt")).unwrap();
        let patterns: Vec<&str> = guard.patterns().collect();
        assert_eq!(patterns, vec!["scripts/agents", "*.lock"]);

        let empty = ProtectedPaths::load(temp.path(), Path::new("missing.txt")).unwrap();
        assert_eq!(empty.patterns().count(), 0);
    }

    #[test]
    fn test_invalid_root() {
        let result = ProtectedPaths::from_rules("/nonexistent/path/12345", Vec::<String>::new());
        assert!(result.is_err());
    }
}
