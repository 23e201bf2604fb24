//! Post-edit verification
//!
//! Source-file edits are only durable once a verifier accepts them. The
//! build check itself is external; `CommandVerifier` runs a configured
//! command in the owning service directory.

use crate::errors::{FixError, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Bytes of verifier output kept in error messages
const OUTPUT_TAIL_CHARS: usize = 2_000;

/// Accepts or rejects an edited file
pub trait Verifier {
    /// Verify `relative` (root-relative) after it was edited
    fn verify(&self, root: &Path, relative: &str) -> Result<()>;
}

/// Verifier that accepts every edit
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Verifier for AcceptAll {
    fn verify(&self, _root: &Path, _relative: &str) -> Result<()> {
        Ok(())
    }
}

/// Runs an external command; a non-zero exit rejects the edit
#[derive(Debug, Clone)]
pub struct CommandVerifier {
    argv: Vec<String>,
    services_dir: String,
}

impl CommandVerifier {
    /// Create verifier for `argv`; runs in `<root>/<services_dir>/<service>`
    /// when the file belongs to a service, else in the root
    pub fn new(argv: Vec<String>, services_dir: impl Into<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(FixError::Config(
                "verify_command must name a program".to_string(),
            ));
        }
        Ok(Self {
            argv,
            services_dir: services_dir.into(),
        })
    }

    /// Directory the command runs in
    pub fn working_dir(&self, root: &Path, relative: &str) -> PathBuf {
        let services_dir = self.services_dir.trim_matches('/');
        let service = relative
            .strip_prefix(services_dir)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(|rest| rest.split('/').next())
            .filter(|service| !service.is_empty());

        match service {
            Some(service) => root.join(services_dir).join(service),
            None => root.to_path_buf(),
        }
    }
}

impl Verifier for CommandVerifier {
    fn verify(&self, root: &Path, relative: &str) -> Result<()> {
        let dir = self.working_dir(root, relative);
        tracing::debug!(command = ?self.argv, dir = %dir.display(), file = relative, "Verifying edit");

        let output = Command::new(&self.argv[0])
            .args(&self.argv[1..])
            .current_dir(&dir)
            .output()
            .map_err(|e| FixError::Verification(format!("Failed to run {}: {}", self.argv[0], e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = if stderr.trim().is_empty() { stdout } else { stderr };

        Err(FixError::Verification(format!(
            "{} exited with {}: {}",
            self.argv[0],
            output.status,
            tail(text.trim(), OUTPUT_TAIL_CHARS)
        )))
    }
}

fn tail(text: &str, max_chars: usize) -> String {
    let count = text.chars().count();
    if count <= max_chars {
        return text.to_string();
    }
    text.chars().skip(count - max_chars).collect()
}
