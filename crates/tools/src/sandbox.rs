//! Path sandboxing for the file tools.
//!
//! Every path handed to `read_file`, `write_file` or `list_directory` is
//! interpreted relative to a single sandbox directory and must stay inside it.

use std::path::{Component, Path, PathBuf};

/// Error returned when a path cannot be mapped into the sandbox.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Path '{path}' is outside the sandbox directory")]
    OutsideSandbox { path: String },

    #[error("Failed to canonicalize path '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },
}

/// A directory the file tools are confined to.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the sandbox directory if it does not exist yet.
    pub async fn ensure_root(&self) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await
    }

    /// Map a tool-supplied path to a location inside the sandbox.
    ///
    /// Relative paths are joined onto the root; absolute paths are accepted
    /// only when they already point below it. Existing targets are
    /// canonicalized so a symlink cannot lead outside.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, SandboxError> {
        let normalized = path.replace('\\', "/");
        let input = Path::new(&normalized);

        if input.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(SandboxError::PathTraversal { path: path.into() });
        }

        let candidate = if input.is_absolute() {
            if !input.starts_with(&self.root) {
                return Err(SandboxError::OutsideSandbox { path: path.into() });
            }
            input.to_path_buf()
        } else {
            let relative: PathBuf = input
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .collect();
            self.root.join(relative)
        };

        if candidate.exists() && self.root.exists() {
            let canonical_root = canonicalize(&self.root, path)?;
            let canonical = canonicalize(&candidate, path)?;
            if !canonical.starts_with(&canonical_root) {
                return Err(SandboxError::OutsideSandbox { path: path.into() });
            }
            return Ok(canonical);
        }

        Ok(candidate)
    }
}

fn canonicalize(p: &Path, original: &str) -> Result<PathBuf, SandboxError> {
    p.canonicalize()
        .map_err(|e| SandboxError::CanonicalizeFailed {
            path: original.into(),
            reason: e.to_string(),
        })
}
