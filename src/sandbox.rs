//! Output path sandbox.
//!
//! When an allowed root is configured every output path must resolve to the
//! root itself or something below it. Two checks run, both component-wise
//! (so `/out2` is never "inside" `/out`):
//!
//! 1. **Lexical**: both paths are made absolute and `.`/`..` components are
//!    folded away without touching the filesystem.
//! 2. **Physical**: the deepest existing ancestor of each path is
//!    canonicalized, which follows symlinks already on disk.
//!
//! Without a root the sandbox accepts everything.

use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Path '{}' is outside allowed directory '{}'", path.display(), root.display())]
    OutsideAllowedDirectory { path: PathBuf, root: PathBuf },
    #[error("Cannot resolve path '{}': {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Default)]
pub struct PathSandbox {
    root: Option<PathBuf>,
}

impl PathSandbox {
    pub fn new(root: Option<PathBuf>) -> Self {
        Self { root }
    }

    /// A sandbox that accepts every path.
    pub fn open() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    /// Check `candidate` and return its normalized absolute form.
    pub fn validate(&self, candidate: &Path) -> Result<PathBuf, SandboxError> {
        let Some(root) = &self.root else {
            return Ok(candidate.to_path_buf());
        };

        let abs_root = normalize(root)?;
        let abs_path = normalize(candidate)?;
        let outside = || SandboxError::OutsideAllowedDirectory {
            path: abs_path.clone(),
            root: abs_root.clone(),
        };

        if !abs_path.starts_with(&abs_root) {
            return Err(outside());
        }
        if !resolve_existing(&abs_path)?.starts_with(resolve_existing(&abs_root)?) {
            return Err(outside());
        }
        Ok(abs_path)
    }
}

/// Absolute path with `.` and `..` folded lexically. `..` at the filesystem
/// root stays at the root.
pub fn normalize(path: &Path) -> Result<PathBuf, SandboxError> {
    let absolute = std::path::absolute(path).map_err(|source| SandboxError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    Ok(out)
}

/// Canonicalize the longest existing prefix of an already-normalized path
/// and re-attach the part that does not exist yet.
fn resolve_existing(path: &Path) -> Result<PathBuf, SandboxError> {
    let mut existing = path;
    let mut rest = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(path.to_path_buf()),
        }
    }

    let mut resolved = existing
        .canonicalize()
        .map_err(|source| SandboxError::Resolve {
            path: existing.to_path_buf(),
            source,
        })?;
    resolved.extend(rest.iter().rev());
    Ok(resolved)
}
