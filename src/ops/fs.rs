use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
#[cfg(test)]
use mockall::automock;

// -----------------------------------------------------------------------------
// FsOps trait

/// Directory metadata operations.
///
/// The work-directory predicate depends on symlink inspection; keeping it
/// behind a trait lets tests simulate both checkout layouts without touching
/// the real filesystem.
#[cfg_attr(test, automock)]
pub trait FsOps {
    fn exists(&self, path: &Path) -> bool;
    fn is_symlink(&self, path: &Path) -> bool;
    fn read_link(&self, path: &Path) -> Result<PathBuf>;
}

// -----------------------------------------------------------------------------
// RealFs

pub struct RealFs;

impl FsOps for RealFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_symlink(&self, path: &Path) -> bool {
        path.symlink_metadata()
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false)
    }

    fn read_link(&self, path: &Path) -> Result<PathBuf> {
        std::fs::read_link(path).with_context(|| format!("Failed to read link {}", path.display()))
    }
}
