#![allow(async_fn_in_trait)]

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
#[cfg(test)]
use mockall::automock;

// -----------------------------------------------------------------------------
// StateStore trait

/// Durable keyed records surviving across invocations.
///
/// Two kinds of records exist: the per-request commit-range marker written by
/// an update and consumed by the close that follows it, and the original
/// directory pointer written when execution is redirected into the work
/// directory. Absence of a record is never an error.
#[cfg_attr(test, automock)]
pub trait StateStore {
    async fn put_commit_range(&self, number: u64, range: &str) -> Result<()>;

    /// Read and remove the commit range for a request. A second take for the
    /// same request returns `None`.
    async fn take_commit_range(&self, number: u64) -> Result<Option<String>>;

    /// Drop any recorded commit range for a request.
    async fn clear_commit_range(&self, number: u64) -> Result<()>;

    async fn put_original_dir(&self, dir: &Path) -> Result<()>;
    async fn get_original_dir(&self) -> Result<Option<PathBuf>>;
}

// -----------------------------------------------------------------------------
// FileStore

/// File-backed store, one file per record.
///
/// Writes go through a sibling temp file and a rename, so a crash mid-write
/// leaves either the old or the new value, never a torn one.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Default process-wide location, scoped by tool name.
    pub fn default_root() -> PathBuf {
        std::env::temp_dir().join("git-pull-request")
    }

    fn commit_range_path(&self, number: u64) -> PathBuf {
        self.root.join(format!("commit-range-{}", number))
    }

    fn original_dir_path(&self) -> PathBuf {
        self.root.join("original-dir")
    }

    async fn write_atomic(&self, path: &Path, contents: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .context("Failed to create state directory")?;

        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, contents)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, path)
            .await
            .with_context(|| format!("Failed to replace {}", path.display()))?;

        Ok(())
    }

    async fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    async fn remove_if_present(&self, path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", path.display())),
        }
    }
}

impl StateStore for FileStore {
    async fn put_commit_range(&self, number: u64, range: &str) -> Result<()> {
        self.write_atomic(&self.commit_range_path(number), range)
            .await
    }

    async fn take_commit_range(&self, number: u64) -> Result<Option<String>> {
        let path = self.commit_range_path(number);
        let Some(range) = self.read_optional(&path).await? else {
            return Ok(None);
        };

        self.remove_if_present(&path).await?;
        Ok(Some(range))
    }

    async fn clear_commit_range(&self, number: u64) -> Result<()> {
        self.remove_if_present(&self.commit_range_path(number)).await
    }

    async fn put_original_dir(&self, dir: &Path) -> Result<()> {
        self.write_atomic(&self.original_dir_path(), &dir.to_string_lossy())
            .await
    }

    async fn get_original_dir(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .read_optional(&self.original_dir_path())
            .await?
            .map(PathBuf::from))
    }
}
