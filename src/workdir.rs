//! Work-directory redirection.
//!
//! Disruptive operations (hard reset, rebase, merge, branch deletion) can be
//! redirected into a separate checkout so the developer's primary checkout is
//! not churned while conflicts are resolved. The primary checkout is only
//! touched once the operation has succeeded, with a single checkout or
//! fast-forward-style sync.

use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;

use crate::app::App;
use crate::display;
use crate::ops::fs::FsOps;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::store::StateStore;

impl<G: GitOps, H: GithubOps, S: StateStore, F: FsOps> App<G, H, S, F> {
    /// Whether execution is currently redirected into the work directory.
    ///
    /// Recomputed structurally on every call: the top-level of the current
    /// execution directory must be the configured work directory, and the
    /// work directory's `.git/config` must be a symlink into the primary
    /// checkout.
    pub(crate) async fn in_work_dir(&self) -> Result<bool> {
        let Some(work_dir) = &self.config.work_dir else {
            return Ok(false);
        };

        let dir = self.exec_dir();
        let top_level = self.git.top_level(&dir).await?;

        Ok(top_level == *work_dir && self.fs.is_symlink(&top_level.join(".git/config")))
    }

    /// Redirect execution into the work directory, recording where to return
    /// to. Returns false (and does nothing) when no usable work directory is
    /// configured.
    pub(crate) async fn enter_work_dir(
        &self,
        stdout: &mut impl std::io::Write,
    ) -> Result<bool> {
        let Some(work_dir) = self.config.work_dir.clone() else {
            return Ok(false);
        };
        if !self.fs.exists(&work_dir) {
            return Ok(false);
        }

        let dir = self.exec_dir();
        let original_dir = self.git.top_level(&dir).await?;
        self.store.put_original_dir(&original_dir).await?;

        writeln!(
            stdout,
            "{}",
            display::status(&format!(
                "Switching to work directory {}",
                work_dir.display()
            ))
        )?;

        self.set_exec_dir(work_dir);
        Ok(true)
    }

    /// Return execution to the primary checkout, leaving it on `branch`.
    ///
    /// Only valid while inside the work directory. The work directory is
    /// parked on the update branch; the primary checkout is then either
    /// synced in place (when it is already on `branch`) or switched to the
    /// branch the work directory produced.
    pub(crate) async fn leave_work_dir(
        &self,
        branch: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let update_branch = &self.config.update_branch;

        let work_dir = self.exec_dir();
        self.git
            .checkout(&work_dir, update_branch)
            .await
            .with_context(|| {
                format!(
                    "Could not checkout {} branch in work directory",
                    update_branch
                )
            })?;

        let original_dir = self.original_dir(&work_dir).await?;

        writeln!(
            stdout,
            "{}",
            display::status(&format!(
                "Switching to original directory: '{}'",
                original_dir.display()
            ))
        )?;

        self.set_exec_dir(original_dir.clone());

        if self.git.current_branch(&original_dir).await? == branch {
            // The primary checkout already has the branch checked out; sync
            // its files to the work directory's result
            self.git
                .reset_hard_and_clean(&original_dir)
                .await
                .with_context(|| {
                    format!("Syncing branch {} with work directory failed", branch)
                })?;
        } else {
            self.git
                .checkout(&original_dir, branch)
                .await
                .with_context(|| format!("Could not checkout {}", branch))?;
        }

        Ok(())
    }

    /// Primary checkout to return to after leaving the work directory.
    ///
    /// Prefers the recorded pointer; falls back to following the work
    /// directory's `.git/config` symlink back into the primary checkout's
    /// metadata.
    async fn original_dir(&self, work_dir: &std::path::Path) -> Result<PathBuf> {
        if let Some(dir) = self.store.get_original_dir().await? {
            return Ok(dir);
        }

        let config_target = self.fs.read_link(&work_dir.join(".git/config"))?;
        let original = config_target
            .parent()
            .and_then(|git_dir| git_dir.parent())
            .map(PathBuf::from);

        match original {
            Some(dir) => Ok(dir),
            None => bail!(
                "Could not determine the original directory for work directory {}",
                work_dir.display()
            ),
        }
    }
}
