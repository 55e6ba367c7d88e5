#![allow(async_fn_in_trait)]

use std::fmt::Display;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::anyhow;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;

// -----------------------------------------------------------------------------
// GitOps trait

/// Operations for interacting with Git.
///
/// Every operation takes the directory to run in explicitly; the lifecycle
/// engine retargets that directory when it redirects disruptive operations
/// into the work directory.
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Fetch a remote ref into a local branch.
    async fn fetch(&self, dir: &Path, url: &str, remote_ref: &str, branch: &str) -> Result<()>;

    /// Check whether a local branch exists.
    async fn branch_exists(&self, dir: &Path, branch: &str) -> Result<bool>;

    async fn checkout(&self, dir: &Path, reference: &str) -> Result<()>;
    async fn merge_base(&self, dir: &Path, a: &str, b: &str) -> Result<CommitId>;
    async fn head_commit(&self, dir: &Path) -> Result<CommitId>;

    /// Name of the currently checked-out branch.
    async fn current_branch(&self, dir: &Path) -> Result<String>;

    async fn delete_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Throw away all local modifications and untracked files.
    async fn reset_hard_and_clean(&self, dir: &Path) -> Result<()>;

    /// Merge `reference` into the current branch. Errors on conflict.
    async fn merge(&self, dir: &Path, reference: &str) -> Result<()>;

    /// Rebase the current branch onto `reference`. Errors on conflict.
    async fn rebase(&self, dir: &Path, reference: &str) -> Result<()>;

    /// Commit a resolved in-progress merge.
    async fn commit(&self, dir: &Path) -> Result<()>;

    /// Continue a suspended rebase after conflicts were staged.
    async fn rebase_continue(&self, dir: &Path) -> Result<()>;

    /// Top-level directory of the checkout containing `dir`.
    async fn top_level(&self, dir: &Path) -> Result<PathBuf>;

    async fn push(&self, dir: &Path, branch: &str) -> Result<()>;
    async fn pull(&self, dir: &Path, url: &str, remote_ref: &str) -> Result<()>;
}

#[derive(Clone, PartialEq, Eq)]
pub struct CommitId(pub String);

impl CommitId {
    /// Abbreviate to the fixed prefix length used in commit-range markers.
    pub fn abbrev(&self) -> &str {
        &self.0[..crate::app::COMMIT_ABBREV_LENGTH.min(self.0.len())]
    }
}

impl Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// -----------------------------------------------------------------------------
// RealGit

/// Real implementation that calls the git CLI
pub struct RealGit;

impl RealGit {
    async fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .current_dir(dir)
            .args(args)
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(String::from_utf8(output.stdout)?.trim().to_string())
    }
}

impl GitOps for RealGit {
    async fn fetch(&self, dir: &Path, url: &str, remote_ref: &str, branch: &str) -> Result<()> {
        let refspec = format!("{}:{}", remote_ref, branch);
        self.run(dir, &["fetch", url, &refspec]).await?;
        Ok(())
    }

    async fn branch_exists(&self, dir: &Path, branch: &str) -> Result<bool> {
        let reference = format!("refs/heads/{}", branch);
        let output = Command::new("git")
            .current_dir(dir)
            .args(["show-ref", "--verify", "--quiet", &reference])
            .output()
            .await
            .context("Failed to execute git command")?;

        // Exit code 0 means the ref exists, 1 means it doesn't
        Ok(output.status.success())
    }

    async fn checkout(&self, dir: &Path, reference: &str) -> Result<()> {
        self.run(dir, &["checkout", reference]).await?;
        Ok(())
    }

    async fn merge_base(&self, dir: &Path, a: &str, b: &str) -> Result<CommitId> {
        Ok(CommitId(self.run(dir, &["merge-base", a, b]).await?))
    }

    async fn head_commit(&self, dir: &Path) -> Result<CommitId> {
        Ok(CommitId(self.run(dir, &["rev-parse", "HEAD"]).await?))
    }

    async fn current_branch(&self, dir: &Path) -> Result<String> {
        self.run(dir, &["rev-parse", "--abbrev-ref", "HEAD"]).await
    }

    async fn delete_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(dir, &["branch", "-D", branch]).await?;
        Ok(())
    }

    async fn reset_hard_and_clean(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["reset", "--hard"]).await?;
        self.run(dir, &["clean", "-f"]).await?;
        Ok(())
    }

    async fn merge(&self, dir: &Path, reference: &str) -> Result<()> {
        self.run(dir, &["merge", reference]).await?;
        Ok(())
    }

    async fn rebase(&self, dir: &Path, reference: &str) -> Result<()> {
        self.run(dir, &["rebase", reference]).await?;
        Ok(())
    }

    async fn commit(&self, dir: &Path) -> Result<()> {
        // MERGE_MSG carries the default message for a resolved merge
        self.run(dir, &["commit", "--no-edit"]).await?;
        Ok(())
    }

    async fn rebase_continue(&self, dir: &Path) -> Result<()> {
        let output = Command::new("git")
            .current_dir(dir)
            .args(["rebase", "--continue"])
            .env("GIT_EDITOR", "true")
            .output()
            .await
            .context("Failed to execute git command")?;

        if !output.status.success() {
            return Err(anyhow!(
                "git command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }

        Ok(())
    }

    async fn top_level(&self, dir: &Path) -> Result<PathBuf> {
        Ok(PathBuf::from(
            self.run(dir, &["rev-parse", "--show-toplevel"]).await?,
        ))
    }

    async fn push(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(dir, &["push", "origin", branch]).await?;
        Ok(())
    }

    async fn pull(&self, dir: &Path, url: &str, remote_ref: &str) -> Result<()> {
        self.run(dir, &["pull", url, remote_ref]).await?;
        Ok(())
    }
}
