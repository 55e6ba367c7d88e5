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
    /// Merge the current pull request branch into the update branch and
    /// delete it, closing the request when configured to.
    pub async fn cmd_merge(
        &self,
        comment: Option<&str>,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let (branch, number) = self.current_request_branch().await?;
        let update_branch = &self.config.update_branch;

        writeln!(
            stdout,
            "{}\n",
            display::status(&format!("Merging {} into {}", branch, update_branch))
        )?;

        let dir = self.exec_dir();
        self.git
            .checkout(&dir, update_branch)
            .await
            .with_context(|| format!("Could not checkout {}", update_branch))?;

        if self.git.merge(&dir, &branch).await.is_err() {
            // No automatic retry; the operator resolves and re-runs merge
            bail!(
                "Merge with {} failed. Resolve conflicts, switch back into the pull request branch, and merge again",
                update_branch
            );
        }

        writeln!(
            stdout,
            "{}",
            display::status(&format!("Deleting branch {}", branch))
        )?;
        self.git
            .delete_branch(&dir, &branch)
            .await
            .context("Could not delete branch")?;

        if self.config.merge_auto_close {
            writeln!(stdout, "{}", display::status("Closing pull request"))?;
            self.close_pull_request(number, comment).await?;
        }

        writeln!(stdout, "\n{}\n", display::success("Merge completed"))?;
        self.display_status(stdout).await
    }
}
