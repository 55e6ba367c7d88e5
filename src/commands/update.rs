use anyhow::Context;
use anyhow::Result;
use anyhow::bail;

use crate::app::App;
use crate::config::UpdateMethod;
use crate::display;
use crate::naming;
use crate::ops::fs::FsOps;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::store::StateStore;

impl<G: GitOps, H: GithubOps, S: StateStore, F: FsOps> App<G, H, S, F> {
    /// Update a pull request branch with the changes in the update branch.
    ///
    /// The target is a request number (its branch name is derived from the
    /// request), a branch name, or the current branch when absent.
    pub async fn cmd_update(
        &self,
        target: Option<&str>,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let branch = match target {
            None => self.current_request_branch().await?.0,
            Some(target) => match target.parse::<u64>() {
                Ok(number) => {
                    let pull_request = self.gh.get_pull_request(number).await?;
                    naming::branch_name(&self.config.local_branch_prefix, &pull_request)
                }
                Err(_) => target.to_string(),
            },
        };

        writeln!(
            stdout,
            "{}",
            display::status(&format!(
                "Updating {} from {}",
                branch, self.config.update_branch
            ))
        )?;

        self.update_branch_flow(&branch, stdout).await?;

        writeln!(stdout)?;
        self.display_status(stdout).await
    }

    /// Continue an update suspended on conflicts.
    pub async fn cmd_continue_update(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        writeln!(
            stdout,
            "{}",
            display::status(&format!(
                "Continuing update from {}",
                self.config.update_branch
            ))
        )?;

        let dir = self.exec_dir();
        let completed = match self.config.update_method {
            UpdateMethod::Merge => self.git.commit(&dir).await,
            UpdateMethod::Rebase => self.git.rebase_continue(&dir).await,
        };

        if completed.is_err() {
            bail!(
                "Updating from {} failed\nResolve conflicts and 'git add' files, then run 'gitpr continue-update'",
                self.config.update_branch
            );
        }

        // The branch name is only knowable once the merge/rebase concluded
        let branch = self.current_branch().await?;
        self.complete_update(&branch, stdout).await?;

        writeln!(stdout)?;
        self.display_status(stdout).await
    }

    /// Run the update state machine for a branch: redirect into the work
    /// directory, record the commit range, merge or rebase, restore.
    pub(crate) async fn update_branch_flow(
        &self,
        branch: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        if self.in_work_dir().await? {
            bail!(
                "Cannot perform an update from within the work directory.\nIf you are done fixing conflicts run 'gitpr continue-update' to complete the update."
            );
        }

        let redirected = self.enter_work_dir(stdout).await?;
        if redirected {
            // A previous run may have crashed mid-operation; the work
            // directory must always start clean
            let dir = self.exec_dir();
            self.git
                .reset_hard_and_clean(&dir)
                .await
                .context("Cleaning up work directory failed, update not performed")?;
        }

        let dir = self.exec_dir();
        self.git.checkout(&dir, branch).await.with_context(|| {
            if redirected {
                format!(
                    "Could not checkout {} in the work directory, update not performed",
                    branch
                )
            } else {
                format!("Could not checkout {}, update not performed", branch)
            }
        })?;

        let number = naming::request_id(&self.config.local_branch_prefix, branch)?;

        let merge_base = self
            .git
            .merge_base(&dir, &self.config.update_branch, branch)
            .await?;
        let head = self.git.head_commit(&dir).await?;

        let range = if merge_base == head {
            head.abbrev().to_string()
        } else {
            format!("{}..{}", merge_base.abbrev(), head.abbrev())
        };

        // Recorded before the update runs, so the range reflects the work
        // done so far even when the update fails
        self.store.put_commit_range(number, &range).await?;
        writeln!(
            stdout,
            "{}",
            display::status(&format!("Original commits: {}", range))
        )?;

        let updated = match self.config.update_method {
            UpdateMethod::Merge => self.git.merge(&dir, &self.config.update_branch).await,
            UpdateMethod::Rebase => self.git.rebase(&dir, &self.config.update_branch).await,
        };

        if updated.is_err() {
            bail!(
                "Updating {} from {} failed\nResolve conflicts and 'git add' files, then run 'gitpr continue-update'",
                branch,
                self.config.update_branch
            );
        }

        self.complete_update(branch, stdout).await
    }

    /// Final leg of a successful update: restore the primary checkout when
    /// redirected, report completion.
    pub(crate) async fn complete_update(
        &self,
        branch: &str,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        if self.in_work_dir().await? {
            self.leave_work_dir(branch, stdout).await?;
        }

        writeln!(
            stdout,
            "\n{}",
            display::success(&format!(
                "Updating {} from {} complete",
                branch, self.config.update_branch
            ))
        )?;

        Ok(())
    }
}
