use std::cell::RefCell;
use std::path::PathBuf;

use anyhow::Result;
use log::warn;

use crate::config::Config;
use crate::ops::fs::FsOps;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::store::StateStore;

/// Length commit ids are abbreviated to in commit-range markers
pub const COMMIT_ABBREV_LENGTH: usize = 10;

pub struct App<G, H, S, F> {
    pub config: Config,
    pub git: G,
    pub gh: H,
    pub store: S,
    pub fs: F,

    /// Directory all git operations run in. Retargeted when execution is
    /// redirected into the work directory, so it must be re-read per call.
    exec_dir: RefCell<PathBuf>,
}

impl<G: GitOps, H: GithubOps, S: StateStore, F: FsOps> App<G, H, S, F> {
    pub fn new(config: Config, git: G, gh: H, store: S, fs: F, exec_dir: PathBuf) -> Self {
        Self {
            config,
            git,
            gh,
            store,
            fs,
            exec_dir: RefCell::new(exec_dir),
        }
    }

    pub(crate) fn exec_dir(&self) -> PathBuf {
        self.exec_dir.borrow().clone()
    }

    pub(crate) fn set_exec_dir(&self, dir: PathBuf) {
        *self.exec_dir.borrow_mut() = dir;
    }
}

/// Shared helper methods for App
impl<G: GitOps, H: GithubOps, S: StateStore, F: FsOps> App<G, H, S, F> {
    /// Name of the currently checked-out branch.
    pub(crate) async fn current_branch(&self) -> Result<String> {
        let dir = self.exec_dir();
        self.git.current_branch(&dir).await
    }

    /// Current branch name, validated to be a pull request branch, together
    /// with the request number it encodes.
    pub(crate) async fn current_request_branch(&self) -> Result<(String, u64)> {
        let branch = self.current_branch().await?;
        let number = crate::naming::request_id(&self.config.local_branch_prefix, &branch)?;
        Ok((branch, number))
    }

    /// Trailer printed by every command.
    pub(crate) async fn display_status(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let branch = self.current_branch().await?;
        writeln!(stdout, "Current branch: {}", branch)?;
        Ok(())
    }

    /// Restrict a pull request listing to the update branch when configured.
    pub(crate) fn filter_open(
        &self,
        pull_requests: Vec<crate::ops::github::PullRequest>,
    ) -> Vec<crate::ops::github::PullRequest> {
        if !self.config.filter_by_update_branch {
            return pull_requests;
        }

        pull_requests
            .into_iter()
            .filter(|pull_request| pull_request.base.ref_name == self.config.update_branch)
            .collect()
    }

    /// Close a request on the hosting service, annotating the comment with
    /// the recorded commit range.
    ///
    /// Posting the comment is best-effort: a closed request without a comment
    /// beats neither.
    pub(crate) async fn close_pull_request(&self, number: u64, comment: Option<&str>) -> Result<()> {
        let mut comment = comment
            .map(str::to_string)
            .or_else(|| self.config.close_default_comment.clone());

        if let Some(range) = self.store.take_commit_range(number).await? {
            comment = Some(format!(
                "{}\n\nOriginal commits: {}",
                comment.unwrap_or_default(),
                range
            ));
        }

        if let Some(comment) = comment.filter(|c| !c.is_empty())
            && let Err(e) = self.gh.post_comment(number, &comment).await
        {
            warn!("Could not post close comment on request {}: {:#}", number, e);
        }

        self.gh.close(number).await
    }
}
