use anyhow::Context;
use anyhow::Result;
use anyhow::bail;

use crate::app::App;
use crate::display;
use crate::naming;
use crate::ops::fs::FsOps;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::ops::github::PullRequest;
use crate::store::StateStore;

impl<G: GitOps, H: GithubOps, S: StateStore, F: FsOps> App<G, H, S, F> {
    /// Fetch a pull request into a local branch, optionally updating it or
    /// checking it out.
    pub async fn cmd_fetch(
        &self,
        number: u64,
        auto_update: bool,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        writeln!(stdout, "{}\n", display::status("Fetching pull request"))?;

        let pull_request = self.gh.get_pull_request(number).await?;
        write!(stdout, "{}", display::pull_request(&pull_request))?;

        let branch = self.fetch_pull_request(&pull_request).await?;

        if auto_update {
            self.update_branch_flow(&branch, stdout).await?;
        } else if self.config.fetch_auto_checkout {
            let dir = self.exec_dir();
            self.git
                .checkout(&dir, &branch)
                .await
                .with_context(|| format!("Could not checkout {}", branch))?;
        }

        writeln!(stdout, "\n{}\n", display::success("Fetch completed"))?;
        self.display_status(stdout).await
    }

    /// Fetch all open pull requests into local branches.
    pub async fn cmd_fetch_all(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        writeln!(stdout, "{}\n", display::status("Fetching all pull requests"))?;

        let pull_requests = self.filter_open(self.gh.list_open().await?);

        for pull_request in &pull_requests {
            self.fetch_pull_request(pull_request).await?;
            writeln!(stdout, "{}\n", display::pull_request_minimal(pull_request))?;
        }

        self.display_status(stdout).await
    }

    /// Fetch a pull request's head into its local branch and return the
    /// branch name.
    ///
    /// A failed fetch is forgiven when the branch already exists locally.
    /// Any recorded commit range for the request is stale after this.
    pub(crate) async fn fetch_pull_request(&self, pull_request: &PullRequest) -> Result<String> {
        let branch = naming::branch_name(&self.config.local_branch_prefix, pull_request);
        let url = pull_request.fetch_url();
        let dir = self.exec_dir();

        let fetched = self
            .git
            .fetch(&dir, &url, &pull_request.head.ref_name, &branch)
            .await;

        if fetched.is_err() && !self.git.branch_exists(&dir, &branch).await? {
            bail!("Fetch failed");
        }

        self.store.clear_commit_range(pull_request.number).await?;

        Ok(branch)
    }
}
