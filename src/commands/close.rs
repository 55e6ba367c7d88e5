use anyhow::Context;
use anyhow::Result;

use crate::app::App;
use crate::display;
use crate::ops::fs::FsOps;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::store::StateStore;

impl<G: GitOps, H: GithubOps, S: StateStore, F: FsOps> App<G, H, S, F> {
    /// Close the current pull request on the hosting service, then delete
    /// its local branch.
    pub async fn cmd_close(
        &self,
        comment: Option<&str>,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        writeln!(stdout, "{}\n", display::status("Closing pull request"))?;

        let (branch, number) = self.current_request_branch().await?;
        let pull_request = self.gh.get_pull_request(number).await?;
        write!(stdout, "{}", display::pull_request(&pull_request))?;

        self.close_pull_request(number, comment).await?;

        let update_branch = &self.config.update_branch;
        let dir = self.exec_dir();
        self.git
            .checkout(&dir, update_branch)
            .await
            .with_context(|| format!("Could not checkout {}", update_branch))?;

        writeln!(
            stdout,
            "{}",
            display::status(&format!("Deleting branch {}", branch))
        )?;
        self.git
            .delete_branch(&dir, &branch)
            .await
            .context("Could not delete branch")?;

        writeln!(stdout, "\n{}\n", display::success("Pull request closed"))?;
        self.display_status(stdout).await
    }
}
