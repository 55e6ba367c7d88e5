use anyhow::Context;
use anyhow::Result;

use crate::app::App;
use crate::commands::show::open_url;
use crate::config;
use crate::display;
use crate::naming;
use crate::ops::fs::FsOps;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::store::StateStore;

impl<G: GitOps, H: GithubOps, S: StateStore, F: FsOps> App<G, H, S, F> {
    /// Push the current branch and send a pull request to the reviewer repo.
    pub async fn cmd_submit(
        &self,
        body: Option<&str>,
        title: Option<&str>,
        tags: &[String],
        open_browser: bool,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        let branch = self.current_branch().await?;

        writeln!(
            stdout,
            "{}",
            display::status(&format!("Submitting pull request for {}", branch))
        )?;

        let reviewer_repo = self.reviewer_repo()?;

        writeln!(
            stdout,
            "{}",
            display::status(&format!("Pushing local branch {} to origin", branch))
        )?;
        let dir = self.exec_dir();
        self.git
            .push(&dir, &branch)
            .await
            .context("Could not push this branch to your origin")?;

        let title = naming::title(
            &branch,
            title,
            tags,
            &self.config.title_tag_prefix,
            &self.config.title_tag_suffix,
        );
        let body = body.unwrap_or("");

        let user = self
            .config
            .user
            .as_deref()
            .context("No github.user configured")?;
        let head = format!("{}:{}", user, branch);

        writeln!(
            stdout,
            "{}",
            display::status(&format!("Sending pull request to {}", reviewer_repo))
        )?;

        let pull_request = self
            .gh
            .create(&reviewer_repo, &head, &self.config.update_branch, &title, body)
            .await?;

        writeln!(stdout, "\n{}", display::pull_request(&pull_request))?;
        writeln!(stdout, "{}\n", display::success("Pull request submitted"))?;
        self.display_status(stdout).await?;

        if open_browser {
            open_url(&pull_request.html_url).await?;
        }

        Ok(())
    }

    /// Repository the pull request is sent to.
    ///
    /// A bare reviewer name addresses that user's fork of this repository;
    /// without any reviewer the `upstream` remote decides.
    fn reviewer_repo(&self) -> Result<String> {
        let reviewer = match &self.config.reviewer {
            Some(reviewer) => reviewer.clone(),
            None => config::repo_name_for_remote("upstream")
                .context("Could not determine a repo to submit this pull request to")?,
        };

        if reviewer.contains('/') {
            return Ok(reviewer);
        }

        let user = self
            .config
            .user
            .as_deref()
            .context("No github.user configured")?;
        Ok(self.config.repo.replace(user, &reviewer))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::app::App;
    use crate::config::Config;
    use crate::ops::fs::MockFsOps;
    use crate::ops::git::MockGitOps;
    use crate::ops::github::MockGithubOps;
    use crate::ops::github::test_pull_request;
    use crate::store::MockStateStore;

    fn app(
        config: Config,
        git: MockGitOps,
        gh: MockGithubOps,
    ) -> App<MockGitOps, MockGithubOps, MockStateStore, MockFsOps> {
        App::new(
            config,
            git,
            gh,
            MockStateStore::new(),
            MockFsOps::new(),
            PathBuf::from("/home/dev/project"),
        )
    }

    #[tokio::test]
    async fn submit_pushes_and_creates_request_on_reviewer_repo() {
        let mut config = Config::default_for_tests();
        config.reviewer = Some("acme/repo".to_string());

        let mut git = MockGitOps::new();
        git.expect_current_branch()
            .returning(|_| Ok("LPS-1234-fix".to_string()));
        git.expect_push()
            .withf(|_, branch| branch == "LPS-1234-fix")
            .times(1)
            .returning(|_, _| Ok(()));

        let mut gh = MockGithubOps::new();
        gh.expect_create()
            .withf(|repo, head, base, title, body| {
                repo == "acme/repo"
                    && head == "dev:LPS-1234-fix"
                    && base == "master"
                    && title == "LPS-1234"
                    && body.is_empty()
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(test_pull_request(99, "LPS-1234", "LPS-1234-fix")));

        let app = app(config, git, gh);

        let mut stdout = Vec::new();
        app.cmd_submit(None, None, &[], false, &mut stdout)
            .await
            .unwrap();

        let out = String::from_utf8(stdout).unwrap();
        assert!(out.contains("Pull request submitted"));
    }

    #[tokio::test]
    async fn submit_expands_bare_reviewer_to_their_fork() {
        let mut config = Config::default_for_tests();
        config.repo = "dev/liferay".to_string();
        config.reviewer = Some("brian".to_string());

        let mut git = MockGitOps::new();
        git.expect_current_branch()
            .returning(|_| Ok("fix".to_string()));
        git.expect_push().returning(|_, _| Ok(()));

        let mut gh = MockGithubOps::new();
        gh.expect_create()
            .withf(|repo, _, _, _, _| repo == "brian/liferay")
            .times(1)
            .returning(|_, _, _, _, _| Ok(test_pull_request(99, "fix", "fix")));

        let app = app(config, git, gh);

        let mut stdout = Vec::new();
        app.cmd_submit(None, None, &[], false, &mut stdout)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn submit_applies_title_and_tags() {
        let mut config = Config::default_for_tests();
        config.reviewer = Some("acme/repo".to_string());

        let mut git = MockGitOps::new();
        git.expect_current_branch()
            .returning(|_| Ok("fix".to_string()));
        git.expect_push().returning(|_, _| Ok(()));

        let mut gh = MockGithubOps::new();
        gh.expect_create()
            .withf(|_, _, _, title, body| title == "Fix everything [6.2.x]" && body == "Details")
            .times(1)
            .returning(|_, _, _, _, _| Ok(test_pull_request(99, "fix", "fix")));

        let app = app(config, git, gh);

        let mut stdout = Vec::new();
        app.cmd_submit(
            Some("Details"),
            Some("Fix everything"),
            &["6.2.x".to_string()],
            false,
            &mut stdout,
        )
        .await
        .unwrap();
    }
}
