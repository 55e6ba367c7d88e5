use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use colored::Colorize;
use futures_util::future::join_all;

use crate::app::App;
use crate::display;
use crate::ops::fs::FsOps;
use crate::ops::git::GitOps;
use crate::ops::github::GithubOps;
use crate::store::StateStore;

impl<G: GitOps, H: GithubOps, S: StateStore, F: FsOps> App<G, H, S, F> {
    /// List the open pull requests on this repository.
    pub async fn cmd_show(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let scope = if self.config.filter_by_update_branch {
            format!("on branch '{}'", self.config.update_branch)
        } else {
            "across all branches".to_string()
        };

        writeln!(
            stdout,
            "{}\n",
            display::status(&format!(
                "Loading open pull requests for {} {}",
                self.config.repo, scope
            ))
        )?;

        let pull_requests = self.filter_open(self.gh.list_open().await?);

        if pull_requests.is_empty() {
            writeln!(stdout, "No open pull requests found")?;
        }

        for pull_request in &pull_requests {
            write!(stdout, "{}", display::pull_request(pull_request))?;
        }

        self.display_status(stdout).await
    }

    /// Open a pull request in the browser, the current branch's by default.
    pub async fn cmd_open(&self, number: Option<u64>) -> Result<()> {
        let number = match number {
            Some(number) => number,
            None => self.current_request_branch().await?.1,
        };

        let pull_request = self.gh.get_pull_request(number).await?;
        open_url(&pull_request.html_url).await
    }

    /// Pull remote changes from the request's head branch into the local
    /// pull request branch.
    pub async fn cmd_pull(&self, stdout: &mut impl std::io::Write) -> Result<()> {
        let (branch, number) = self.current_request_branch().await?;

        writeln!(
            stdout,
            "{}",
            display::status(&format!("Pulling remote changes into {}", branch))
        )?;

        let pull_request = self.gh.get_pull_request(number).await?;
        let url = pull_request.fetch_url();

        writeln!(
            stdout,
            "{}",
            display::status(&format!(
                "Pulling from {} ({})",
                url, pull_request.head.ref_name
            ))
        )?;

        let dir = self.exec_dir();
        self.git
            .pull(&dir, &url, &pull_request.head.ref_name)
            .await
            .context("Pull failed, resolve conflicts")?;

        writeln!(
            stdout,
            "\n{}\n",
            display::success(&format!("Updating {} from remote completed", branch))
        )?;
        self.display_status(stdout).await
    }

    /// List a user's repositories and how many requests are open on each.
    pub async fn cmd_info(
        &self,
        user: &str,
        detailed: bool,
        stdout: &mut impl std::io::Write,
    ) -> Result<()> {
        writeln!(
            stdout,
            "{}\n",
            display::status(&format!(
                "Loading information on repositories for {}",
                user
            ))
        )?;

        let repos: Vec<_> = self
            .gh
            .list_repos(user)
            .await?
            .into_iter()
            .filter(|repo| repo.open_issues_count > 0)
            .collect();

        // One listing per repository; only needed for the detailed view
        let pull_lists = if detailed {
            join_all(repos.iter().map(|repo| self.gh.list_open_in(&repo.full_name))).await
        } else {
            Vec::new()
        };

        let mut total = 0;
        for (index, repo) in repos.iter().enumerate() {
            writeln!(
                stdout,
                "  {}: {}",
                repo.name,
                repo.open_issues_count.to_string().magenta()
            )?;

            if detailed {
                let pulls = pull_lists[index]
                    .as_ref()
                    .map_err(|e| anyhow::anyhow!("{e}"))?;
                for pull_request in self.filter_open(pulls.clone()) {
                    writeln!(
                        stdout,
                        "    {} by {}",
                        format!("REQ {}", pull_request.number).magenta().bold(),
                        pull_request.author_name().blue()
                    )?;
                }
            }

            total += repo.open_issues_count;
        }

        writeln!(stdout, "-")?;
        writeln!(
            stdout,
            "{}: {}",
            "Total pull requests".green().bold(),
            total.to_string().magenta().bold()
        )?;
        writeln!(stdout)?;
        self.display_status(stdout).await
    }
}

/// Open a URL in the default browser.
pub(crate) async fn open_url(url: &str) -> Result<()> {
    for opener in ["open", "xdg-open"] {
        let result = tokio::process::Command::new(opener)
            .arg(url)
            .output()
            .await;

        if let Ok(output) = result
            && output.status.success()
        {
            return Ok(());
        }
    }

    bail!("Could not open {} in a browser", url)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::app::App;
    use crate::config::Config;
    use crate::ops::fs::MockFsOps;
    use crate::ops::git::MockGitOps;
    use crate::ops::github::MockGithubOps;
    use crate::ops::github::Repo;
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
    async fn show_lists_open_requests_for_the_update_branch() {
        let mut gh = MockGithubOps::new();
        gh.expect_list_open().returning(|| {
            Ok(vec![
                test_pull_request(42, "Fix thing", "feature/ABC-100-fix"),
                test_pull_request(7, "Other fix", "hotfix"),
            ])
        });

        let mut git = MockGitOps::new();
        git.expect_current_branch()
            .returning(|_| Ok("master".to_string()));

        let app = app(Config::default_for_tests(), git, gh);

        let mut stdout = Vec::new();
        app.cmd_show(&mut stdout).await.unwrap();

        let out = String::from_utf8(stdout).unwrap();
        insta::assert_snapshot!(out, @r"
        Loading open pull requests for test/repo on branch 'master'

        REQUEST 42 - Fix thing by Some One (someone)
        	https://github.com/test/repo/pull/42
        REQUEST 7 - Other fix by Some One (someone)
        	https://github.com/test/repo/pull/7
        Current branch: master
        ");
    }

    #[tokio::test]
    async fn show_drops_requests_based_on_other_branches() {
        let mut gh = MockGithubOps::new();
        gh.expect_list_open().returning(|| {
            let mut elsewhere = test_pull_request(8, "Other base", "other");
            elsewhere.base.ref_name = "7.0.x".to_string();
            Ok(vec![test_pull_request(42, "Fix thing", "fix"), elsewhere])
        });

        let mut git = MockGitOps::new();
        git.expect_current_branch()
            .returning(|_| Ok("master".to_string()));

        let app = app(Config::default_for_tests(), git, gh);

        let mut stdout = Vec::new();
        app.cmd_show(&mut stdout).await.unwrap();

        let out = String::from_utf8(stdout).unwrap();
        assert!(out.contains("REQUEST 42"));
        assert!(!out.contains("REQUEST 8"));
    }

    #[tokio::test]
    async fn show_reports_when_nothing_is_open() {
        let mut config = Config::default_for_tests();
        config.filter_by_update_branch = false;

        let mut gh = MockGithubOps::new();
        gh.expect_list_open().returning(|| Ok(vec![]));

        let mut git = MockGitOps::new();
        git.expect_current_branch()
            .returning(|_| Ok("master".to_string()));

        let app = app(config, git, gh);

        let mut stdout = Vec::new();
        app.cmd_show(&mut stdout).await.unwrap();

        let out = String::from_utf8(stdout).unwrap();
        assert!(out.contains("No open pull requests found"));
        assert!(out.contains("across all branches"));
    }

    #[tokio::test]
    async fn pull_fetches_from_the_request_head() {
        let mut gh = MockGithubOps::new();
        gh.expect_get_pull_request()
            .returning(|_| Ok(test_pull_request(42, "Fix", "feature/ABC-100-fix")));

        let mut git = MockGitOps::new();
        git.expect_current_branch()
            .returning(|_| Ok("pull-request-42-ABC-100".to_string()));
        git.expect_pull()
            .withf(|_, url, remote_ref| {
                url == "git://github.com/other/repo.git" && remote_ref == "feature/ABC-100-fix"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let app = app(Config::default_for_tests(), git, gh);

        let mut stdout = Vec::new();
        app.cmd_pull(&mut stdout).await.unwrap();
    }

    #[tokio::test]
    async fn info_totals_open_counts_across_repos() {
        let mut gh = MockGithubOps::new();
        gh.expect_list_repos()
            .withf(|user| user == "dev")
            .returning(|_| {
                Ok(vec![
                    Repo {
                        name: "liferay".to_string(),
                        full_name: "dev/liferay".to_string(),
                        open_issues_count: 3,
                    },
                    Repo {
                        name: "quiet".to_string(),
                        full_name: "dev/quiet".to_string(),
                        open_issues_count: 0,
                    },
                    Repo {
                        name: "tools".to_string(),
                        full_name: "dev/tools".to_string(),
                        open_issues_count: 2,
                    },
                ])
            });

        let mut git = MockGitOps::new();
        git.expect_current_branch()
            .returning(|_| Ok("master".to_string()));

        let app = app(Config::default_for_tests(), git, gh);

        let mut stdout = Vec::new();
        app.cmd_info("dev", false, &mut stdout).await.unwrap();

        let out = String::from_utf8(stdout).unwrap();
        assert!(out.contains("liferay: 3"));
        assert!(!out.contains("quiet"));
        assert!(out.contains("Total pull requests: 5"));
    }
}
