#![allow(async_fn_in_trait)]

use anyhow::Context;
use anyhow::Result;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use serde::Serialize;
use tracing::instrument;

use super::github_curl::GithubCurlClient;

// -----------------------------------------------------------------------------
// Types

/// A pull request as returned by the hosting API.
///
/// Immutable snapshot; the lifecycle engine only derives branch names and
/// commit ranges from it.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: Option<String>,
    pub html_url: String,
    pub head: Head,
    pub base: Base,
    pub user: Author,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Head {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub repo: HeadRepo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeadRepo {
    pub clone_url: String,
    pub private: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Base {
    #[serde(rename = "ref")]
    pub ref_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A repository summary, used by the info listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    pub open_issues_count: u64,
}

#[derive(Debug, Serialize)]
struct CreatePullRequest {
    title: String,
    body: String,
    head: String,
    base: String,
}

#[derive(Debug, Serialize)]
struct ClosePullRequest {
    state: String,
}

#[derive(Debug, Serialize)]
struct CreateComment {
    body: String,
}

impl PullRequest {
    /// Git URL to fetch the head branch from.
    ///
    /// Private repositories are only reachable over SSH.
    pub fn fetch_url(&self) -> String {
        let url = self.head.repo.clone_url.replacen("https", "git", 1);

        if self.head.repo.private {
            url.replacen("git://github.com/", "git@github.com:", 1)
        } else {
            url
        }
    }

    pub fn author_name(&self) -> &str {
        self.user.name.as_deref().unwrap_or(&self.user.login)
    }
}

/// Pull request with the fields the engine reads, for tests.
#[cfg(test)]
pub fn test_pull_request(number: u64, title: &str, head_ref: &str) -> PullRequest {
    PullRequest {
        number,
        title: title.to_string(),
        body: None,
        html_url: format!("https://github.com/test/repo/pull/{}", number),
        head: Head {
            ref_name: head_ref.to_string(),
            repo: HeadRepo {
                clone_url: "https://github.com/other/repo.git".to_string(),
                private: false,
            },
        },
        base: Base {
            ref_name: "master".to_string(),
        },
        user: Author {
            login: "someone".to_string(),
            name: Some("Some One".to_string()),
        },
    }
}

// -----------------------------------------------------------------------------
// GithubOps trait

/// Operations against the hosting API.
#[cfg_attr(test, automock)]
pub trait GithubOps {
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest>;

    /// List open pull requests on the repository.
    async fn list_open(&self) -> Result<Vec<PullRequest>>;

    /// Same as `list_open` but against another repository.
    async fn list_open_in(&self, repo: &str) -> Result<Vec<PullRequest>>;

    async fn close(&self, number: u64) -> Result<()>;
    async fn post_comment(&self, number: u64, body: &str) -> Result<()>;

    /// Create a pull request on `repo` and return it.
    async fn create(
        &self,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest>;

    /// List a user's repositories.
    async fn list_repos(&self, user: &str) -> Result<Vec<Repo>>;
}

// -----------------------------------------------------------------------------
// GithubClient

/// Client to interact with the GitHub API.
pub struct GithubClient {
    repo: String,
    http_client: GithubCurlClient,
}

impl GithubClient {
    /// `repo` is the full repository name (owner/repo).
    pub fn new(token: String, repo: String) -> Self {
        Self {
            repo,
            http_client: GithubCurlClient::new(token),
        }
    }
}

impl GithubOps for GithubClient {
    #[instrument(skip_all)]
    async fn get_pull_request(&self, number: u64) -> Result<PullRequest> {
        let url = format!("https://api.github.com/repos/{}/pulls/{}", self.repo, number);

        let response = self
            .http_client
            .get(&url, "application/vnd.github+json")
            .await?;
        serde_json::from_str(&response).context("Failed to parse pull request")
    }

    #[instrument(skip_all)]
    async fn list_open(&self) -> Result<Vec<PullRequest>> {
        let repo = self.repo.clone();
        self.list_open_in(&repo).await
    }

    #[instrument(skip_all)]
    async fn list_open_in(&self, repo: &str) -> Result<Vec<PullRequest>> {
        let url = format!(
            "https://api.github.com/repos/{}/pulls?state=open&per_page=100",
            repo
        );

        let response = self
            .http_client
            .get(&url, "application/vnd.github+json")
            .await?;
        serde_json::from_str(&response).context("Failed to parse pull request list")
    }

    #[instrument(skip_all)]
    async fn close(&self, number: u64) -> Result<()> {
        let url = format!("https://api.github.com/repos/{}/pulls/{}", self.repo, number);

        let request_body = ClosePullRequest {
            state: "closed".to_string(),
        };

        let json_data = serde_json::to_string(&request_body)?;
        self.http_client.patch(&url, &json_data).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn post_comment(&self, number: u64, body: &str) -> Result<()> {
        // Pull request comments live on the issue of the same number
        let url = format!(
            "https://api.github.com/repos/{}/issues/{}/comments",
            self.repo, number
        );

        let request_body = CreateComment {
            body: body.to_string(),
        };

        let json_data = serde_json::to_string(&request_body)?;
        self.http_client.post(&url, &json_data).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn create(
        &self,
        repo: &str,
        head: &str,
        base: &str,
        title: &str,
        body: &str,
    ) -> Result<PullRequest> {
        let url = format!("https://api.github.com/repos/{}/pulls", repo);

        let request_body = CreatePullRequest {
            title: title.to_string(),
            body: body.to_string(),
            head: head.to_string(),
            base: base.to_string(),
        };

        let json_data = serde_json::to_string(&request_body)?;
        let response = self.http_client.post(&url, &json_data).await?;
        serde_json::from_str(&response).context("Failed to parse created pull request")
    }

    #[instrument(skip_all)]
    async fn list_repos(&self, user: &str) -> Result<Vec<Repo>> {
        let url = format!("https://api.github.com/users/{}/repos?per_page=100", user);

        let response = self
            .http_client
            .get(&url, "application/vnd.github+json")
            .await?;
        serde_json::from_str(&response).context("Failed to parse repository list")
    }
}
