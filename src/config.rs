use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use regex::Regex;

/// Method used to bring the update branch's changes into a request branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMethod {
    Merge,
    Rebase,
}

/// Immutable configuration snapshot.
///
/// Built once before any lifecycle transition runs, from `git config -l`
/// plus command-line overrides. Keys are read from the `git-pull-request`
/// section; a key prefixed with the repository's top-level path overrides
/// the global value for that repository only.
#[derive(Debug, Clone)]
pub struct Config {
    /// Full repository name (owner/repo) on the hosting service
    pub repo: String,
    pub user: Option<String>,
    pub reviewer: Option<String>,

    pub local_branch_prefix: String,
    pub update_branch: String,
    pub update_method: UpdateMethod,
    pub work_dir: Option<PathBuf>,
    pub fetch_auto_checkout: bool,
    pub fetch_auto_update: bool,
    pub merge_auto_close: bool,
    pub filter_by_update_branch: bool,
    pub close_default_comment: Option<String>,
    pub title_tag_prefix: String,
    pub title_tag_suffix: String,
    pub submit_open_github: bool,
}

impl Config {
    /// Load config from git, resolving per-repository overrides against the
    /// checkout's top-level path.
    pub fn load() -> Result<Self> {
        let all_config = git_config_output(&["config", "-l"])?;
        let top_level = git_config_output(&["rev-parse", "--show-toplevel"])?;

        let repo = match git_config_value("github.repo")? {
            Some(repo) => repo,
            None => {
                let origin = git_config_value("remote.origin.url")?
                    .context("No git remote 'origin' configured")?;
                repo_name_from_url(&origin)
                    .with_context(|| format!("Remote URL is not a GitHub URL: {}", origin))?
            }
        };

        let user = git_config_value("github.user")?;
        let reviewer = git_config_value("github.reviewer")?;

        Self::from_git_config(&all_config, &top_level, repo, user, reviewer)
    }

    /// Build a snapshot from raw `git config -l` output.
    fn from_git_config(
        all_config: &str,
        top_level: &str,
        repo: String,
        user: Option<String>,
        reviewer: Option<String>,
    ) -> Result<Self> {
        let values = section_values(all_config, top_level);

        let string = |key: &str, default: &str| -> String {
            match values.get(key) {
                Some(Some(value)) => value.clone(),
                _ => default.to_string(),
            }
        };
        let optional = |key: &str| -> Option<String> { values.get(key).cloned().flatten() };
        let boolean = |key: &str, default: bool| -> Result<bool> {
            match values.get(key) {
                Some(Some(value)) => parse_bool(value)
                    .with_context(|| format!("Invalid boolean for git-pull-request.{}", key)),
                _ => Ok(default),
            }
        };

        let update_method = match string("update-method", "merge").as_str() {
            "merge" => UpdateMethod::Merge,
            "rebase" => UpdateMethod::Rebase,
            other => bail!("Invalid update-method '{}': expected merge or rebase", other),
        };

        Ok(Self {
            repo,
            user,
            reviewer,
            local_branch_prefix: string("local-branch-prefix", "pull-request"),
            update_branch: string("update-branch", "master"),
            update_method,
            work_dir: optional("work-dir").map(PathBuf::from),
            fetch_auto_checkout: boolean("fetch-auto-checkout", false)?,
            fetch_auto_update: boolean("fetch-auto-update", false)?,
            merge_auto_close: boolean("merge-auto-close", true)?,
            filter_by_update_branch: boolean("filter-by-update-branch", true)?,
            close_default_comment: optional("close-default-comment"),
            title_tag_prefix: string("title-tag-prefix", "["),
            title_tag_suffix: string("title-tag-suffix", "]"),
            submit_open_github: boolean("submit-open-github", true)?,
        })
    }

    /// Default config for tests
    #[cfg(test)]
    pub fn default_for_tests() -> Self {
        Self {
            repo: "test/repo".to_string(),
            user: Some("dev".to_string()),
            reviewer: None,
            local_branch_prefix: "pull-request".to_string(),
            update_branch: "master".to_string(),
            update_method: UpdateMethod::Merge,
            work_dir: None,
            fetch_auto_checkout: false,
            fetch_auto_update: false,
            merge_auto_close: true,
            filter_by_update_branch: true,
            close_default_comment: None,
            title_tag_prefix: "[".to_string(),
            title_tag_suffix: "]".to_string(),
            submit_open_github: true,
        }
    }
}

/// Collect `git-pull-request.*` keys, per-repository overrides winning.
///
/// `None` values mean the key was explicitly unset (`none`/`null`/empty).
fn section_values(all_config: &str, top_level: &str) -> HashMap<String, Option<String>> {
    let re = Regex::new(r"(?m)^git-pull-request\.([^=]+)=([^\n]*)$").unwrap();
    let path_prefix = format!("{}.", top_level);

    let mut globals = HashMap::new();
    let mut overrides = HashMap::new();

    for captures in re.captures_iter(all_config) {
        let key = captures[1].to_string();
        let value = normalize_value(&captures[2]);

        match key.strip_prefix(&path_prefix) {
            Some(local_key) => overrides.insert(local_key.to_string(), value),
            None => globals.insert(key, value),
        };
    }

    globals.extend(overrides);
    globals
}

fn normalize_value(raw: &str) -> Option<String> {
    match raw.to_lowercase().as_str() {
        "" | "none" | "null" | "nil" => None,
        _ => Some(raw.to_string()),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "t" | "true" | "yes" => Some(true),
        "f" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Full repository name (owner/repo) parsed from a git remote URL.
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let re = Regex::new(r"github\.com[:/](.+?)(?:\.git)?/?$").unwrap();
    re.captures(url.trim())
        .map(|captures| captures[1].to_string())
}

/// Repository name for a configured remote, e.g. `-r upstream`.
pub fn repo_name_for_remote(remote: &str) -> Result<String> {
    let url = git_config_value(&format!("remote.{}.url", remote))?
        .with_context(|| format!("No git remote '{}' configured", remote))?;
    repo_name_from_url(&url).with_context(|| format!("Remote URL is not a GitHub URL: {}", url))
}

/// Authentication token for the hosting API.
pub fn github_token() -> Result<String> {
    git_config_value("github.token")?.context(
        "No github.token configured. Create a token and run 'git config --global github.token <token>'.",
    )
}

fn git_config_value(key: &str) -> Result<Option<String>> {
    let output = std::process::Command::new("git")
        .args(["config", "--get", key])
        .output()
        .context("Failed to execute git command")?;

    if !output.status.success() {
        return Ok(None);
    }

    let value = String::from_utf8(output.stdout)?.trim().to_string();
    Ok((!value.is_empty()).then_some(value))
}

fn git_config_output(args: &[&str]) -> Result<String> {
    let output = std::process::Command::new("git")
        .args(args)
        .output()
        .context("Failed to execute git command")?;

    if !output.status.success() {
        bail!(
            "git command failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    Ok(String::from_utf8(output.stdout)?.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(all_config: &str, top_level: &str) -> Config {
        Config::from_git_config(
            all_config,
            top_level,
            "test/repo".to_string(),
            Some("dev".to_string()),
            None,
        )
        .unwrap()
    }

    #[test]
    fn defaults_apply_when_section_is_empty() {
        let config = config_from("user.name=Dev\n", "/home/dev/project");

        assert_eq!(config.local_branch_prefix, "pull-request");
        assert_eq!(config.update_branch, "master");
        assert_eq!(config.update_method, UpdateMethod::Merge);
        assert_eq!(config.work_dir, None);
        assert!(!config.fetch_auto_checkout);
        assert!(config.merge_auto_close);
        assert!(config.filter_by_update_branch);
    }

    #[test]
    fn section_keys_override_defaults() {
        let config = config_from(
            "git-pull-request.update-branch=main\n\
             git-pull-request.update-method=rebase\n\
             git-pull-request.local-branch-prefix=review\n\
             git-pull-request.work-dir=/tmp/work\n\
             git-pull-request.merge-auto-close=no\n",
            "/home/dev/project",
        );

        assert_eq!(config.update_branch, "main");
        assert_eq!(config.update_method, UpdateMethod::Rebase);
        assert_eq!(config.local_branch_prefix, "review");
        assert_eq!(config.work_dir, Some(PathBuf::from("/tmp/work")));
        assert!(!config.merge_auto_close);
    }

    #[test]
    fn per_repository_overrides_win() {
        let config = config_from(
            "git-pull-request.update-branch=master\n\
             git-pull-request./home/dev/project.update-branch=7.0.x\n\
             git-pull-request./home/dev/other.update-branch=6.2.x\n",
            "/home/dev/project",
        );

        assert_eq!(config.update_branch, "7.0.x");
    }

    #[test]
    fn explicit_none_unsets_a_value() {
        let config = config_from(
            "git-pull-request.close-default-comment=thanks\n\
             git-pull-request./home/dev/project.close-default-comment=none\n",
            "/home/dev/project",
        );

        assert_eq!(config.close_default_comment, None);
    }

    #[test]
    fn boolean_spellings() {
        for (raw, expected) in [("t", true), ("yes", true), ("f", false), ("no", false)] {
            let config = config_from(
                &format!("git-pull-request.fetch-auto-checkout={}\n", raw),
                "/home/dev/project",
            );
            assert_eq!(config.fetch_auto_checkout, expected, "{}", raw);
        }
    }

    #[test]
    fn invalid_update_method_is_rejected() {
        let result = Config::from_git_config(
            "git-pull-request.update-method=cherry-pick\n",
            "/home/dev/project",
            "test/repo".to_string(),
            None,
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn repo_name_parses_common_remote_forms() {
        for url in [
            "git@github.com:owner/repo.git",
            "https://github.com/owner/repo.git",
            "https://github.com/owner/repo",
            "git://github.com/owner/repo.git",
        ] {
            assert_eq!(repo_name_from_url(url).as_deref(), Some("owner/repo"), "{}", url);
        }
    }

    #[test]
    fn repo_name_rejects_non_github_urls() {
        assert_eq!(repo_name_from_url("https://gitlab.com/owner/repo.git"), None);
    }
}
