use std::sync::LazyLock;

use anyhow::Result;
use anyhow::bail;
use regex::Regex;

use crate::ops::github::PullRequest;

// -----------------------------------------------------------------------------
// Branch name grammar
//
// {prefix}-{number}[-{ISSUEKEY}][-sup]
//
// ISSUEKEY is the first `[A-Z]{3,}-\d+` token found in the pull request's head
// ref. `-sup` marks requests whose title carries the technical-support tag.
// The request number is always recoverable by `request_id`.

/// Title marker that maps to the `-sup` branch suffix.
pub const SUPPORT_MARKER: &str = "[TECHNICAL SUPPORT]";

static ISSUE_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]{3,}-\d+").unwrap());

/// Local branch name that a pull request should be fetched into.
pub fn branch_name(prefix: &str, pull_request: &PullRequest) -> String {
    let mut name = format!("{}-{}", prefix, pull_request.number);

    if let Some(key) = ISSUE_KEY.find(&pull_request.head.ref_name) {
        name = format!("{}-{}", name, key.as_str());
    }

    if pull_request.title.contains(SUPPORT_MARKER) {
        name = format!("{}-sup", name);
    }

    name
}

/// Pull request number encoded in a local branch name.
///
/// Accepts both the configured prefix and the stock `pull-request` prefix so
/// branches fetched under an older configuration stay recognizable.
pub fn request_id(prefix: &str, branch: &str) -> Result<u64> {
    let pattern = format!("^(?:pull-request|{})-(\\d+)", regex::escape(prefix));
    let re = Regex::new(&pattern)?;

    let Some(captures) = re.captures(branch) else {
        bail!("Invalid branch: {} is not a pull request branch", branch);
    };

    Ok(captures[1].parse()?)
}

/// Title to use when submitting a pull request for a branch.
///
/// An explicit title wins. Otherwise the issue key embedded in the branch name
/// is used (falling back to the branch name itself), and the support marker is
/// restored for `-sup` branches. Tags are appended in order, each wrapped in
/// the configured delimiters.
pub fn title(
    branch: &str,
    explicit: Option<&str>,
    tags: &[String],
    tag_prefix: &str,
    tag_suffix: &str,
) -> String {
    let mut title = match explicit {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => {
            let mut derived = match ISSUE_KEY.find(branch) {
                Some(key) => key.as_str().to_string(),
                None => branch.to_string(),
            };

            if branch.ends_with("-sup") {
                derived = format!("{} {}", derived, SUPPORT_MARKER);
            }

            derived
        }
    };

    for tag in tags {
        title = format!("{} {}{}{}", title, tag_prefix, tag, tag_suffix);
    }

    title
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::github::test_pull_request;

    #[test]
    fn branch_name_embeds_issue_key_after_number() {
        let pr = test_pull_request(42, "Fix thing", "feature/ABC-100-fix");
        assert_eq!(branch_name("pull-request", &pr), "pull-request-42-ABC-100");
    }

    #[test]
    fn branch_name_appends_sup_for_support_title() {
        let pr = test_pull_request(7, "[TECHNICAL SUPPORT] urgent", "hotfix");
        assert_eq!(branch_name("pull-request", &pr), "pull-request-7-sup");
    }

    #[test]
    fn branch_name_combines_issue_key_and_sup() {
        let pr = test_pull_request(9, "[TECHNICAL SUPPORT] fix", "LPS-1234-fix");
        assert_eq!(branch_name("pr", &pr), "pr-9-LPS-1234-sup");
    }

    #[test]
    fn branch_name_ignores_short_issue_keys() {
        // Two uppercase letters are not an issue key
        let pr = test_pull_request(3, "Fix", "AB-12-fix");
        assert_eq!(branch_name("pull-request", &pr), "pull-request-3");
    }

    #[test]
    fn request_id_roundtrips_branch_name() {
        for number in [1, 42, 7, 10_001] {
            let pr = test_pull_request(number, "Fix thing", "feature/ABC-100-fix");
            let branch = branch_name("pull-request", &pr);
            assert_eq!(request_id("pull-request", &branch).unwrap(), number);
        }
    }

    #[test]
    fn request_id_accepts_configured_prefix() {
        assert_eq!(request_id("review", "review-15-LPS-1").unwrap(), 15);
    }

    #[test]
    fn request_id_accepts_stock_prefix_under_custom_config() {
        assert_eq!(request_id("review", "pull-request-15").unwrap(), 15);
    }

    #[test]
    fn request_id_rejects_other_branches() {
        for branch in ["master", "feature/ABC-100", "pull-request", "pr-x-1"] {
            let err = request_id("pr", branch).unwrap_err();
            assert!(err.to_string().contains("not a pull request"), "{}", err);
        }
    }

    #[test]
    fn title_prefers_explicit() {
        let out = title("pull-request-42-ABC-100", Some("My title"), &[], "[", "]");
        assert_eq!(out, "My title");
    }

    #[test]
    fn title_derives_from_issue_key() {
        let out = title("pull-request-42-ABC-100", None, &[], "[", "]");
        assert_eq!(out, "ABC-100");
    }

    #[test]
    fn title_falls_back_to_branch_name() {
        let out = title("pull-request-42", None, &[], "[", "]");
        assert_eq!(out, "pull-request-42");
    }

    #[test]
    fn title_restores_support_marker() {
        let out = title("pull-request-7-sup", None, &[], "[", "]");
        assert_eq!(out, "pull-request-7-sup [TECHNICAL SUPPORT]");
    }

    #[test]
    fn title_appends_tags_in_order() {
        let tags = vec!["6.2.x".to_string(), "needs-review".to_string()];
        let out = title("pull-request-42-ABC-100", None, &tags, "[", "]");
        assert_eq!(out, "ABC-100 [6.2.x] [needs-review]");
    }
}
