use colored::Colorize;

use crate::ops::github::PullRequest;

const WRAP_WIDTH: usize = 80;

/// Progress message for an operation in flight.
pub fn status(text: &str) -> String {
    text.blue().to_string()
}

/// Completion message for a finished operation.
pub fn success(text: &str) -> String {
    text.green().to_string()
}

/// One-line pull request summary: number, title, author.
pub fn pull_request_minimal(pull_request: &PullRequest) -> String {
    format!(
        "{} - {} by {} ({})",
        format!("REQUEST {}", pull_request.number).magenta().bold(),
        pull_request.title.red().bold(),
        pull_request.author_name().blue(),
        pull_request.user.login,
    )
}

/// Full pull request display: summary, URL, wrapped body.
pub fn pull_request(pull_request: &PullRequest) -> String {
    let mut out = pull_request_minimal(pull_request);
    out.push('\n');
    out.push_str(&format!("\t{}\n", pull_request.html_url.cyan()));

    if let Some(body) = pull_request.body.as_deref()
        && !body.trim().is_empty()
    {
        out.push_str(&wrap_indented(body, WRAP_WIDTH));
        out.push('\n');
    }

    out
}

/// Fill text to a width, every line indented with a tab.
fn wrap_indented(text: &str, width: usize) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if !line.is_empty() && line.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }

    lines
        .iter()
        .map(|l| format!("\t{}", l))
        .collect::<Vec<_>>()
        .join("\n")
}
