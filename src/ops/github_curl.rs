use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use serde::Deserialize;
use tokio::process::Command;

const JSON_ACCEPT: &str = "application/vnd.github+json";

/// HTTP client using curl for making GitHub API requests
pub struct GithubCurlClient {
    token: String,
}

#[derive(Debug, Deserialize)]
struct GitHubError {
    message: String,
    #[serde(default)]
    #[allow(dead_code)]
    documentation_url: Option<String>,
}

impl GithubCurlClient {
    pub fn new(token: String) -> Self {
        Self { token }
    }

    /// Make a GET request with the given Accept header
    pub async fn get(&self, url: &str, accept: &str) -> Result<String> {
        self.request("GET", url, accept, None).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, url: &str, json_data: &str) -> Result<String> {
        self.request("POST", url, JSON_ACCEPT, Some(json_data)).await
    }

    /// Make a PATCH request with a JSON body
    pub async fn patch(&self, url: &str, json_data: &str) -> Result<String> {
        self.request("PATCH", url, JSON_ACCEPT, Some(json_data)).await
    }

    async fn request(
        &self,
        method: &str,
        url: &str,
        accept: &str,
        json_data: Option<&str>,
    ) -> Result<String> {
        let auth = format!("Authorization: Bearer {}", self.token);
        let accept = format!("Accept: {}", accept);

        // `-w` appends the status code as a trailer line so one curl call
        // yields both the body and the status
        let mut args = vec![
            "-s",
            "-w",
            "\n%{http_code}",
            "-X",
            method,
            "-H",
            &auth,
            "-H",
            &accept,
            "-H",
            "User-Agent: gitpr-cli",
        ];
        if let Some(data) = json_data {
            args.extend(["-H", "Content-Type: application/json", "-d", data]);
        }
        args.push(url);

        let output = Command::new("curl")
            .args(&args)
            .output()
            .await
            .context("Failed to execute curl command")?;

        if !output.status.success() {
            bail!(
                "curl command failed: {}",
                String::from_utf8_lossy(&output.stderr)
            );
        }

        self.parse_response(output.stdout)
    }

    /// Split the response body from the status-code trailer
    fn parse_response(&self, stdout: Vec<u8>) -> Result<String> {
        let output_str = String::from_utf8(stdout)?;
        let (response, status_line) = output_str
            .rsplit_once('\n')
            .unwrap_or(("", output_str.as_str()));
        let status_code = status_line.trim().parse::<u16>().unwrap_or(0);

        if status_code >= 400 {
            // Prefer the structured GitHub error message when present
            if let Ok(error) = serde_json::from_str::<GitHubError>(response) {
                bail!("GitHub API error: {}", error.message);
            }
            bail!(
                "GitHub API request failed with status {}: {}",
                status_code,
                response
            );
        }

        Ok(response.to_string())
    }
}
