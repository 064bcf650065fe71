//! Client for the GitHub repository-listing endpoint.
//!
//! Unauthenticated and read-only; requests here bypass the offline cache
//! worker entirely (`api.github.com` is on the bypass list).

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use tracing::debug;

use crate::models::{Project, Repo};

use super::ApiError;

const API_BASE_URL: &str = "https://api.github.com";

/// GitHub rejects requests without a User-Agent.
const USER_AGENT: &str = concat!("sitecache/", env!("CARGO_PKG_VERSION"));

const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Repositories fetched per listing request.
const PER_PAGE: u32 = 30;

/// GitHub API client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct GithubClient {
    client: Client,
}

impl GithubClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Fetch a user's public repositories, most recently updated first.
    pub async fn list_repos(&self, username: &str) -> Result<Vec<Repo>> {
        let url = format!(
            "{}/users/{}/repos?sort=updated&per_page={}&type=public",
            API_BASE_URL, username, PER_PAGE
        );

        let response = self
            .client
            .get(&url)
            .header(header::ACCEPT, ACCEPT_HEADER)
            .send()
            .await
            .with_context(|| format!("Failed to list repositories for {}", username))?;

        let response = Self::check_response(response).await?;
        let repos: Vec<Repo> = response
            .json()
            .await
            .context("Failed to parse repository list")?;

        debug!(username, count = repos.len(), "Fetched repository list");
        Ok(repos)
    }

    /// Fetch a user's repositories as display-ready projects: forks and the
    /// profile repo (named after the user) are dropped.
    pub async fn list_projects(&self, username: &str) -> Result<Vec<Project>> {
        let repos = self.list_repos(username).await?;
        Ok(repos
            .into_iter()
            .filter(|r| !r.fork && r.name != username)
            .map(Project::from_repo)
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fork_and_profile_repo_filtering() {
        let repos: Vec<Repo> = serde_json::from_str(
            r#"[
                {"name": "site", "description": "d", "html_url": "u", "homepage": null,
                 "language": "HTML", "stargazers_count": 1, "fork": false},
                {"name": "forked-lib", "description": null, "html_url": "u", "homepage": null,
                 "language": "Rust", "stargazers_count": 9, "fork": true},
                {"name": "octocat", "description": null, "html_url": "u", "homepage": null,
                 "language": null, "stargazers_count": 0, "fork": false}
            ]"#,
        )
        .unwrap();

        let projects: Vec<Project> = repos
            .into_iter()
            .filter(|r| !r.fork && r.name != "octocat")
            .map(Project::from_repo)
            .collect();

        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].name, "site");
    }
}
