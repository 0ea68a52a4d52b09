//! GitHub API client.
//!
//! HTTP client for the GitHub REST v3 and GraphQL v4 APIs with bearer token
//! authentication and `Link` header pagination.

use crate::error::AppError;
use crate::models::ContributionSummary;
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// GitHub API client configuration.
#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    /// REST base URL (e.g., `https://api.github.com`).
    pub api_url: String,

    /// GraphQL endpoint.
    pub graphql_url: String,

    /// Personal access token for authentication.
    pub token: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    pub user_agent: String,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            graphql_url: "https://api.github.com/graphql".to_string(),
            token: String::new(),
            timeout_secs: 30,
            user_agent: "pr-pulse".to_string(),
        }
    }
}

/// GitHub API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    client: Client,
    config: GitHubClientConfig,
}

/// Paginated response from the GitHub API.
#[derive(Debug)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,

    /// Next page number from the `Link` header, if any.
    pub next_page: Option<u32>,
}

/// Query parameters for listing pull requests.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PullRequestsQuery {
    /// Filter by state: `open`, `closed`, `all`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// Filter by base branch name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,

    /// `created`, `updated`, `popularity`, `long-running`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    /// `asc` or `desc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    /// Number of items per page (max 100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

/// GitHub user from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub avatar_url: Option<String>,
}

/// Pull request as returned by the list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPullRequest {
    pub number: i64,
    pub title: String,
    /// `null` for pull requests of deleted accounts.
    pub user: Option<GitHubUser>,
    pub state: String,
    pub created_at: Option<String>,
    pub merged_at: Option<String>,
}

/// The subset of a single pull request we read.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubPullRequestDetail {
    pub number: i64,
    #[serde(default)]
    pub merged: bool,
    #[serde(default)]
    pub review_comments: i64,
}

/// Pull request review from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubReview {
    pub id: i64,
    pub user: Option<GitHubUser>,
    /// `APPROVED`, `CHANGES_REQUESTED`, `COMMENTED`, `DISMISSED`, `PENDING`.
    pub state: String,
    pub submitted_at: Option<String>,
}

impl GitHubReview {
    pub fn is_approval(&self) -> bool {
        self.state.eq_ignore_ascii_case("APPROVED")
    }
}

/// Repository contributor from API.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubContributor {
    pub login: String,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub contributions: i64,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

const CONTRIBUTIONS_QUERY: &str = r#"
query ViewerContributions {
  viewer {
    login
    contributionsCollection {
      totalCommitContributions
      totalPullRequestContributions
      totalPullRequestReviewContributions
      totalIssueContributions
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct ViewerData {
    viewer: Viewer,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Viewer {
    login: String,
    contributions_collection: ContributionsCollection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContributionsCollection {
    total_commit_contributions: i64,
    total_pull_request_contributions: i64,
    total_pull_request_review_contributions: i64,
    total_issue_contributions: i64,
}

impl GitHubClient {
    /// Create a new GitHub client.
    pub fn new(config: GitHubClientConfig) -> Result<Self, AppError> {
        let mut headers = header::HeaderMap::new();

        let token_value = header::HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| AppError::unauthorized("Invalid token format"))?;
        headers.insert(header::AUTHORIZATION, token_value);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build a full REST URL from an endpoint path.
    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_url.trim_end_matches('/'), path)
    }

    /// `/repos/{owner}/{repo}` with both segments percent-encoded.
    fn repo_path(owner: &str, repo: &str) -> String {
        format!(
            "/repos/{}/{}",
            urlencoding::encode(owner),
            urlencoding::encode(repo)
        )
    }

    /// Map a non-success status to the application error taxonomy.
    async fn error_for_status(response: Response, endpoint: &str) -> AppError {
        let status = response.status();
        let status_code = status.as_u16();
        let rate_limited = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0");
        let body = response.text().await.unwrap_or_default();
        let body_message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string));

        if status == StatusCode::UNAUTHORIZED {
            return AppError::unauthorized(
                body_message.unwrap_or_else(|| "GitHub token expired or revoked".to_string()),
            );
        }
        if status.is_server_error() {
            return AppError::server(
                body_message.unwrap_or_else(|| format!("Request to {} failed", endpoint)),
                status_code,
            );
        }

        let message = match (status, &body_message) {
            (StatusCode::FORBIDDEN, _) if rate_limited => "Rate limit exceeded".to_string(),
            (StatusCode::TOO_MANY_REQUESTS, _) => "Rate limit exceeded".to_string(),
            (StatusCode::NOT_FOUND, _) => "Resource not found".to_string(),
            (_, Some(msg)) => msg.clone(),
            _ => format!("Request failed ({}): {}", status_code, body),
        };

        AppError::github_api_full(message, status_code, endpoint)
    }

    /// Decode a successful response or map the failure.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
        endpoint: &str,
    ) -> Result<T, AppError> {
        if response.status().is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| AppError::internal(format!("Failed to parse response: {}", e)))
        } else {
            Err(Self::error_for_status(response, endpoint).await)
        }
    }

    /// Make a GET request with pagination support.
    async fn get_paginated<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: Option<&impl Serialize>,
    ) -> Result<PaginatedResponse<T>, AppError> {
        let url = self.api_url(endpoint);

        let mut request = self.client.get(&url);
        if let Some(q) = query {
            request = request.query(q);
        }

        let response = request.send().await?;

        // e.g. contributors of a repository without commits
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(PaginatedResponse {
                data: Vec::new(),
                next_page: None,
            });
        }

        let next_page = response
            .headers()
            .get(header::LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_page);
        let data = self.handle_response::<Vec<T>>(response, endpoint).await?;

        Ok(PaginatedResponse { data, next_page })
    }

    /// Fetch all pages of a paginated endpoint, 100 items at a time.
    pub async fn get_all_pages<T: DeserializeOwned>(&self, endpoint: &str) -> Result<Vec<T>, AppError> {
        let mut all_data = Vec::new();
        let mut page = 1u32;

        loop {
            let params = [("page", page), ("per_page", 100)];
            let response = self.get_paginated::<T>(endpoint, Some(&params)).await?;
            all_data.extend(response.data);

            match response.next_page {
                Some(next) if next > page => page = next,
                _ => break,
            }
        }

        Ok(all_data)
    }

    /// List one page of pull requests of a repository.
    pub async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        query: &PullRequestsQuery,
    ) -> Result<PaginatedResponse<GitHubPullRequest>, AppError> {
        let endpoint = format!("{}/pulls", Self::repo_path(owner, repo));
        self.get_paginated(&endpoint, Some(query)).await
    }

    /// Get a single pull request (merge state, review comment count).
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
    ) -> Result<GitHubPullRequestDetail, AppError> {
        let endpoint = format!("{}/pulls/{}", Self::repo_path(owner, repo), number);
        let response = self.client.get(self.api_url(&endpoint)).send().await?;
        self.handle_response(response, &endpoint).await
    }

    /// All reviews of a pull request.
    pub async fn list_reviews(
        &self,
        owner: &str,
        repo: &str,
        number: i64,
    ) -> Result<Vec<GitHubReview>, AppError> {
        let endpoint = format!("{}/pulls/{}/reviews", Self::repo_path(owner, repo), number);
        self.get_all_pages(&endpoint).await
    }

    /// First page (up to 100) of repository contributors, most active first.
    pub async fn list_contributors(
        &self,
        owner: &str,
        repo: &str,
    ) -> Result<Vec<GitHubContributor>, AppError> {
        let endpoint = format!("{}/contributors", Self::repo_path(owner, repo));
        let params = [("per_page", 100)];
        let response = self
            .get_paginated::<GitHubContributor>(&endpoint, Some(&params))
            .await?;
        Ok(response.data)
    }

    /// Run a GraphQL query and decode its `data` member.
    pub async fn graphql<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, AppError> {
        let endpoint = self.config.graphql_url.clone();
        let response = self
            .client
            .post(&endpoint)
            .json(&serde_json::json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let body: GraphQlResponse<T> = self.handle_response(response, &endpoint).await?;
        if let Some(error) = body.errors.first() {
            return Err(AppError::github_api(format!(
                "GraphQL error: {}",
                error.message
            )));
        }
        body.data
            .ok_or_else(|| AppError::empty("GraphQL response without data"))
    }

    /// Last-year contribution totals of the token's user.
    pub async fn viewer_contributions(&self) -> Result<ContributionSummary, AppError> {
        let data: ViewerData = self
            .graphql(CONTRIBUTIONS_QUERY, serde_json::json!({}))
            .await?;
        let totals = data.viewer.contributions_collection;

        Ok(ContributionSummary {
            login: data.viewer.login,
            commits: totals.total_commit_contributions,
            pull_requests: totals.total_pull_request_contributions,
            pull_request_reviews: totals.total_pull_request_review_contributions,
            issues: totals.total_issue_contributions,
        })
    }
}

/// Extract the `page` parameter of the `rel="next"` link.
///
/// e.g. `<https://api.github.com/repos/o/r/pulls?page=3>; rel="next"` -> 3
pub fn parse_next_page(link_header: &str) -> Option<u32> {
    link_header
        .split(',')
        .find(|part| part.contains("rel=\"next\""))
        .and_then(|part| {
            let start = part.find('<')? + 1;
            let end = part.find('>')?;
            let url = part.get(start..end)?;
            let query = url.split_once('?')?.1;
            query
                .split('&')
                .filter_map(|pair| pair.split_once('='))
                .find(|(key, _)| *key == "page")
                .and_then(|(_, value)| value.parse().ok())
        })
}
