//! Remote data source seam.
//!
//! `RemoteDataSource` is what the sync engine and the registry call to reach
//! GitHub. `GitHubRemote` implements it over `GitHubClient`; tests substitute
//! an in-memory fake.

use async_trait::async_trait;

use crate::config::{GitHubSettings, SyncConfig};
use crate::error::AppError;
use crate::models::{Approval, PageRequest, PullRequestDetail};
use crate::services::github_client::{GitHubClient, GitHubClientConfig, PullRequestsQuery};

/// Everything needed to address one page of a repository's pull requests.
#[derive(Debug, Clone)]
pub struct RepositoryRequest {
    pub repository_id: i64,
    pub owner: String,
    pub name: String,

    /// Decrypted personal access token.
    pub token: String,

    pub page: u32,
    pub per_page: u32,
    pub state: String,
    pub base: Option<String>,
    pub sort: String,
    pub direction: String,
}

impl RepositoryRequest {
    /// Build a request for a page using the sync settings' filters.
    pub fn new(
        repository_id: i64,
        owner: impl Into<String>,
        name: impl Into<String>,
        token: impl Into<String>,
        page: PageRequest,
        config: &SyncConfig,
    ) -> Self {
        Self {
            repository_id,
            owner: owner.into(),
            name: name.into(),
            token: token.into(),
            page: page.page,
            per_page: page.per_page,
            state: config.state.clone(),
            base: config.base_branch.clone(),
            sort: config.sort.clone(),
            direction: config.direction.clone(),
        }
    }

    /// The same request for another page.
    pub fn with_page(&self, page: PageRequest) -> Self {
        Self {
            page: page.page,
            per_page: page.per_page,
            ..self.clone()
        }
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A pull request as listed by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePullRequest {
    pub number: i64,
    pub title: String,
    pub author: String,
    pub avatar_url: Option<String>,
}

#[async_trait]
pub trait RemoteDataSource: Send + Sync {
    /// One page of pull requests. A page with no items is `AppError::Empty`.
    async fn get_pull_requests(
        &self,
        request: &RepositoryRequest,
    ) -> Result<Vec<RemotePullRequest>, AppError>;

    /// Approving reviews of a pull request.
    async fn get_approvals(
        &self,
        request: &RepositoryRequest,
        pull_request_id: i64,
    ) -> Result<Vec<Approval>, AppError>;

    async fn get_review_comment_count(
        &self,
        request: &RepositoryRequest,
        pull_request_id: i64,
    ) -> Result<PullRequestDetail, AppError>;

    /// Logins of the repository's contributors.
    async fn get_code_owners(&self, request: &RepositoryRequest) -> Result<Vec<String>, AppError>;
}

/// `RemoteDataSource` over the GitHub REST and GraphQL APIs.
#[derive(Debug, Clone)]
pub struct GitHubRemote {
    settings: GitHubSettings,
}

impl GitHubRemote {
    pub fn new(settings: GitHubSettings) -> Self {
        Self { settings }
    }

    /// Build a client authenticated with the given token.
    pub fn client(&self, token: &str) -> Result<GitHubClient, AppError> {
        GitHubClient::new(GitHubClientConfig {
            api_url: self.settings.api_url.clone(),
            graphql_url: self.settings.graphql_url.clone(),
            token: token.to_string(),
            timeout_secs: self.settings.timeout_secs,
            user_agent: self.settings.user_agent.clone(),
        })
    }
}

#[async_trait]
impl RemoteDataSource for GitHubRemote {
    async fn get_pull_requests(
        &self,
        request: &RepositoryRequest,
    ) -> Result<Vec<RemotePullRequest>, AppError> {
        let client = self.client(&request.token)?;
        let query = PullRequestsQuery {
            state: Some(request.state.clone()),
            base: request.base.clone(),
            sort: Some(request.sort.clone()),
            direction: Some(request.direction.clone()),
            page: Some(request.page),
            per_page: Some(request.per_page),
        };

        let response = client
            .list_pull_requests(&request.owner, &request.name, &query)
            .await
            .map_err(|e| e.for_repository(request.repository_id))?;

        if response.data.is_empty() {
            return Err(AppError::empty(format!(
                "pull requests for {} (page {})",
                request.full_name(),
                request.page
            )));
        }

        log::debug!(
            "[github] {} page {}: {} pull requests",
            request.full_name(),
            request.page,
            response.data.len()
        );

        Ok(response
            .data
            .into_iter()
            .map(|pr| {
                let (author, avatar_url) = match pr.user {
                    Some(user) => (user.login, user.avatar_url),
                    None => ("ghost".to_string(), None),
                };
                RemotePullRequest {
                    number: pr.number,
                    title: pr.title,
                    author,
                    avatar_url,
                }
            })
            .collect())
    }

    async fn get_approvals(
        &self,
        request: &RepositoryRequest,
        pull_request_id: i64,
    ) -> Result<Vec<Approval>, AppError> {
        let client = self.client(&request.token)?;
        let reviews = client
            .list_reviews(&request.owner, &request.name, pull_request_id)
            .await
            .map_err(|e| e.for_repository(request.repository_id))?;

        Ok(reviews
            .into_iter()
            .filter(|review| review.is_approval())
            .filter_map(|review| {
                let user = review.user?;
                Some(Approval {
                    repository_id: request.repository_id,
                    pull_request_id,
                    reviewer: user.login,
                    avatar_url: user.avatar_url,
                    submitted_at: review.submitted_at,
                })
            })
            .collect())
    }

    async fn get_review_comment_count(
        &self,
        request: &RepositoryRequest,
        pull_request_id: i64,
    ) -> Result<PullRequestDetail, AppError> {
        let client = self.client(&request.token)?;
        let detail = client
            .get_pull_request(&request.owner, &request.name, pull_request_id)
            .await
            .map_err(|e| e.for_repository(request.repository_id))?;

        Ok(PullRequestDetail {
            merged: detail.merged,
            review_comments: detail.review_comments,
        })
    }

    async fn get_code_owners(&self, request: &RepositoryRequest) -> Result<Vec<String>, AppError> {
        let client = self.client(&request.token)?;
        let contributors = client
            .list_contributors(&request.owner, &request.name)
            .await
            .map_err(|e| e.for_repository(request.repository_id))?;

        Ok(contributors.into_iter().map(|c| c.login).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_uses_sync_filters() {
        let config = SyncConfig {
            base_branch: Some("main".to_string()),
            ..Default::default()
        };
        let request = RepositoryRequest::new(3, "octo", "widgets", "t", PageRequest::first(25), &config);

        assert_eq!(request.state, "closed");
        assert_eq!(request.base.as_deref(), Some("main"));
        assert_eq!(request.page, 1);

        let next = request.with_page(PageRequest::new(4, 50));
        assert_eq!(next.page, 4);
        assert_eq!(next.per_page, 50);
        assert_eq!(next.full_name(), "octo/widgets");
    }
}
