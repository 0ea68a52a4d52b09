//! Named personal access tokens and the contributions of their users.

use std::sync::Arc;

use crate::config::GitHubSettings;
use crate::db::{token_contributions, DbPool};
use crate::error::AppError;
use crate::models::{ContributionSummary, TokenContribution};
use crate::services::credentials::CredentialStore;
use crate::services::github_client::{GitHubClient, GitHubClientConfig};

pub struct ContributionService {
    pool: DbPool,
    credentials: Arc<dyn CredentialStore>,
    settings: GitHubSettings,
}

impl ContributionService {
    pub fn new(pool: DbPool, credentials: Arc<dyn CredentialStore>, settings: GitHubSettings) -> Self {
        Self {
            pool,
            credentials,
            settings,
        }
    }

    /// Store a token under a unique display name.
    pub async fn add(&self, name: &str, token: &str) -> Result<TokenContribution, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::invalid_input_field("Name is required", "name"));
        }
        if token.trim().is_empty() {
            return Err(AppError::invalid_input_field("Token is required", "token"));
        }

        let encrypted = self.credentials.encrypt(token.trim())?;
        let stored = token_contributions::insert_token(&self.pool, name, &encrypted).await?;
        log::info!("[contributions] Added token '{}'", stored.name);
        Ok(stored)
    }

    pub async fn list(&self) -> Result<Vec<TokenContribution>, AppError> {
        token_contributions::list_tokens(&self.pool).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !token_contributions::delete_token(&self.pool, id).await? {
            return Err(AppError::not_found_with_id("Token", id.to_string()));
        }
        Ok(())
    }

    /// Contribution totals of the user a stored token belongs to.
    pub async fn fetch_contributions(&self, id: i64) -> Result<ContributionSummary, AppError> {
        let stored = token_contributions::get_token(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("Token", id.to_string()))?;
        let token = self.credentials.decrypt(&stored.encrypted_token)?;

        let client = GitHubClient::new(GitHubClientConfig {
            api_url: self.settings.api_url.clone(),
            graphql_url: self.settings.graphql_url.clone(),
            token,
            timeout_secs: self.settings.timeout_secs,
            user_agent: self.settings.user_agent.clone(),
        })?;

        let summary = client.viewer_contributions().await?;
        log::debug!(
            "[contributions] '{}' ({}): {} contributions",
            stored.name,
            summary.login,
            summary.total()
        );
        Ok(summary)
    }
}
