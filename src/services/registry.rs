//! Registered repositories.
//!
//! Registration, removal, token rotation, target counts and code owners.
//! Tokens are encrypted before they reach the database.

use std::sync::Arc;

use crate::config::SyncConfig;
use crate::db::{metrics, owners, repositories, DbPool};
use crate::error::AppError;
use crate::models::{NewRepository, PageRequest, Repository};
use crate::services::credentials::CredentialStore;
use crate::services::remote::{RemoteDataSource, RepositoryRequest};
use crate::services::sync_engine::PullRequestSync;

pub struct RepositoryRegistry {
    pool: DbPool,
    credentials: Arc<dyn CredentialStore>,
    remote: Arc<dyn RemoteDataSource>,
    sync: Arc<PullRequestSync>,
    config: SyncConfig,
}

/// Validate an owner or repository name segment.
fn validate_segment(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::invalid_input_field(
            format!("{} is required", field),
            field,
        ));
    }
    if value.contains('/') || value.chars().any(char::is_whitespace) {
        return Err(AppError::invalid_input_field(
            format!("{} must not contain '/' or whitespace", field),
            field,
        ));
    }
    Ok(())
}

fn validate_target_count(count: i64) -> Result<(), AppError> {
    if count < 1 {
        return Err(AppError::invalid_input_field(
            "Target count must be at least 1",
            "target_count",
        ));
    }
    Ok(())
}

impl RepositoryRegistry {
    pub fn new(
        pool: DbPool,
        credentials: Arc<dyn CredentialStore>,
        remote: Arc<dyn RemoteDataSource>,
        sync: Arc<PullRequestSync>,
        config: SyncConfig,
    ) -> Self {
        Self {
            pool,
            credentials,
            remote,
            sync,
            config,
        }
    }

    /// Register a repository with its token, initial code owners and target
    /// count.
    pub async fn register(&self, new: NewRepository) -> Result<Repository, AppError> {
        validate_segment(&new.owner, "owner")?;
        validate_segment(&new.name, "name")?;
        if new.token.trim().is_empty() {
            return Err(AppError::invalid_input_field("Token is required", "token"));
        }
        if let Some(count) = new.target_count {
            validate_target_count(count)?;
        }

        let encrypted = self.credentials.encrypt(new.token.trim())?;
        let repository =
            repositories::insert_repository(&self.pool, new.owner.trim(), new.name.trim(), &encrypted)
                .await?;

        let populate = async {
            if !new.code_owners.is_empty() {
                owners::insert_owners(&self.pool, repository.id, &new.code_owners).await?;
            }
            if let Some(count) = new.target_count {
                metrics::upsert_target_count(&self.pool, repository.id, count).await?;
            }
            Ok::<(), AppError>(())
        };

        if let Err(e) = populate.await {
            log::warn!(
                "[registry] Rolling back {} after failure: {}",
                repository.full_name(),
                e
            );
            repositories::delete_repository(&self.pool, repository.id).await?;
            return Err(e);
        }

        log::info!(
            "[registry] Registered {} (id={})",
            repository.full_name(),
            repository.id
        );
        Ok(repository)
    }

    pub async fn list(&self) -> Result<Vec<Repository>, AppError> {
        repositories::list_repositories(&self.pool).await
    }

    /// Get a repository by id, failing with `NotFound`.
    pub async fn get(&self, id: i64) -> Result<Repository, AppError> {
        repositories::get_repository(&self.pool, id)
            .await?
            .ok_or_else(|| AppError::not_found_with_id("Repository", id.to_string()))
    }

    pub async fn find(&self, owner: &str, name: &str) -> Result<Option<Repository>, AppError> {
        repositories::find_repository(&self.pool, owner, name).await
    }

    /// Delete a repository and everything cached for it.
    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !repositories::delete_repository(&self.pool, id).await? {
            return Err(AppError::not_found_with_id("Repository", id.to_string()));
        }
        self.sync.forget(id).await;
        log::info!("[registry] Deleted repository {}", id);
        Ok(())
    }

    /// Replace a repository's token. Cached data fetched with the old token is
    /// discarded.
    pub async fn rotate_token(&self, id: i64, token: &str) -> Result<Repository, AppError> {
        if token.trim().is_empty() {
            return Err(AppError::invalid_input_field("Token is required", "token"));
        }

        let encrypted = self.credentials.encrypt(token.trim())?;
        if !repositories::update_token(&self.pool, id, &encrypted).await? {
            return Err(AppError::not_found_with_id("Repository", id.to_string()));
        }

        let repository = self.get(id).await?;
        self.sync.invalidate(&repository).await?;

        log::info!("[registry] Rotated token for {}", repository.full_name());
        Ok(repository)
    }

    pub async fn target_count(&self, id: i64) -> Result<Option<i64>, AppError> {
        metrics::get_target_count(&self.pool, id).await
    }

    pub async fn set_target_count(&self, id: i64, count: i64) -> Result<(), AppError> {
        validate_target_count(count)?;
        self.get(id).await?;
        metrics::upsert_target_count(&self.pool, id, count).await
    }

    /// Code owners of a repository.
    ///
    /// When none are stored, the repository's contributors are fetched from
    /// GitHub and stored as its owners.
    pub async fn owners(&self, repository: &Repository) -> Result<Vec<String>, AppError> {
        let cached = owners::get_owners(&self.pool, repository.id).await?;
        if !cached.is_empty() {
            return Ok(cached.into_iter().map(|o| o.username).collect());
        }
        if owners::owners_fetched(&self.pool, repository.id).await? {
            // Fetched before and GitHub had no contributors.
            return Ok(Vec::new());
        }

        let token = self.credentials.decrypt(&repository.encrypted_token)?;
        let request = RepositoryRequest::new(
            repository.id,
            &repository.owner,
            &repository.name,
            token,
            PageRequest::first(self.config.per_page),
            &self.config,
        );
        let fetched = self.remote.get_code_owners(&request).await?;
        log::info!(
            "[registry] Fetched {} code owners for {}",
            fetched.len(),
            repository.full_name()
        );

        owners::insert_owners(&self.pool, repository.id, &fetched).await?;
        owners::mark_owners_fetched(&self.pool, repository.id).await?;
        let stored = owners::get_owners(&self.pool, repository.id).await?;
        Ok(stored.into_iter().map(|o| o.username).collect())
    }
}
