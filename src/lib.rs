//! PR Pulse - local-first GitHub pull request cache.
//!
//! Registers GitHub repositories, keeps their pull request history in a
//! local SQLite cache reconciled with the GitHub API, and computes the
//! per-contributor numbers dashboards show.
//!
//! The host application owns logging setup and presentation; this crate
//! only emits `log` records and returns serializable results and errors.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

use config::Settings;
use db::{CacheStore, DbPool, SqliteStore};
use error::AppError;
use models::{PageRequest, PullRequest};
use services::statistics::{self, AuthorCount, PullRequestType};
use services::{
    Clock, ContributionService, CredentialStore, EncryptionKey, GitHubRemote, PullRequestSync,
    RemoteDataSource, RepositoryRegistry, SystemClock, TokenCipher,
};

/// Dashboard numbers for one repository.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub pull_requests_by_author: Vec<AuthorCount>,
    pub approvals_by_reviewer: Vec<AuthorCount>,
    pub review_comments_by_author: Vec<AuthorCount>,
    pub pull_requests_by_type: Vec<(PullRequestType, i64)>,
}

/// The assembled services.
pub struct App {
    pub settings: Settings,
    pub pool: DbPool,
    pub sync: Arc<PullRequestSync>,
    pub registry: RepositoryRegistry,
    pub contributions: ContributionService,
    cache: Arc<dyn CacheStore>,
}

impl App {
    /// Open the data directory: settings, database and encryption key.
    pub async fn initialize(data_dir: &Path) -> Result<Self, AppError> {
        let settings = Settings::load(data_dir)?;
        let pool = db::initialize(&db::get_db_path(data_dir)).await?;
        let key = EncryptionKey::from_settings(&settings.encryption)?;

        log::info!("[app] Initialized data directory {}", data_dir.display());

        let remote = Arc::new(GitHubRemote::new(settings.github.clone()));
        Ok(Self::with_components(
            settings,
            pool,
            Arc::new(TokenCipher::new(key)),
            remote,
            Arc::new(SystemClock),
        ))
    }

    /// Assemble the services from explicit collaborators.
    pub fn with_components(
        settings: Settings,
        pool: DbPool,
        credentials: Arc<dyn CredentialStore>,
        remote: Arc<dyn RemoteDataSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache: Arc<dyn CacheStore> = Arc::new(SqliteStore::new(pool.clone()));
        let sync = Arc::new(PullRequestSync::new(
            cache.clone(),
            remote.clone(),
            credentials.clone(),
            clock,
            settings.sync.clone(),
        ));
        let registry = RepositoryRegistry::new(
            pool.clone(),
            credentials.clone(),
            remote,
            sync.clone(),
            settings.sync.clone(),
        );
        let contributions =
            ContributionService::new(pool.clone(), credentials, settings.github.clone());

        Self {
            settings,
            pool,
            sync,
            registry,
            contributions,
            cache,
        }
    }

    /// Pull requests of a registered repository, reconciled with GitHub.
    pub async fn pull_requests(
        &self,
        repository_id: i64,
        force_reload: bool,
    ) -> Result<Vec<PullRequest>, AppError> {
        let repository = self.registry.get(repository_id).await?;
        self.sync
            .get_pull_requests(
                &repository,
                PageRequest::first(self.settings.sync.per_page),
                force_reload,
            )
            .await
    }

    /// Statistics over what is cached for a repository. PR counts only
    /// include the repository's code owners.
    pub async fn stats(&self, repository_id: i64) -> Result<RepositoryStats, AppError> {
        let repository = self.registry.get(repository_id).await?;
        let owners = self.registry.owners(&repository).await?;
        let prs = self.cache.get_pull_requests(repository_id).await?;
        let approvals = self.cache.get_approvals(repository_id).await?;
        let comments = self.cache.get_comments(repository_id).await?;

        Ok(RepositoryStats {
            pull_requests_by_author: statistics::pull_requests_by_author(&prs, &owners),
            approvals_by_reviewer: statistics::approvals_by_reviewer(&approvals),
            review_comments_by_author: statistics::review_comments_by_author(&comments),
            pull_requests_by_type: statistics::pull_requests_by_type(&prs),
        })
    }
}
