//! Pull request sync engine.
//!
//! Reconciles the local cache with GitHub for one repository at a time:
//! - Freshness check against the repository's last insertion date
//! - Page-by-page accumulation until the repository's target count is met
//! - Cache invalidation and the age-based reset signal
//! - Approval and review comment fan-out over cached pull requests

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

use crate::config::SyncConfig;
use crate::db::CacheStore;
use crate::error::AppError;
use crate::models::{PageRequest, PrComment, PullRequest, Repository};
use crate::services::clock::Clock;
use crate::services::credentials::CredentialStore;
use crate::services::remote::{RemoteDataSource, RepositoryRequest};

/// Storage format of the last insertion date.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result of a full repository sync.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    /// Whether stale cached data was discarded first.
    pub reset: bool,

    /// Number of pull requests in the cache afterwards.
    pub pull_request_count: usize,

    /// Pull requests whose approvals were fetched.
    pub approvals_synced: usize,

    /// Merged pull requests whose review comment count was stored.
    pub comments_synced: usize,

    /// Non-fatal per pull request failures.
    pub errors: Vec<String>,

    /// Duration of the sync in milliseconds.
    pub duration_ms: i64,
}

/// Result of the approval and comment fan-out.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSyncReport {
    pub processed: usize,
    pub approvals_synced: usize,
    pub comments_synced: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
struct PullRequestReviews {
    approvals_synced: bool,
    comments_synced: bool,
    errors: Vec<String>,
}

/// Format a date the way it is stored.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parse a stored date. `None` for anything that is not `YYYY-MM-DD`.
pub fn parse_date(stored: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(stored.trim(), DATE_FORMAT).ok()
}

/// Whether a stored date marks the cache as fresh on `today`.
pub fn is_fresh_date(stored: &str, today: NaiveDate) -> bool {
    parse_date(stored) == Some(today)
}

/// Whether data inserted on `stored` is older than the reset window.
///
/// Unparseable dates always exceed it.
pub fn exceeds_reset_window(stored: &str, today: NaiveDate, reset_after_days: i64) -> bool {
    match parse_date(stored) {
        Some(date) => (today - date).num_days() > reset_after_days,
        None => true,
    }
}

/// Cache/remote reconciler for pull requests.
pub struct PullRequestSync {
    cache: Arc<dyn CacheStore>,
    remote: Arc<dyn RemoteDataSource>,
    credentials: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    config: SyncConfig,

    /// One lock per repository id; concurrent reconciliations of the same
    /// repository run one after the other.
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl PullRequestSync {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        remote: Arc<dyn RemoteDataSource>,
        credentials: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
        config: SyncConfig,
    ) -> Self {
        Self {
            cache,
            remote,
            credentials,
            clock,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    async fn repository_lock(&self, repository_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(repository_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Build the remote request for a repository, decrypting its token.
    fn request_for(
        &self,
        repository: &Repository,
        page: PageRequest,
    ) -> Result<RepositoryRequest, AppError> {
        let token = self.credentials.decrypt(&repository.encrypted_token)?;
        Ok(RepositoryRequest::new(
            repository.id,
            &repository.owner,
            &repository.name,
            token,
            page,
            &self.config,
        ))
    }

    /// Whether the repository's cache was filled today.
    pub async fn is_fresh(&self, repository_id: i64, today: NaiveDate) -> Result<bool, AppError> {
        let stored = self.cache.get_last_insertion_date(repository_id).await?;
        Ok(stored.is_some_and(|date| is_fresh_date(&date, today)))
    }

    async fn mark_fresh(&self, repository_id: i64, today: NaiveDate) -> Result<(), AppError> {
        self.cache
            .set_last_insertion_date(repository_id, Some(format_date(today).as_str()))
            .await
    }

    /// Pull requests of a repository, fetching from GitHub when the cache is
    /// stale or holds fewer than the repository's target count.
    ///
    /// Pages are fetched starting at `page_request` until the target count is
    /// reached or GitHub has no more pull requests. Every fetched page is
    /// committed before the next one is requested.
    pub async fn get_pull_requests(
        &self,
        repository: &Repository,
        page_request: PageRequest,
        force_reload: bool,
    ) -> Result<Vec<PullRequest>, AppError> {
        let lock = self.repository_lock(repository.id).await;
        let _guard = lock.lock().await;

        let today = self.clock.today();
        if !force_reload && self.is_fresh(repository.id, today).await? {
            log::debug!("[sync] {} is fresh, serving cache", repository.full_name());
            return self.cache.get_pull_requests(repository.id).await;
        }

        let min_count = self
            .cache
            .get_target_count(repository.id)
            .await?
            .unwrap_or(0);
        let request = self.request_for(repository, page_request)?;

        let mut page = page_request;
        let mut pages_fetched = 0u32;

        loop {
            if pages_fetched >= self.config.max_pages {
                // Terminal like remote exhaustion, otherwise every call would
                // refetch the same leading pages.
                log::warn!(
                    "[sync] {}: stopped after {} pages without reaching {} pull requests",
                    repository.full_name(),
                    pages_fetched,
                    min_count
                );
                self.mark_fresh(repository.id, today).await?;
                return self.cache.get_pull_requests(repository.id).await;
            }

            let remote_prs = match self.remote.get_pull_requests(&request.with_page(page)).await {
                Ok(prs) => prs,
                Err(e) if e.is_empty() => {
                    let local = self.cache.get_pull_requests(repository.id).await?;
                    if pages_fetched == 0 && local.is_empty() {
                        log::info!("[sync] {}: no pull requests found", repository.full_name());
                        return Err(AppError::empty(format!(
                            "no pull requests found for {}",
                            repository.full_name()
                        )));
                    }

                    log::info!(
                        "[sync] {}: remote exhausted at page {}, {} cached",
                        repository.full_name(),
                        page.page,
                        local.len()
                    );
                    self.mark_fresh(repository.id, today).await?;
                    return Ok(local);
                }
                Err(e) => {
                    log::warn!(
                        "[sync] {}: page {} failed: {}",
                        repository.full_name(),
                        page.page,
                        e
                    );
                    return Err(e.for_repository(repository.id));
                }
            };
            pages_fetched += 1;

            let prs: Vec<PullRequest> = remote_prs
                .into_iter()
                .map(|pr| PullRequest {
                    id: pr.number,
                    repository_id: repository.id,
                    title: pr.title,
                    author: pr.author,
                    avatar_url: pr.avatar_url,
                })
                .collect();
            self.cache.insert_pull_requests(&prs).await?;

            let local = self.cache.get_pull_requests(repository.id).await?;
            log::debug!(
                "[sync] {}: page {} stored {} pull requests, {} cached, target {}",
                repository.full_name(),
                page.page,
                prs.len(),
                local.len(),
                min_count
            );

            if local.len() as i64 >= min_count {
                self.mark_fresh(repository.id, today).await?;
                return Ok(local);
            }

            page = page.next();
        }
    }

    /// Drop cached pull requests (with their approvals and comments) and
    /// forget when the repository was last filled.
    pub async fn invalidate(&self, repository: &Repository) -> Result<(), AppError> {
        let lock = self.repository_lock(repository.id).await;
        let _guard = lock.lock().await;

        let deleted = self.cache.delete_pull_requests(repository.id).await?;
        self.cache
            .set_last_insertion_date(repository.id, None)
            .await?;

        log::info!(
            "[sync] {}: invalidated {} cached pull requests",
            repository.full_name(),
            deleted
        );
        Ok(())
    }

    /// Drop the lock of a deleted repository.
    pub async fn forget(&self, repository_id: i64) {
        self.locks.lock().await.remove(&repository_id);
    }

    /// Number of repositories with a lock entry.
    pub async fn tracked_repositories(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Whether the repository's cached data is too old to keep accumulating.
    ///
    /// A repository that was never filled does not need a reset.
    pub async fn needs_reset(&self, repository_id: i64, today: NaiveDate) -> Result<bool, AppError> {
        let stored = self.cache.get_last_insertion_date(repository_id).await?;
        Ok(match stored {
            None => false,
            Some(date) => {
                let reset = exceeds_reset_window(&date, today, self.config.reset_after_days);
                if reset && parse_date(&date).is_none() {
                    log::warn!(
                        "[sync] Repository {} has unreadable insertion date {:?}",
                        repository_id,
                        date
                    );
                }
                reset
            }
        })
    }

    /// Fetch missing approvals and review comment counts for every cached
    /// pull request of the repository.
    ///
    /// A failure for one pull request is recorded and does not stop others.
    pub async fn fetch_approvals_and_comments(
        &self,
        repository: &Repository,
    ) -> Result<ReviewSyncReport, AppError> {
        let request = self.request_for(repository, PageRequest::first(self.config.per_page))?;
        let prs = self.cache.get_pull_requests(repository.id).await?;

        let outcomes: Vec<PullRequestReviews> = stream::iter(prs.iter())
            .map(|pr| self.sync_reviews(&request, pr))
            .buffer_unordered(self.config.review_concurrency.max(1))
            .collect()
            .await;

        let mut report = ReviewSyncReport {
            processed: prs.len(),
            ..Default::default()
        };
        for outcome in outcomes {
            report.approvals_synced += usize::from(outcome.approvals_synced);
            report.comments_synced += usize::from(outcome.comments_synced);
            report.errors.extend(outcome.errors);
        }

        log::info!(
            "[sync] {}: reviews for {} pull requests, {} approvals and {} comment counts fetched, {} errors",
            repository.full_name(),
            report.processed,
            report.approvals_synced,
            report.comments_synced,
            report.errors.len()
        );
        Ok(report)
    }

    async fn sync_reviews(&self, request: &RepositoryRequest, pr: &PullRequest) -> PullRequestReviews {
        let (approvals, comments) = tokio::join!(
            self.sync_approvals(request, pr),
            self.sync_comments(request, pr)
        );

        let mut outcome = PullRequestReviews::default();
        match approvals {
            Ok(synced) => outcome.approvals_synced = synced,
            Err(e) => {
                log::warn!("[sync] Failed to fetch approvals for PR #{}: {}", pr.id, e);
                outcome.errors.push(format!("PR #{} approvals: {}", pr.id, e));
            }
        }
        match comments {
            Ok(synced) => outcome.comments_synced = synced,
            Err(e) => {
                log::warn!("[sync] Failed to fetch comments for PR #{}: {}", pr.id, e);
                outcome.errors.push(format!("PR #{} comments: {}", pr.id, e));
            }
        }
        outcome
    }

    /// Returns whether approvals were fetched from the remote.
    async fn sync_approvals(
        &self,
        request: &RepositoryRequest,
        pr: &PullRequest,
    ) -> Result<bool, AppError> {
        if self.cache.has_approvals(pr.repository_id, pr.id).await? {
            return Ok(false);
        }

        let approvals = self.remote.get_approvals(request, pr.id).await?;
        self.cache.insert_approvals(&approvals).await?;
        Ok(true)
    }

    /// Returns whether a comment count was stored. Only merged pull requests
    /// get one.
    async fn sync_comments(
        &self,
        request: &RepositoryRequest,
        pr: &PullRequest,
    ) -> Result<bool, AppError> {
        if self.cache.has_comments(pr.repository_id, pr.id).await? {
            return Ok(false);
        }

        let detail = self.remote.get_review_comment_count(request, pr.id).await?;
        if !detail.merged {
            return Ok(false);
        }

        self.cache
            .insert_comment(&PrComment {
                repository_id: pr.repository_id,
                pull_request_id: pr.id,
                author: pr.author.clone(),
                review_comments: detail.review_comments,
            })
            .await?;
        Ok(true)
    }

    /// Daily sync of one repository.
    ///
    /// 1. Discards the cache if it is older than the reset window
    /// 2. Accumulates pull requests from the first page
    /// 3. Fetches missing approvals and review comment counts
    pub async fn sync_repository(&self, repository: &Repository) -> Result<SyncResult, AppError> {
        let start = Instant::now();
        let today = self.clock.today();
        let mut result = SyncResult::default();

        if self.needs_reset(repository.id, today).await? {
            log::info!("[sync] {}: cache is stale, resetting", repository.full_name());
            self.invalidate(repository).await?;
            result.reset = true;
        }

        let prs = self
            .get_pull_requests(repository, PageRequest::first(self.config.per_page), false)
            .await?;
        result.pull_request_count = prs.len();

        let report = self.fetch_approvals_and_comments(repository).await?;
        result.approvals_synced = report.approvals_synced;
        result.comments_synced = report.comments_synced;
        result.errors = report.errors;
        result.duration_ms = start.elapsed().as_millis() as i64;

        log::info!(
            "[sync] {}: synced {} pull requests in {}ms",
            repository.full_name(),
            result.pull_request_count,
            result.duration_ms
        );
        Ok(result)
    }
}
