//! Shared fixtures: an in-memory GitHub stand-in and app assembly helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pr_pulse::config::Settings;
use pr_pulse::db::{self, DbPool};
use pr_pulse::error::AppError;
use pr_pulse::models::{Approval, NewRepository, PullRequestDetail, Repository};
use pr_pulse::services::{
    EncryptionKey, FixedClock, RemoteDataSource, RemotePullRequest, RepositoryRequest,
    TokenCipher,
};
use pr_pulse::App;

pub const AUTHORS: [&str; 3] = ["alice", "bob", "carol"];

/// How a fake endpoint fails.
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Unauthorized,
    Server,
    Network,
}

impl Failure {
    fn to_error(self) -> AppError {
        match self {
            Failure::Unauthorized => AppError::unauthorized("Bad credentials"),
            Failure::Server => AppError::server("Bad gateway", 502),
            Failure::Network => AppError::network("Failed to connect to server"),
        }
    }
}

/// In-memory GitHub with call counters.
#[derive(Default)]
pub struct FakeRemote {
    /// Newest first, as the pulls listing returns them.
    pull_requests: Mutex<Vec<RemotePullRequest>>,
    pull_failures: Mutex<HashMap<u32, Failure>>,
    approvals: Mutex<HashMap<i64, Vec<String>>>,
    details: Mutex<HashMap<i64, PullRequestDetail>>,
    failing_approvals: Mutex<HashSet<i64>>,
    failing_comments: Mutex<HashSet<i64>>,
    code_owners: Mutex<Vec<String>>,
    tokens_seen: Mutex<Vec<String>>,

    pub pull_calls: AtomicUsize,
    pub approval_calls: AtomicUsize,
    pub comment_calls: AtomicUsize,
    pub owner_calls: AtomicUsize,
}

impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// A remote with pull requests numbered `count` down to 1.
    pub fn with_pull_requests(count: i64) -> Self {
        let remote = Self::new();
        remote.set_pull_requests(count);
        remote
    }

    pub fn set_pull_requests(&self, count: i64) {
        let prs = (1..=count)
            .rev()
            .map(|number| RemotePullRequest {
                number,
                title: format!("feat: change {}", number),
                author: AUTHORS[(number as usize) % AUTHORS.len()].to_string(),
                avatar_url: None,
            })
            .collect();
        *self.pull_requests.lock().unwrap() = prs;
    }

    pub fn fail_page(&self, page: u32, failure: Failure) {
        self.pull_failures.lock().unwrap().insert(page, failure);
    }

    pub fn set_approvals(&self, pr: i64, reviewers: &[&str]) {
        self.approvals
            .lock()
            .unwrap()
            .insert(pr, reviewers.iter().map(|r| r.to_string()).collect());
    }

    pub fn set_detail(&self, pr: i64, merged: bool, review_comments: i64) {
        self.details.lock().unwrap().insert(
            pr,
            PullRequestDetail {
                merged,
                review_comments,
            },
        );
    }

    pub fn fail_approvals(&self, pr: i64) {
        self.failing_approvals.lock().unwrap().insert(pr);
    }

    pub fn fail_comments(&self, pr: i64) {
        self.failing_comments.lock().unwrap().insert(pr);
    }

    pub fn set_code_owners(&self, owners: &[&str]) {
        *self.code_owners.lock().unwrap() = owners.iter().map(|o| o.to_string()).collect();
    }

    pub fn tokens_seen(&self) -> Vec<String> {
        self.tokens_seen.lock().unwrap().clone()
    }

    pub fn pull_calls(&self) -> usize {
        self.pull_calls.load(Ordering::SeqCst)
    }

    pub fn approval_calls(&self) -> usize {
        self.approval_calls.load(Ordering::SeqCst)
    }

    pub fn comment_calls(&self) -> usize {
        self.comment_calls.load(Ordering::SeqCst)
    }

    pub fn owner_calls(&self) -> usize {
        self.owner_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteDataSource for FakeRemote {
    async fn get_pull_requests(
        &self,
        request: &RepositoryRequest,
    ) -> Result<Vec<RemotePullRequest>, AppError> {
        self.pull_calls.fetch_add(1, Ordering::SeqCst);
        self.tokens_seen.lock().unwrap().push(request.token.clone());

        if let Some(failure) = self.pull_failures.lock().unwrap().get(&request.page) {
            return Err(failure.to_error().for_repository(request.repository_id));
        }

        let prs = self.pull_requests.lock().unwrap();
        let start = ((request.page.max(1) - 1) * request.per_page) as usize;
        let page: Vec<RemotePullRequest> = prs
            .iter()
            .skip(start)
            .take(request.per_page as usize)
            .cloned()
            .collect();

        if page.is_empty() {
            return Err(AppError::empty(format!("page {}", request.page)));
        }
        Ok(page)
    }

    async fn get_approvals(
        &self,
        request: &RepositoryRequest,
        pull_request_id: i64,
    ) -> Result<Vec<Approval>, AppError> {
        self.approval_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_approvals.lock().unwrap().contains(&pull_request_id) {
            return Err(Failure::Server.to_error());
        }

        Ok(self
            .approvals
            .lock()
            .unwrap()
            .get(&pull_request_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|reviewer| Approval {
                repository_id: request.repository_id,
                pull_request_id,
                reviewer,
                avatar_url: None,
                submitted_at: Some("2024-01-02T10:00:00Z".to_string()),
            })
            .collect())
    }

    async fn get_review_comment_count(
        &self,
        _request: &RepositoryRequest,
        pull_request_id: i64,
    ) -> Result<PullRequestDetail, AppError> {
        self.comment_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_comments.lock().unwrap().contains(&pull_request_id) {
            return Err(Failure::Network.to_error());
        }

        Ok(self
            .details
            .lock()
            .unwrap()
            .get(&pull_request_id)
            .copied()
            .unwrap_or(PullRequestDetail {
                merged: false,
                review_comments: 0,
            }))
    }

    async fn get_code_owners(&self, _request: &RepositoryRequest) -> Result<Vec<String>, AppError> {
        self.owner_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.code_owners.lock().unwrap().clone())
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// Everything a test needs to rebuild the app on another day.
pub struct Harness {
    pub pool: DbPool,
    pub remote: Arc<FakeRemote>,
    pub cipher: Arc<TokenCipher>,
    pub settings: Settings,
}

impl Harness {
    pub async fn new(remote: FakeRemote) -> Self {
        Self::with_settings(remote, Settings::default()).await
    }

    pub async fn with_settings(remote: FakeRemote, settings: Settings) -> Self {
        Self {
            pool: db::initialize_in_memory().await.unwrap(),
            remote: Arc::new(remote),
            cipher: Arc::new(TokenCipher::new(EncryptionKey::generate())),
            settings,
        }
    }

    /// The app as it runs on `today`.
    pub fn app(&self, today: &str) -> App {
        App::with_components(
            self.settings.clone(),
            self.pool.clone(),
            self.cipher.clone(),
            self.remote.clone(),
            Arc::new(FixedClock(date(today))),
        )
    }

    pub async fn register(&self, app: &App, target_count: Option<i64>) -> Repository {
        app.registry
            .register(NewRepository {
                owner: "octo".to_string(),
                name: "widgets".to_string(),
                token: "ghp_test_token".to_string(),
                code_owners: Vec::new(),
                target_count,
            })
            .await
            .unwrap()
    }
}
