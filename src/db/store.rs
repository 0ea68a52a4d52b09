//! The cache seam used by the sync engine.
//!
//! `CacheStore` is the set of cache operations reconciliation needs.
//! `SqliteStore` implements it over the query modules of this crate.

use async_trait::async_trait;

use crate::db::pool::DbPool;
use crate::db::{metrics, owners, pull_requests, repositories, reviews, sync_dates};
use crate::error::AppError;
use crate::models::{Approval, Owner, PrComment, PullRequest, Repository};

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get_repository(&self, id: i64) -> Result<Option<Repository>, AppError>;

    async fn get_pull_requests(&self, repository_id: i64) -> Result<Vec<PullRequest>, AppError>;
    async fn insert_pull_requests(&self, prs: &[PullRequest]) -> Result<(), AppError>;
    async fn delete_pull_requests(&self, repository_id: i64) -> Result<u64, AppError>;

    async fn get_target_count(&self, repository_id: i64) -> Result<Option<i64>, AppError>;
    async fn set_target_count(&self, repository_id: i64, count: i64) -> Result<(), AppError>;

    async fn get_owners(&self, repository_id: i64) -> Result<Vec<Owner>, AppError>;
    async fn insert_owners(&self, repository_id: i64, usernames: &[String])
        -> Result<(), AppError>;

    async fn get_last_insertion_date(&self, repository_id: i64) -> Result<Option<String>, AppError>;
    async fn set_last_insertion_date(
        &self,
        repository_id: i64,
        date: Option<&str>,
    ) -> Result<(), AppError>;

    async fn has_approvals(&self, repository_id: i64, pull_request_id: i64)
        -> Result<bool, AppError>;
    async fn insert_approvals(&self, approvals: &[Approval]) -> Result<(), AppError>;
    async fn get_approvals(&self, repository_id: i64) -> Result<Vec<Approval>, AppError>;

    async fn has_comments(&self, repository_id: i64, pull_request_id: i64)
        -> Result<bool, AppError>;
    async fn insert_comment(&self, comment: &PrComment) -> Result<(), AppError>;
    async fn get_comments(&self, repository_id: i64) -> Result<Vec<PrComment>, AppError>;
}

/// `CacheStore` backed by the SQLite pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn get_repository(&self, id: i64) -> Result<Option<Repository>, AppError> {
        repositories::get_repository(&self.pool, id).await
    }

    async fn get_pull_requests(&self, repository_id: i64) -> Result<Vec<PullRequest>, AppError> {
        pull_requests::get_pull_requests(&self.pool, repository_id).await
    }

    async fn insert_pull_requests(&self, prs: &[PullRequest]) -> Result<(), AppError> {
        pull_requests::insert_pull_requests(&self.pool, prs).await
    }

    async fn delete_pull_requests(&self, repository_id: i64) -> Result<u64, AppError> {
        pull_requests::delete_pull_requests(&self.pool, repository_id).await
    }

    async fn get_target_count(&self, repository_id: i64) -> Result<Option<i64>, AppError> {
        metrics::get_target_count(&self.pool, repository_id).await
    }

    async fn set_target_count(&self, repository_id: i64, count: i64) -> Result<(), AppError> {
        metrics::upsert_target_count(&self.pool, repository_id, count).await
    }

    async fn get_owners(&self, repository_id: i64) -> Result<Vec<Owner>, AppError> {
        owners::get_owners(&self.pool, repository_id).await
    }

    async fn insert_owners(
        &self,
        repository_id: i64,
        usernames: &[String],
    ) -> Result<(), AppError> {
        owners::insert_owners(&self.pool, repository_id, usernames).await
    }

    async fn get_last_insertion_date(&self, repository_id: i64) -> Result<Option<String>, AppError> {
        sync_dates::get_last_insertion_date(&self.pool, repository_id).await
    }

    async fn set_last_insertion_date(
        &self,
        repository_id: i64,
        date: Option<&str>,
    ) -> Result<(), AppError> {
        sync_dates::set_last_insertion_date(&self.pool, repository_id, date).await
    }

    async fn has_approvals(
        &self,
        repository_id: i64,
        pull_request_id: i64,
    ) -> Result<bool, AppError> {
        reviews::has_approvals(&self.pool, repository_id, pull_request_id).await
    }

    async fn insert_approvals(&self, approvals: &[Approval]) -> Result<(), AppError> {
        reviews::insert_approvals(&self.pool, approvals).await
    }

    async fn get_approvals(&self, repository_id: i64) -> Result<Vec<Approval>, AppError> {
        reviews::get_approvals(&self.pool, repository_id).await
    }

    async fn has_comments(
        &self,
        repository_id: i64,
        pull_request_id: i64,
    ) -> Result<bool, AppError> {
        reviews::has_comments(&self.pool, repository_id, pull_request_id).await
    }

    async fn insert_comment(&self, comment: &PrComment) -> Result<(), AppError> {
        reviews::upsert_comment(&self.pool, comment).await
    }

    async fn get_comments(&self, repository_id: i64) -> Result<Vec<PrComment>, AppError> {
        reviews::get_comments(&self.pool, repository_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn setup() -> (SqliteStore, i64) {
        let pool = db::initialize_in_memory().await.unwrap();
        let repo = repositories::insert_repository(&pool, "octo", "widgets", "enc")
            .await
            .unwrap();
        (SqliteStore::new(pool), repo.id)
    }

    fn pr(repository_id: i64, id: i64, title: &str) -> PullRequest {
        PullRequest {
            id,
            repository_id,
            title: title.to_string(),
            author: "alice".to_string(),
            avatar_url: None,
        }
    }

    #[tokio::test]
    async fn test_pull_requests_insert_or_replace_by_id() {
        let (store, repo_id) = setup().await;

        store
            .insert_pull_requests(&[pr(repo_id, 1, "feat: a"), pr(repo_id, 2, "fix: b")])
            .await
            .unwrap();
        store
            .insert_pull_requests(&[pr(repo_id, 2, "fix: b (renamed)")])
            .await
            .unwrap();

        let prs = store.get_pull_requests(repo_id).await.unwrap();
        assert_eq!(prs.len(), 2);
        assert_eq!(prs[0].id, 2);
        assert_eq!(prs[0].title, "fix: b (renamed)");
    }

    #[tokio::test]
    async fn test_reinsert_keeps_reviews() {
        let (store, repo_id) = setup().await;
        store.insert_pull_requests(&[pr(repo_id, 1, "a")]).await.unwrap();
        store
            .insert_approvals(&[Approval {
                repository_id: repo_id,
                pull_request_id: 1,
                reviewer: "bob".to_string(),
                avatar_url: None,
                submitted_at: None,
            }])
            .await
            .unwrap();

        store.insert_pull_requests(&[pr(repo_id, 1, "a")]).await.unwrap();
        assert!(store.has_approvals(repo_id, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_target_count_upsert() {
        let (store, repo_id) = setup().await;

        assert_eq!(store.get_target_count(repo_id).await.unwrap(), None);
        store.set_target_count(repo_id, 10).await.unwrap();
        store.set_target_count(repo_id, 40).await.unwrap();
        assert_eq!(store.get_target_count(repo_id).await.unwrap(), Some(40));
    }

    #[tokio::test]
    async fn test_sync_date_is_per_repository() {
        let (store, repo_id) = setup().await;
        let other = repositories::insert_repository(store.pool(), "octo", "gadgets", "enc")
            .await
            .unwrap();

        store
            .set_last_insertion_date(repo_id, Some("2024-01-01"))
            .await
            .unwrap();

        assert_eq!(
            store.get_last_insertion_date(repo_id).await.unwrap().as_deref(),
            Some("2024-01-01")
        );
        assert_eq!(store.get_last_insertion_date(other.id).await.unwrap(), None);

        store.set_last_insertion_date(repo_id, None).await.unwrap();
        assert_eq!(store.get_last_insertion_date(repo_id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_pull_requests_cascades_reviews() {
        let (store, repo_id) = setup().await;
        store.insert_pull_requests(&[pr(repo_id, 5, "a")]).await.unwrap();
        store
            .insert_comment(&PrComment {
                repository_id: repo_id,
                pull_request_id: 5,
                author: "alice".to_string(),
                review_comments: 3,
            })
            .await
            .unwrap();
        assert!(store.has_comments(repo_id, 5).await.unwrap());

        assert_eq!(store.delete_pull_requests(repo_id).await.unwrap(), 1);
        assert!(!store.has_comments(repo_id, 5).await.unwrap());
        assert!(store.get_comments(repo_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repository_delete_cascades_everything() {
        let (store, repo_id) = setup().await;
        store
            .insert_owners(repo_id, &["alice".to_string(), " ".to_string(), "alice".to_string()])
            .await
            .unwrap();
        store.set_target_count(repo_id, 5).await.unwrap();
        store.insert_pull_requests(&[pr(repo_id, 1, "a")]).await.unwrap();

        assert_eq!(store.get_owners(repo_id).await.unwrap().len(), 1);

        repositories::delete_repository(store.pool(), repo_id)
            .await
            .unwrap();

        assert!(store.get_owners(repo_id).await.unwrap().is_empty());
        assert_eq!(store.get_target_count(repo_id).await.unwrap(), None);
        assert!(store.get_pull_requests(repo_id).await.unwrap().is_empty());
    }
}
