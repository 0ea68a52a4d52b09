//! Queries for cached pull requests.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::PullRequest;

/// Insert or replace a batch of pull requests in one transaction.
pub async fn insert_pull_requests(pool: &DbPool, prs: &[PullRequest]) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    for pr in prs {
        // Upsert rather than REPLACE: a REPLACE deletes the row first and the
        // cascade would drop the PR's approvals and comment count.
        sqlx::query(
            r#"
            INSERT INTO pull_requests (id, repository_id, title, author, avatar_url)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(repository_id, id) DO UPDATE SET
                title = excluded.title,
                author = excluded.author,
                avatar_url = excluded.avatar_url
            "#,
        )
        .bind(pr.id)
        .bind(pr.repository_id)
        .bind(&pr.title)
        .bind(&pr.author)
        .bind(&pr.avatar_url)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// All cached pull requests of a repository, newest number first.
pub async fn get_pull_requests(
    pool: &DbPool,
    repository_id: i64,
) -> Result<Vec<PullRequest>, AppError> {
    let prs = sqlx::query_as::<_, PullRequest>(
        "SELECT id, repository_id, title, author, avatar_url FROM pull_requests WHERE repository_id = ? ORDER BY id DESC",
    )
    .bind(repository_id)
    .fetch_all(pool)
    .await?;
    Ok(prs)
}

pub async fn count_pull_requests(pool: &DbPool, repository_id: i64) -> Result<i64, AppError> {
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM pull_requests WHERE repository_id = ?")
        .bind(repository_id)
        .fetch_one(pool)
        .await?;
    Ok(count.0)
}

/// Drop every cached pull request of a repository. Reviews cascade.
pub async fn delete_pull_requests(pool: &DbPool, repository_id: i64) -> Result<u64, AppError> {
    let result = sqlx::query("DELETE FROM pull_requests WHERE repository_id = ?")
        .bind(repository_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
