//! Queries for approvals and review comment counts.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::{Approval, PrComment};

/// Insert approvals, ignoring reviewers already recorded for the PR.
pub async fn insert_approvals(pool: &DbPool, approvals: &[Approval]) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    for approval in approvals {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO approvals (repository_id, pull_request_id, reviewer, avatar_url, submitted_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(approval.repository_id)
        .bind(approval.pull_request_id)
        .bind(&approval.reviewer)
        .bind(&approval.avatar_url)
        .bind(&approval.submitted_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn has_approvals(
    pool: &DbPool,
    repository_id: i64,
    pull_request_id: i64,
) -> Result<bool, AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM approvals WHERE repository_id = ? AND pull_request_id = ? LIMIT 1",
    )
    .bind(repository_id)
    .bind(pull_request_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

/// Approvals across all cached PRs of a repository.
pub async fn get_approvals(pool: &DbPool, repository_id: i64) -> Result<Vec<Approval>, AppError> {
    let approvals = sqlx::query_as::<_, Approval>(
        r#"
        SELECT repository_id, pull_request_id, reviewer, avatar_url, submitted_at
        FROM approvals WHERE repository_id = ?
        ORDER BY pull_request_id DESC, reviewer
        "#,
    )
    .bind(repository_id)
    .fetch_all(pool)
    .await?;
    Ok(approvals)
}

/// Insert or update the comment count of a pull request.
pub async fn upsert_comment(pool: &DbPool, comment: &PrComment) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO pr_comments (repository_id, pull_request_id, author, review_comments)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(repository_id, pull_request_id) DO UPDATE SET
            author = excluded.author,
            review_comments = excluded.review_comments
        "#,
    )
    .bind(comment.repository_id)
    .bind(comment.pull_request_id)
    .bind(&comment.author)
    .bind(comment.review_comments)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn has_comments(
    pool: &DbPool,
    repository_id: i64,
    pull_request_id: i64,
) -> Result<bool, AppError> {
    let row: Option<(i64,)> = sqlx::query_as(
        "SELECT 1 FROM pr_comments WHERE repository_id = ? AND pull_request_id = ?",
    )
    .bind(repository_id)
    .bind(pull_request_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.is_some())
}

pub async fn get_comments(pool: &DbPool, repository_id: i64) -> Result<Vec<PrComment>, AppError> {
    let comments = sqlx::query_as::<_, PrComment>(
        r#"
        SELECT repository_id, pull_request_id, author, review_comments
        FROM pr_comments WHERE repository_id = ?
        ORDER BY pull_request_id DESC
        "#,
    )
    .bind(repository_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}
