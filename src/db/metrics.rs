//! Queries for the per-repository target pull request count.

use crate::db::pool::DbPool;
use crate::error::AppError;

/// Set the target count, inserting or updating.
pub async fn upsert_target_count(
    pool: &DbPool,
    repository_id: i64,
    target_count: i64,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO metrics (repository_id, target_count) VALUES (?, ?)
        ON CONFLICT(repository_id) DO UPDATE SET target_count = excluded.target_count
        "#,
    )
    .bind(repository_id)
    .bind(target_count)
    .execute(pool)
    .await?;
    Ok(())
}

/// The target count, or `None` when never set.
pub async fn get_target_count(pool: &DbPool, repository_id: i64) -> Result<Option<i64>, AppError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT target_count FROM metrics WHERE repository_id = ?")
            .bind(repository_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(count,)| count))
}
