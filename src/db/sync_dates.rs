//! Queries for the per-repository last insertion date.

use crate::db::pool::DbPool;
use crate::error::AppError;

/// The stored date string, `None` if never set or reset.
pub async fn get_last_insertion_date(
    pool: &DbPool,
    repository_id: i64,
) -> Result<Option<String>, AppError> {
    let row: Option<(Option<String>,)> =
        sqlx::query_as("SELECT last_insertion_date FROM sync_dates WHERE repository_id = ?")
            .bind(repository_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.and_then(|(date,)| date))
}

/// Store a date string, or `None` to reset.
pub async fn set_last_insertion_date(
    pool: &DbPool,
    repository_id: i64,
    date: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO sync_dates (repository_id, last_insertion_date) VALUES (?, ?)
        ON CONFLICT(repository_id) DO UPDATE SET last_insertion_date = excluded.last_insertion_date
        "#,
    )
    .bind(repository_id)
    .bind(date)
    .execute(pool)
    .await?;
    Ok(())
}
