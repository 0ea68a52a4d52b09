//! Queries for code owners.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::Owner;

/// Insert owners for a repository, ignoring usernames already present.
pub async fn insert_owners(
    pool: &DbPool,
    repository_id: i64,
    usernames: &[String],
) -> Result<(), AppError> {
    let mut tx = pool.begin().await?;
    for username in usernames {
        let username = username.trim();
        if username.is_empty() {
            continue;
        }
        sqlx::query("INSERT OR IGNORE INTO owners (repository_id, username) VALUES (?, ?)")
            .bind(repository_id)
            .bind(username)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Owners of a repository, alphabetically.
pub async fn get_owners(pool: &DbPool, repository_id: i64) -> Result<Vec<Owner>, AppError> {
    let owners = sqlx::query_as::<_, Owner>(
        "SELECT repository_id, username FROM owners WHERE repository_id = ? ORDER BY username",
    )
    .bind(repository_id)
    .fetch_all(pool)
    .await?;
    Ok(owners)
}

/// Record that the owners of a repository were fetched from GitHub.
pub async fn mark_owners_fetched(pool: &DbPool, repository_id: i64) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO owner_fetches (repository_id) VALUES (?)")
        .bind(repository_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn owners_fetched(pool: &DbPool, repository_id: i64) -> Result<bool, AppError> {
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT repository_id FROM owner_fetches WHERE repository_id = ?")
            .bind(repository_id)
            .fetch_optional(pool)
            .await?;
    Ok(row.is_some())
}
