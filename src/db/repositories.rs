//! Queries for registered repositories.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::Repository;

const COLUMNS: &str = "id, owner, name, encrypted_token, created_at";

/// Insert a repository and return it with its assigned id.
///
/// Fails with `InvalidInput` when `(owner, name)` is already registered.
pub async fn insert_repository(
    pool: &DbPool,
    owner: &str,
    name: &str,
    encrypted_token: &str,
) -> Result<Repository, AppError> {
    let query = format!(
        "INSERT INTO repositories (owner, name, encrypted_token) VALUES (?, ?, ?) RETURNING {}",
        COLUMNS
    );

    sqlx::query_as::<_, Repository>(&query)
        .bind(owner)
        .bind(name)
        .bind(encrypted_token)
        .fetch_one(pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::invalid_input_field(
                format!("{}/{} is already registered", owner, name),
                "name",
            ),
            _ => AppError::database_with_op(e.to_string(), "insert_repository"),
        })
}

/// Look up a repository by id.
pub async fn get_repository(pool: &DbPool, id: i64) -> Result<Option<Repository>, AppError> {
    let query = format!("SELECT {} FROM repositories WHERE id = ?", COLUMNS);
    let repo = sqlx::query_as::<_, Repository>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(repo)
}

/// Look up a repository by its natural key.
pub async fn find_repository(
    pool: &DbPool,
    owner: &str,
    name: &str,
) -> Result<Option<Repository>, AppError> {
    let query = format!(
        "SELECT {} FROM repositories WHERE owner = ? AND name = ?",
        COLUMNS
    );
    let repo = sqlx::query_as::<_, Repository>(&query)
        .bind(owner)
        .bind(name)
        .fetch_optional(pool)
        .await?;
    Ok(repo)
}

/// All registered repositories, oldest first.
pub async fn list_repositories(pool: &DbPool) -> Result<Vec<Repository>, AppError> {
    let query = format!("SELECT {} FROM repositories ORDER BY id", COLUMNS);
    let repos = sqlx::query_as::<_, Repository>(&query)
        .fetch_all(pool)
        .await?;
    Ok(repos)
}

/// Replace the stored token. Returns false if the repository does not exist.
pub async fn update_token(pool: &DbPool, id: i64, encrypted_token: &str) -> Result<bool, AppError> {
    let result = sqlx::query("UPDATE repositories SET encrypted_token = ? WHERE id = ?")
        .bind(encrypted_token)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a repository; owners, metrics, pull requests and reviews cascade.
pub async fn delete_repository(pool: &DbPool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM repositories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
