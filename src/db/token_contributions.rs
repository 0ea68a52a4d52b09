//! Queries for named contribution tokens.

use crate::db::pool::DbPool;
use crate::error::AppError;
use crate::models::TokenContribution;

pub async fn insert_token(
    pool: &DbPool,
    name: &str,
    encrypted_token: &str,
) -> Result<TokenContribution, AppError> {
    sqlx::query_as::<_, TokenContribution>(
        "INSERT INTO token_contributions (name, encrypted_token) VALUES (?, ?) RETURNING id, name, encrypted_token, created_at",
    )
    .bind(name)
    .bind(encrypted_token)
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::invalid_input_field(format!("A token named '{}' already exists", name), "name")
        }
        _ => AppError::database_with_op(e.to_string(), "insert_token"),
    })
}

pub async fn get_token(pool: &DbPool, id: i64) -> Result<Option<TokenContribution>, AppError> {
    let token = sqlx::query_as::<_, TokenContribution>(
        "SELECT id, name, encrypted_token, created_at FROM token_contributions WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(token)
}

pub async fn list_tokens(pool: &DbPool) -> Result<Vec<TokenContribution>, AppError> {
    let tokens = sqlx::query_as::<_, TokenContribution>(
        "SELECT id, name, encrypted_token, created_at FROM token_contributions ORDER BY name",
    )
    .fetch_all(pool)
    .await?;
    Ok(tokens)
}

pub async fn delete_token(pool: &DbPool, id: i64) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM token_contributions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
