//! Code owner model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A username whose pull requests count toward a repository's statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    pub repository_id: i64,
    pub username: String,
}
