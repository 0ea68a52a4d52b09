//! Registered repository model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A GitHub repository registered for tracking.
///
/// `(owner, name)` is the natural key; `id` is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Repository {
    /// Local database ID.
    pub id: i64,

    /// Account or organization owning the repository.
    pub owner: String,

    /// Repository name.
    pub name: String,

    /// Personal access token, encrypted with the credential store.
    #[serde(skip_serializing)]
    pub encrypted_token: String,

    /// Unix timestamp of registration.
    pub created_at: i64,
}

/// Data required to register a repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRepository {
    pub owner: String,
    pub name: String,

    /// Plaintext personal access token; encrypted before it is stored.
    pub token: String,

    /// Initial code owners. Empty means "fetch from GitHub on demand".
    #[serde(default)]
    pub code_owners: Vec<String>,

    /// Target number of pull requests to accumulate.
    pub target_count: Option<i64>,
}

impl Repository {
    /// `owner/name`, as GitHub displays it.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Parse an `owner/name` string, tolerating surrounding whitespace and a
    /// `https://github.com/` prefix.
    pub fn parse_full_name(input: &str) -> Option<(String, String)> {
        let trimmed = input
            .trim()
            .trim_start_matches("https://github.com/")
            .trim_end_matches('/')
            .trim_end_matches(".git");
        let (owner, name) = trimmed.split_once('/')?;
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return None;
        }
        Some((owner.to_string(), name.to_string()))
    }
}
