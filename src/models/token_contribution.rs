//! Named personal access tokens for the contributions dashboard.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored token, independent of any registered repository.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TokenContribution {
    pub id: i64,

    /// Display name, unique.
    pub name: String,

    #[serde(skip_serializing)]
    pub encrypted_token: String,

    pub created_at: i64,
}

/// Contribution totals of the token's user for the last year.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionSummary {
    pub login: String,
    pub commits: i64,
    pub pull_requests: i64,
    pub pull_request_reviews: i64,
    pub issues: i64,
}

impl ContributionSummary {
    pub fn total(&self) -> i64 {
        self.commits + self.pull_requests + self.pull_request_reviews + self.issues
    }
}
