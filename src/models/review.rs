//! Review models: approvals and review comment counts.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An approving review on a pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub repository_id: i64,
    pub pull_request_id: i64,

    /// Reviewer's GitHub login.
    pub reviewer: String,

    pub avatar_url: Option<String>,

    /// ISO 8601 submission timestamp from GitHub.
    pub submitted_at: Option<String>,
}

/// Review comment count of a merged pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PrComment {
    pub repository_id: i64,
    pub pull_request_id: i64,

    /// Pull request author the comments were left for.
    pub author: String,

    pub review_comments: i64,
}
