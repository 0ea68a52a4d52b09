//! Pull request model and paging parameters.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A cached pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PullRequest {
    /// GitHub pull request number.
    pub id: i64,

    /// Parent repository ID.
    pub repository_id: i64,

    pub title: String,

    /// Author's GitHub login.
    pub author: String,

    pub avatar_url: Option<String>,
}

/// Which page of pull requests to start reconciling from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,

    /// Items per page.
    pub per_page: u32,
}

impl PageRequest {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page,
        }
    }

    /// First page with the given size.
    pub fn first(per_page: u32) -> Self {
        Self::new(1, per_page)
    }

    pub fn next(self) -> Self {
        Self {
            page: self.page + 1,
            ..self
        }
    }
}

/// Merge state and review comment count of a single pull request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestDetail {
    pub merged: bool,
    pub review_comments: i64,
}
