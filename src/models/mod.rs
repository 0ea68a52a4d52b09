//! Data models for the application.
//!
//! These models represent the entities stored in the local SQLite cache and
//! returned to the presentation layer.
//!
//! Persisted models derive Serialize for hosts and FromRow for SQLx queries.

pub mod owner;
pub mod pull_request;
pub mod repository;
pub mod review;
pub mod token_contribution;

// Re-exports for convenient access
pub use owner::Owner;
pub use pull_request::{PageRequest, PullRequest, PullRequestDetail};
pub use repository::{NewRepository, Repository};
pub use review::{Approval, PrComment};
pub use token_contribution::{ContributionSummary, TokenContribution};
