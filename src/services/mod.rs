//! Business logic services.
//!
//! This module contains the sync engine and the services built around it:
//! talking to GitHub, encrypting tokens, managing registered repositories
//! and computing dashboard statistics.
//!
//! Services take their collaborators as trait objects so they can be tested
//! without a network or a keychain.

pub mod clock;
pub mod contributions;
pub mod credentials;
pub mod github_client;
pub mod registry;
pub mod remote;
pub mod statistics;
pub mod sync_engine;

pub use clock::{Clock, FixedClock, SystemClock};
pub use contributions::ContributionService;
pub use credentials::{CredentialStore, EncryptionKey, TokenCipher};
pub use github_client::GitHubClient;
pub use registry::RepositoryRegistry;
pub use remote::{GitHubRemote, RemoteDataSource, RemotePullRequest, RepositoryRequest};
pub use sync_engine::{PullRequestSync, ReviewSyncReport, SyncResult};
