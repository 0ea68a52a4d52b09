//! Application error types.
//!
//! These errors are serializable so a host (desktop shell, CLI, HTTP layer)
//! can hand them to its presentation layer unchanged. `AppError::kind` folds
//! every variant into the small set of states a dashboard distinguishes.

use serde::Serialize;
use thiserror::Error;

/// Coarse error classification used by presentation layers to pick a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// No connectivity (connect failure, timeout).
    NoInternet,
    /// Token rejected by GitHub.
    Unauthorized,
    /// No data, or pagination exhausted.
    Empty,
    /// Generic failure.
    Error,
    /// GitHub answered with a 5xx.
    ServerError,
    /// Anything we could not classify.
    Unknown,
}

/// Application-level errors.
///
/// All variants serialize to a structured JSON object for frontend consumption.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        operation: Option<String>,
    },

    /// GitHub API request failed with a client-side status.
    #[error("GitHub API error: {message}")]
    GitHubApi {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },

    /// GitHub answered with a server error.
    #[error("GitHub server error ({status_code}): {message}")]
    Server { message: String, status_code: u16 },

    /// Network request failed before a response arrived.
    #[error("Network error: {message}")]
    Network { message: String },

    /// The token was rejected (401).
    #[error("Unauthorized: {message}")]
    Unauthorized {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        repository_id: Option<i64>,
    },

    /// The remote returned no data for the request.
    #[error("No data: {resource}")]
    Empty { resource: String },

    /// Token encryption or decryption failed.
    #[error("Crypto error: {message}")]
    Crypto { message: String },

    /// Keychain operation failed.
    #[error("Credential storage error: {message}")]
    CredentialStorage { message: String },

    /// Settings could not be read or written.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Requested resource not found.
    #[error("Not found: {resource}")]
    NotFound {
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },

    /// Invalid input provided.
    #[error("Invalid input: {message}")]
    InvalidInput {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
    },

    /// Sync operation failed.
    #[error("Sync error: {message}")]
    Sync { message: String },

    /// Internal application error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl AppError {
    /// Create a database error with optional operation context.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: None,
        }
    }

    /// Create a database error with operation context.
    pub fn database_with_op(message: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            operation: Some(operation.into()),
        }
    }

    /// Create a GitHub API error.
    pub fn github_api(message: impl Into<String>) -> Self {
        Self::GitHubApi {
            message: message.into(),
            status_code: None,
            endpoint: None,
        }
    }

    /// Create a GitHub API error with status code and endpoint.
    pub fn github_api_full(
        message: impl Into<String>,
        status_code: u16,
        endpoint: impl Into<String>,
    ) -> Self {
        Self::GitHubApi {
            message: message.into(),
            status_code: Some(status_code),
            endpoint: Some(endpoint.into()),
        }
    }

    pub fn server(message: impl Into<String>, status_code: u16) -> Self {
        Self::Server {
            message: message.into(),
            status_code,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
            repository_id: None,
        }
    }

    /// Create an unauthorized error tied to a registered repository.
    pub fn unauthorized_for_repository(message: impl Into<String>, repository_id: i64) -> Self {
        Self::Unauthorized {
            message: message.into(),
            repository_id: Some(repository_id),
        }
    }

    /// Create an empty-result error.
    pub fn empty(resource: impl Into<String>) -> Self {
        Self::Empty {
            resource: resource.into(),
        }
    }

    pub fn crypto(message: impl Into<String>) -> Self {
        Self::Crypto {
            message: message.into(),
        }
    }

    /// Create a credential storage error.
    pub fn credential_storage(message: impl Into<String>) -> Self {
        Self::CredentialStorage {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: None,
        }
    }

    /// Create a not found error with ID.
    pub fn not_found_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: None,
        }
    }

    /// Create an invalid input error with field name.
    pub fn invalid_input_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a sync error.
    pub fn sync(message: impl Into<String>) -> Self {
        Self::Sync {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this is the "no data" signal.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    /// Check if this is an unauthorized error.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Attach a repository id to an unauthorized error; other variants pass through.
    pub fn for_repository(self, id: i64) -> Self {
        match self {
            Self::Unauthorized { message, .. } => Self::unauthorized_for_repository(message, id),
            other => other,
        }
    }

    /// Classify this error for the presentation layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } => ErrorKind::NoInternet,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Empty { .. } => ErrorKind::Empty,
            Self::Server { .. } => ErrorKind::ServerError,
            Self::Internal { .. } => ErrorKind::Unknown,
            Self::Database { .. }
            | Self::GitHubApi { .. }
            | Self::Crypto { .. }
            | Self::CredentialStorage { .. }
            | Self::Config { .. }
            | Self::NotFound { .. }
            | Self::InvalidInput { .. }
            | Self::Sync { .. } => ErrorKind::Error,
        }
    }
}

// Conversions from common error types

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        Self::database(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("Request timed out")
        } else if err.is_connect() {
            Self::network("Failed to connect to server")
        } else if err.is_decode() {
            Self::internal(format!("Failed to decode response: {}", err))
        } else if err.is_status() {
            Self::github_api(format!("HTTP error: {}", err))
        } else {
            Self::network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {}", err))
    }
}

impl From<crate::db::DbError> for AppError {
    fn from(err: crate::db::DbError) -> Self {
        Self::database(err.to_string())
    }
}
