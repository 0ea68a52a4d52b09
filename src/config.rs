//! Application settings.
//!
//! Settings live in `settings.json` inside the application data directory.
//! A missing file yields defaults; unknown keys are ignored and missing keys
//! fall back to their defaults so older files keep loading.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings filename inside the data directory.
const SETTINGS_FILE: &str = "settings.json";

/// Default number of pull requests requested per page.
pub const DEFAULT_PER_PAGE: u32 = 25;

/// Cached data older than this many days is reset before accumulating more.
pub const DEFAULT_RESET_AFTER_DAYS: i64 = 2;

/// GitHub connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// REST API base URL.
    pub api_url: String,

    /// GraphQL endpoint.
    pub graphql_url: String,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// User-Agent header (GitHub rejects requests without one).
    pub user_agent: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            graphql_url: "https://api.github.com/graphql".to_string(),
            timeout_secs: 30,
            user_agent: concat!("pr-pulse/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Pull request sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Page size for the pulls listing (GitHub caps this at 100).
    pub per_page: u32,

    /// Only pull requests targeting this branch; `None` means any.
    pub base_branch: Option<String>,

    /// Pull request state filter: `open`, `closed` or `all`.
    pub state: String,

    /// Sort field: `created`, `updated`, `popularity`, `long-running`.
    pub sort: String,

    /// Sort direction: `asc` or `desc`.
    pub direction: String,

    /// Upper bound on pages fetched by one reconciliation.
    pub max_pages: u32,

    /// Days after which cached pull requests are discarded.
    pub reset_after_days: i64,

    /// Pull requests processed concurrently during review fan-out.
    pub review_concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            per_page: DEFAULT_PER_PAGE,
            base_branch: None,
            state: "closed".to_string(),
            sort: "created".to_string(),
            direction: "desc".to_string(),
            max_pages: 100,
            reset_after_days: DEFAULT_RESET_AFTER_DAYS,
            review_concurrency: 8,
        }
    }
}

/// Where the token encryption key comes from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionSettings {
    /// Keychain service name.
    pub keychain_service: String,

    /// Keychain account name.
    pub keychain_account: String,

    /// Base64 encoded 32-byte key. Overrides the keychain when set.
    pub key_base64: Option<String>,
}

impl Default for EncryptionSettings {
    fn default() -> Self {
        Self {
            keychain_service: "pr-pulse".to_string(),
            keychain_account: "token-encryption-key".to_string(),
            key_base64: None,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub github: GitHubSettings,
    pub sync: SyncConfig,
    pub encryption: EncryptionSettings,
}

impl Settings {
    /// Path of the settings file for a data directory.
    pub fn path(data_dir: &Path) -> PathBuf {
        data_dir.join(SETTINGS_FILE)
    }

    /// Load settings from the data directory, using defaults if absent.
    pub fn load(data_dir: &Path) -> Result<Self, AppError> {
        let path = Self::path(data_dir);
        if !path.exists() {
            log::debug!("[config] No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)
            .map_err(|e| AppError::config(format!("Failed to read {}: {}", path.display(), e)))?;
        let settings: Self = serde_json::from_str(&raw)
            .map_err(|e| AppError::config(format!("Invalid {}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Persist settings to the data directory.
    pub fn save(&self, data_dir: &Path) -> Result<(), AppError> {
        self.validate()?;
        std::fs::create_dir_all(data_dir)
            .map_err(|e| AppError::config(format!("Failed to create data directory: {}", e)))?;

        let path = Self::path(data_dir);
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, raw)
            .map_err(|e| AppError::config(format!("Failed to write {}: {}", path.display(), e)))
    }

    /// Reject values the sync engine cannot work with.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.sync.per_page == 0 || self.sync.per_page > 100 {
            return Err(AppError::invalid_input_field(
                "per_page must be between 1 and 100",
                "sync.per_page",
            ));
        }
        if self.sync.max_pages == 0 {
            return Err(AppError::invalid_input_field(
                "max_pages must be at least 1",
                "sync.max_pages",
            ));
        }
        if self.sync.review_concurrency == 0 {
            return Err(AppError::invalid_input_field(
                "review_concurrency must be at least 1",
                "sync.review_concurrency",
            ));
        }
        if self.sync.reset_after_days < 0 {
            return Err(AppError::invalid_input_field(
                "reset_after_days cannot be negative",
                "sync.reset_after_days",
            ));
        }
        Ok(())
    }
}
