//! Configuration management for Repomate.
//!
//! Handles loading and saving configuration from TOML files, with
//! environment overrides for the service endpoints.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::retry::RetryConfig;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Service endpoints
    pub endpoints: EndpointsConfig,

    /// HTTP client settings
    pub http: HttpConfig,

    /// Tool workflow settings
    pub workflow: WorkflowConfig,

    /// Branch discovery retry policy
    pub retry: RetrySettings,

    /// Credential persistence
    pub session: SessionConfig,
}

/// Base URLs of the collaborating services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Account service (login, signup, current session)
    pub auth_url: String,

    /// Repository analysis service (branches, Q&A, README, summaries)
    pub api_url: String,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout in seconds. Generation calls can take minutes.
    pub timeout_secs: u64,
}

/// Tool workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Quiet period before branch discovery runs, in milliseconds
    pub debounce_ms: u64,

    /// How long copy/download notices stay visible, in milliseconds
    pub notice_ms: u64,

    /// Where downloaded artifacts are written (`~` is expanded)
    pub download_dir: String,
}

/// Branch discovery retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Retries after an empty branch list (0 disables retrying)
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,

    /// Upper bound on the delay between retries, in milliseconds
    pub max_delay_ms: u64,
}

/// Where the bearer credential is kept between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStoreKind {
    /// A file in the data directory
    #[default]
    File,
    /// The OS keychain (requires the `secrets` feature)
    Keyring,
}

/// Credential persistence settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Backing store for the session token
    pub store: TokenStoreKind,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.repomate.toml` in current directory
    /// 2. `~/.config/repomate/config.toml`
    /// 3. Falls back to defaults
    ///
    /// Environment overrides are applied afterwards.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::load_from_disk()?;
        config.apply_env();
        Ok(config)
    }

    fn load_from_disk() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".repomate.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(global_config) = Self::config_path() {
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Override endpoints and download directory from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("REPOMATE_AUTH_URL") {
            if !url.is_empty() {
                self.endpoints.auth_url = url;
            }
        }
        if let Ok(url) = std::env::var("REPOMATE_API_URL") {
            if !url.is_empty() {
                self.endpoints.api_url = url;
            }
        }
        if let Ok(dir) = std::env::var("REPOMATE_DOWNLOAD_DIR") {
            if !dir.is_empty() {
                self.workflow.download_dir = dir;
            }
        }
    }

    /// Save configuration to the global config file.
    pub fn save(&self) -> anyhow::Result<()> {
        let config_dir = Self::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        std::fs::create_dir_all(&config_dir)?;

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_dir.join("config.toml"), content)?;

        Ok(())
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("repomate"))
    }

    /// Get the global config file path.
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|d| d.join("config.toml"))
    }

    /// Get the data directory path (for the session file).
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("repomate"))
    }
}

impl HttpConfig {
    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl WorkflowConfig {
    /// Debounce delay as a duration.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Notice lifetime as a duration.
    pub fn notice_ttl(&self) -> Duration {
        Duration::from_millis(self.notice_ms)
    }

    /// Download directory with `~` and environment variables expanded.
    pub fn download_path(&self) -> PathBuf {
        match shellexpand::full(&self.download_dir) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(_) => PathBuf::from(shellexpand::tilde(&self.download_dir).as_ref()),
        }
    }
}

impl RetrySettings {
    /// Build the runtime retry policy.
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            ..RetryConfig::branch_discovery()
        }
    }
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            auth_url: "http://localhost:5000".to_string(),
            api_url: "http://localhost:5001".to_string(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self { debounce_ms: 600, notice_ms: 3000, download_dir: ".".to_string() }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        let policy = RetryConfig::branch_discovery();
        Self {
            max_attempts: policy.max_attempts,
            initial_delay_ms: policy.initial_delay.as_millis() as u64,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}
