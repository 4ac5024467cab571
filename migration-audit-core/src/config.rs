//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/migration-audit/config.toml`.
//! Every section is optional; command-line flags override file values.
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/migration-audit/` (~/.config/migration-audit/)
//! - State/Logs: `$XDG_STATE_HOME/migration-audit/` (~/.local/state/migration-audit/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const APP_DIR: &str = "migration-audit";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// GitHub API access
    #[serde(default)]
    pub github: GitHubConfig,

    /// Retry policy for API calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Report output
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// GitHub API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GitHubConfig {
    /// API root; change for GitHub Enterprise Server
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Personal access or installation token
    pub token: Option<String>,

    /// HTTP(S) proxy for all requests
    pub proxy_url: Option<String>,

    /// Items requested per page (1..=100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Case-insensitive substring identifying the migration issue by title
    #[serde(default = "default_issue_title")]
    pub issue_title: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            proxy_url: None,
            page_size: default_page_size(),
            issue_title: default_issue_title(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.github.com".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_issue_title() -> String {
    "Migration".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Exponential backoff for transient API failures
#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Longest server-requested rate-limit wait honoured before giving up.
    /// Such waits do not count against `max_attempts`.
    #[serde(default = "default_rate_limit_max_wait")]
    pub rate_limit_max_wait_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay(),
            max_delay_ms: default_max_delay(),
            backoff_factor: default_backoff_factor(),
            rate_limit_max_wait_secs: default_rate_limit_max_wait(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> u64 {
    1000
}

fn default_max_delay() -> u64 {
    30000
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_rate_limit_max_wait() -> u64 {
    3600
}

impl RetryConfig {
    /// Delay before retry number `retry` (1-based), capped at `max_delay_ms`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1) as i32;
        let millis = self.initial_delay_ms as f64 * self.backoff_factor.powi(exponent);
        Duration::from_millis(millis.min(self.max_delay_ms as f64) as u64)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn rate_limit_max_wait(&self) -> Duration {
        Duration::from_secs(self.rate_limit_max_wait_secs)
    }
}

/// Report output configuration
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    /// Directory receiving CSV/JSON reports; relative paths resolve against the cwd
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.github.page_size == 0 || self.github.page_size > 100 {
            return Err(Error::Config(
                "github.page_size must be between 1 and 100".to_string(),
            ));
        }
        if self.github.base_url.trim().is_empty() {
            return Err(Error::Config("github.base_url must not be empty".to_string()));
        }
        if self.github.issue_title.trim().is_empty() {
            return Err(Error::Config(
                "github.issue_title must not be empty".to_string(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.retry.backoff_factor < 1.0 {
            return Err(Error::Config(
                "retry.backoff_factor must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/migration-audit/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join(APP_DIR).join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/migration-audit/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.base_url, "https://api.github.com");
        assert_eq!(config.github.page_size, 10);
        assert_eq!(config.github.issue_title, "Migration");
        assert!(config.github.token.is_none());
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.rate_limit_max_wait_secs, 3600);
        assert_eq!(config.output.dir, PathBuf::from("output"));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[github]
base_url = "https://ghe.example.com/api/v3"
page_size = 50
issue_title = "Migration Log"

[retry]
max_attempts = 5
backoff_factor = 1.5

[output]
dir = "/tmp/reports"

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.github.base_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.github.page_size, 50);
        assert_eq!(config.github.issue_title, "Migration Log");
        assert_eq!(config.github.timeout_secs, 30);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 1000);
        assert_eq!(config.output.dir, PathBuf::from("/tmp/reports"));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_validation() {
        let mut config = Config::default();
        config.github.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.github.page_size = 101;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.retry.backoff_factor = 0.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.github.issue_title = "   ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("issue_title"), "{}", err);
    }

    #[test]
    fn test_retry_delays() {
        let retry = RetryConfig::default();
        assert_eq!(retry.delay_for(1), Duration::from_millis(1000));
        assert_eq!(retry.delay_for(2), Duration::from_millis(2000));
        assert_eq!(retry.delay_for(3), Duration::from_millis(4000));
        assert_eq!(retry.delay_for(10), Duration::from_millis(30000));
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = Config::load_from(Path::new("/nonexistent/migration-audit.toml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
