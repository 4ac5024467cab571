//! Command-line overrides for the config file
//!
//! Every flag is optional and falls back to an environment variable, then to
//! `config.toml`, then to the built-in default.

use clap::Args;
use migration_audit_core::Config;
use std::path::PathBuf;

#[derive(Args, Debug, Default)]
pub struct ApiArgs {
    /// GitHub access token
    #[arg(short = 't', long, env = "ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// GitHub API base URL
    #[arg(short = 'u', long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// Proxy URL if required
    #[arg(long, env = "PROXY_URL")]
    pub proxy_url: Option<String>,

    /// Number of items per page
    #[arg(long, env = "PAGE_SIZE")]
    pub page_size: Option<u32>,

    /// Case-insensitive title substring identifying the migration issue
    #[arg(long, env = "ISSUE_TITLE")]
    pub issue_title: Option<String>,

    /// Maximum number of attempts per request
    #[arg(long, env = "RETRY_MAX_ATTEMPTS")]
    pub retry_max_attempts: Option<u32>,

    /// Initial retry delay in milliseconds
    #[arg(long, env = "RETRY_INITIAL_DELAY")]
    pub retry_initial_delay: Option<u64>,

    /// Maximum retry delay in milliseconds
    #[arg(long, env = "RETRY_MAX_DELAY")]
    pub retry_max_delay: Option<u64>,

    /// Multiplier applied to the delay after each retry
    #[arg(long, env = "RETRY_BACKOFF_FACTOR")]
    pub retry_backoff_factor: Option<f64>,

    /// Longest rate-limit wait in seconds before a request is abandoned
    #[arg(long, env = "RETRY_RATE_LIMIT_MAX_WAIT")]
    pub retry_rate_limit_max_wait: Option<u64>,

    /// Directory for report files
    #[arg(long, env = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,
}

impl ApiArgs {
    /// Overwrite config values with the flags that were given.
    pub fn apply(&self, config: &mut Config) {
        let github = &mut config.github;
        if let Some(token) = &self.access_token {
            github.token = Some(token.clone());
        }
        if let Some(base_url) = &self.base_url {
            github.base_url = base_url.clone();
        }
        if let Some(proxy_url) = &self.proxy_url {
            github.proxy_url = Some(proxy_url.clone());
        }
        if let Some(page_size) = self.page_size {
            github.page_size = page_size;
        }
        if let Some(issue_title) = &self.issue_title {
            github.issue_title = issue_title.clone();
        }

        let retry = &mut config.retry;
        if let Some(attempts) = self.retry_max_attempts {
            retry.max_attempts = attempts;
        }
        if let Some(delay) = self.retry_initial_delay {
            retry.initial_delay_ms = delay;
        }
        if let Some(delay) = self.retry_max_delay {
            retry.max_delay_ms = delay;
        }
        if let Some(factor) = self.retry_backoff_factor {
            retry.backoff_factor = factor;
        }
        if let Some(secs) = self.retry_rate_limit_max_wait {
            retry.rate_limit_max_wait_secs = secs;
        }

        if let Some(dir) = &self.output_dir {
            config.output.dir = dir.clone();
        }
    }
}
