use anyhow::{bail, Context, Result};
use cron::Schedule;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://groupietrackers.herokuapp.com/api/artists";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub source: SourceConfig,
    pub web: WebConfig,
    pub cache: CacheConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Artist listing endpoint
    pub base_url: String,
    /// Per-request timeout; must be at least 1
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Upper bound on artists whose fragments are fetched at the same time
    pub max_concurrent_artists: usize,
    /// Extra attempts per fragment fetch; 0 disables retrying
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub build_timeout_secs: u64,
    /// Six field cron expression (with seconds) for scheduled rebuilds
    pub refresh_cron: Option<String>,
    /// Exit when the startup build fails instead of serving "not ready"
    pub fail_on_startup_error: bool,
    pub startup_retry_secs: u64,
    /// Publish build progress every N joined artists
    pub progress_update_interval: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub text_match: TextMatchMode,
}

/// How the free-text search compares against names and members
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextMatchMode {
    #[default]
    Contains,
    StartsWith,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source: SourceConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                request_timeout_secs: 30,
                user_agent: format!("Groupie-Tracker/{}", env!("CARGO_PKG_VERSION")),
                max_concurrent_artists: 8,
                retry_attempts: 0,
                retry_backoff_ms: 250,
            },
            web: WebConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            cache: CacheConfig {
                build_timeout_secs: 120,
                refresh_cron: None,
                fail_on_startup_error: true,
                startup_retry_secs: 30,
                progress_update_interval: 10,
            },
            filter: FilterConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());

        let config = if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(&config_file)?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse configuration file {}", config_file))?
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(&config_file, contents)?;
            default_config
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let base_url = url::Url::parse(&self.source.base_url)
            .with_context(|| format!("Invalid source.base_url '{}'", self.source.base_url))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            bail!("source.base_url must use http or https, got '{}'", base_url.scheme());
        }
        if self.source.request_timeout_secs == 0 {
            bail!("source.request_timeout_secs must be at least 1");
        }
        if self.source.max_concurrent_artists == 0 {
            bail!("source.max_concurrent_artists must be at least 1");
        }
        if self.cache.progress_update_interval == 0 {
            bail!("cache.progress_update_interval must be at least 1");
        }
        if let Some(expression) = &self.cache.refresh_cron {
            Schedule::from_str(expression)
                .with_context(|| format!("Invalid cache.refresh_cron '{}'", expression))?;
        }
        Ok(())
    }
}

impl SourceConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

impl CacheConfig {
    /// `None` disables the build timeout
    pub fn build_timeout(&self) -> Option<Duration> {
        (self.build_timeout_secs > 0).then(|| Duration::from_secs(self.build_timeout_secs))
    }
}
