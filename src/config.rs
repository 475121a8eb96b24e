//! Configuration for the ball-by-ball pipeline.

use serde::{Deserialize, Serialize};

/// Blob storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for raw per-match JSON documents
    #[serde(default = "default_raw_root")]
    pub raw_root: String,
    /// Root directory for flattened ball-by-ball output
    #[serde(default = "default_output_root")]
    pub output_root: String,
}

fn default_raw_root() -> String {
    "json_data".to_string()
}

fn default_output_root() -> String {
    "bbb_data".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            raw_root: default_raw_root(),
            output_root: default_output_root(),
        }
    }
}

/// Crawler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// Max in-flight sub-resource fetches
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Max in-flight discovery (fixture list) fetches
    #[serde(default = "default_discovery_concurrency")]
    pub discovery_concurrency: usize,
    /// Delay held after each discovery fetch, before the permit is released
    #[serde(default = "default_discovery_delay_secs")]
    pub discovery_delay_secs: u64,
    /// First year of the discovery window (inclusive)
    #[serde(default = "default_first_year")]
    pub first_year: i32,
    /// Last year of the discovery window (inclusive)
    #[serde(default = "default_last_year")]
    pub last_year: i32,
    /// Only fixtures starting strictly after this date (YYYY-MM-DD) are kept
    #[serde(default = "default_since_date")]
    pub since_date: String,
    /// Cap on pending sub-resource requests generated per run
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,
    /// Fetch batch size (memory bound + progress logging granularity)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Proxy URL template; `{i}` is replaced with the pool index
    #[serde(default)]
    pub proxy_template: Option<String>,
    /// Proxy pool size
    #[serde(default = "default_proxy_count")]
    pub proxy_count: usize,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_concurrency() -> usize {
    300
}

fn default_discovery_concurrency() -> usize {
    5
}

fn default_discovery_delay_secs() -> u64 {
    3
}

fn default_first_year() -> i32 {
    2025
}

fn default_last_year() -> i32 {
    2025
}

fn default_since_date() -> String {
    "2025-05-01".to_string()
}

fn default_max_pending() -> usize {
    1000
}

fn default_batch_size() -> usize {
    1000
}

fn default_proxy_count() -> usize {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            discovery_concurrency: default_discovery_concurrency(),
            discovery_delay_secs: default_discovery_delay_secs(),
            first_year: default_first_year(),
            last_year: default_last_year(),
            since_date: default_since_date(),
            max_pending: default_max_pending(),
            batch_size: default_batch_size(),
            proxy_template: None,
            proxy_count: default_proxy_count(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Transform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Worker pool size; defaults to core count minus one
    #[serde(default)]
    pub workers: Option<usize>,
    /// Progress log interval in completed units
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,
}

fn default_progress_interval() -> usize {
    100
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            workers: None,
            progress_interval: default_progress_interval(),
        }
    }
}

/// Downstream trigger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Endpoint POSTed after a successful aucb crawl
    #[serde(default)]
    pub transform_aucb_url: Option<String>,
    /// Endpoint POSTed after a successful cricinfo crawl
    #[serde(default)]
    pub transform_cricinfo_url: Option<String>,
    /// Trigger request timeout in seconds
    #[serde(default = "default_trigger_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_trigger_timeout_secs() -> u64 {
    600
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            transform_aucb_url: None,
            transform_cricinfo_url: None,
            timeout_secs: default_trigger_timeout_secs(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default)]
    pub trigger: TriggerConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            // Start with defaults
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // Add config file if exists
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables (CRICKET_CRAWLER_CONCURRENCY, etc.)
            .add_source(
                config::Environment::with_prefix("CRICKET")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
