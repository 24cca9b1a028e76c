use std::time::Duration;

use serde::Deserialize;

use crate::domain::entity::{SearchLimits, DEFAULT_MAX_RESULT_WINDOW};
use crate::domain::service::MediaUrlConfig;
use crate::infrastructure::retry::RetryConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/config.yaml";

/// Application configuration for media search server.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    #[serde(default)]
    pub server: ServerConfig,
    pub elasticsearch: ElasticsearchConfig,
    #[serde(default)]
    pub retry: RetryPolicyConfig,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub media_url: MediaUrlConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// YAML ファイルを読み込み、環境変数による接続情報の上書きを適用する。
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut cfg = Self::from_yaml(&content)?;
        cfg.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        let cfg: Config = serde_yaml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// apply_env_overrides は接続先と認証情報を環境変数で上書きする。
    /// 空文字の値は無視する。
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("ES_URL") {
            self.elasticsearch.url = url;
        }
        if let Some(username) = get("ES_USERNAME") {
            self.elasticsearch.username = username;
        }
        if let Some(password) = get("ES_PASSWORD") {
            self.elasticsearch.password = password;
        }
        if let Some(url) = get("REDIS_URL") {
            match self.redis.as_mut() {
                Some(redis) => redis.url = url,
                None => {
                    self.redis = Some(RedisConfig {
                        url,
                        key_prefix: default_key_prefix(),
                        operation_timeout_ms: default_operation_timeout_ms(),
                    })
                }
            }
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.search.default_page_size == 0 || self.search.max_page_size == 0 {
            anyhow::bail!("search page sizes must be positive");
        }
        if self.search.default_page_size > self.search.max_page_size {
            anyhow::bail!(
                "search.default_page_size ({}) exceeds search.max_page_size ({})",
                self.search.default_page_size,
                self.search.max_page_size
            );
        }
        if self.search.max_result_window < u64::from(self.search.max_page_size) {
            anyhow::bail!(
                "search.max_result_window ({}) is smaller than search.max_page_size ({})",
                self.search.max_result_window,
                self.search.max_page_size
            );
        }
        if self.retry.max_attempts == 0 {
            anyhow::bail!("retry.max_attempts must be at least 1");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// ElasticsearchConfig はインデックスストア接続の設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct ElasticsearchConfig {
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,
    #[serde(default = "default_verify_certs")]
    pub verify_certs: bool,
}

impl ElasticsearchConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

fn default_index() -> String {
    "imago".to_string()
}

fn default_request_timeout_seconds() -> u64 {
    30
}

fn default_verify_certs() -> bool {
    true
}

/// RetryPolicyConfig はストア呼び出しのリトライ方針。
#[derive(Debug, Clone, Deserialize)]
pub struct RetryPolicyConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default = "default_jitter")]
    pub jitter: bool,
    /// 1 回の試行の期限 (接続確立を含む)。
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            jitter: default_jitter(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
        }
    }
}

impl RetryPolicyConfig {
    pub fn to_retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
            jitter: self.jitter,
        }
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_max_delay_ms() -> u64 {
    2000
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

fn default_attempt_timeout_ms() -> u64 {
    10_000
}

/// RedisConfig は Redis 接続の設定を表す。未設定時はインメモリキャッシュを使う。
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,
}

impl RedisConfig {
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

fn default_key_prefix() -> String {
    String::new()
}

fn default_operation_timeout_ms() -> u64 {
    500
}

/// CacheConfig は検索結果キャッシュの設定を表す。
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// インメモリフォールバックキャッシュの最大エントリ数。
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_max_entries() -> u64 {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    /// ストア側の index.max_result_window に合わせる。
    #[serde(default = "default_max_result_window")]
    pub max_result_window: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            max_result_window: default_max_result_window(),
        }
    }
}

impl SearchConfig {
    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            default_page_size: self.default_page_size,
            max_page_size: self.max_page_size,
            max_result_window: self.max_result_window,
        }
    }
}

fn default_page_size() -> u32 {
    5
}

fn default_max_page_size() -> u32 {
    100
}

fn default_max_result_window() -> u64 {
    DEFAULT_MAX_RESULT_WINDOW
}

/// LoggingConfig はログ出力の設定を表す。format が "text" 以外なら JSON。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}
