use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

/// SearchCache は検索レスポンスを文字列として保持するキャッシュストア。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SearchCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
    async fn ping(&self) -> bool;
}
