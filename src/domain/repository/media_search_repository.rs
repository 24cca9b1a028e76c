use async_trait::async_trait;

use crate::domain::entity::SearchHits;
use crate::domain::service::query_builder::BuiltQuery;
use crate::error::StoreError;

/// MediaSearchRepository はインデックスストアへの検索とヘルスチェックを抽象化する。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaSearchRepository: Send + Sync {
    async fn search(&self, query: &BuiltQuery) -> Result<SearchHits, StoreError>;
    async fn ping(&self) -> bool;
}
