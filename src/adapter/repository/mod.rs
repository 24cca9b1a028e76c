pub mod media_search_elasticsearch;
pub mod retrying;
pub mod search_cache_redis;

pub use media_search_elasticsearch::MediaSearchElasticsearchRepository;
pub use retrying::RetryingMediaSearchRepository;
pub use search_cache_redis::RedisSearchCache;
