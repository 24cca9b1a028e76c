pub mod media_search_repository;
pub mod search_cache;

pub use media_search_repository::MediaSearchRepository;
pub use search_cache::SearchCache;
