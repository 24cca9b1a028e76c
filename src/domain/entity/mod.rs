pub mod media;
pub mod search_request;

pub use media::{MediaResult, MediaSearchResponse, RawHit, SearchHits};
pub use search_request::{
    Bounds, SearchField, SearchLimits, SearchParams, SearchRequest, SortField, SortOrder,
    DEFAULT_MAX_RESULT_WINDOW,
};
