pub mod fingerprint;
pub mod media_url;
pub mod normalizer;
pub mod query_builder;

pub use fingerprint::cache_key;
pub use media_url::{MediaUrlBuilder, MediaUrlConfig};
pub use normalizer::HitNormalizer;
pub use query_builder::{build_query, BuiltQuery};
