use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::entity::{MediaSearchResponse, SearchRequest};
use crate::domain::repository::{MediaSearchRepository, SearchCache};
use crate::domain::service::{build_query, cache_key, HitNormalizer, MediaUrlBuilder};
use crate::error::StoreError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SearchMediaError {
    /// リトライ上限内にストアへ到達できなかった。
    #[error("index store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("index store query failed: {0}")]
    StoreQuery(String),
}

impl From<StoreError> for SearchMediaError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(_)
            | StoreError::Timeout(_)
            | StoreError::RetriesExhausted { .. } => {
                SearchMediaError::StoreUnavailable(err.to_string())
            }
            StoreError::Rejected { .. } | StoreError::MalformedResponse(_) => {
                SearchMediaError::StoreQuery(err.to_string())
            }
        }
    }
}

/// SearchMediaUseCase はキャッシュ参照 → ストア検索 → 正規化 → キャッシュ書き込みを行う。
/// キャッシュの障害はミス扱いとし、検索結果には影響させない。
pub struct SearchMediaUseCase {
    repo: Arc<dyn MediaSearchRepository>,
    cache: Arc<dyn SearchCache>,
    normalizer: HitNormalizer,
    cache_ttl: Duration,
}

impl SearchMediaUseCase {
    pub fn new(
        repo: Arc<dyn MediaSearchRepository>,
        cache: Arc<dyn SearchCache>,
        url_builder: Arc<MediaUrlBuilder>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            cache,
            normalizer: HitNormalizer::new(url_builder),
            cache_ttl,
        }
    }

    pub async fn execute(
        &self,
        request: &SearchRequest,
    ) -> Result<MediaSearchResponse, SearchMediaError> {
        let key = cache_key(request);

        if let Some(cached) = self.lookup(&key).await {
            debug!(cache_key = %key, "search cache hit");
            return Ok(cached);
        }

        let query = build_query(request);
        let hits = self.repo.search(&query).await?;
        let results = self.normalizer.normalize_all(&hits.hits);
        let response = MediaSearchResponse::new(hits.total, results, request.page, request.limit);

        self.store(&key, &response).await;
        Ok(response)
    }

    async fn lookup(&self, key: &str) -> Option<MediaSearchResponse> {
        match self.cache.get(key).await {
            Ok(Some(payload)) => match serde_json::from_str(&payload) {
                Ok(response) => Some(response),
                Err(e) => {
                    warn!(cache_key = %key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(cache_key = %key, error = %e, "search cache read failed, treating as miss");
                None
            }
        }
    }

    async fn store(&self, key: &str, response: &MediaSearchResponse) {
        let payload = match serde_json::to_string(response) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to encode search response for cache");
                return;
            }
        };
        if let Err(e) = self.cache.set(key, &payload, self.cache_ttl).await {
            warn!(cache_key = %key, error = %e, "search cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::domain::entity::{MediaResult, RawHit, SearchHits, SearchLimits};
    use crate::domain::repository::media_search_repository::MockMediaSearchRepository;
    use crate::domain::repository::search_cache::MockSearchCache;
    use crate::error::CacheError;

    fn request() -> SearchRequest {
        SearchRequest::new("sunset", &SearchLimits::default())
    }

    fn store_hits() -> SearchHits {
        let source = json!({ "bildnummer": "108420352", "db": "st", "suchtext": "Sunset" });
        SearchHits {
            total: 3017,
            hits: vec![RawHit::new(
                Some("doc-1".to_string()),
                source.as_object().cloned().unwrap(),
            )],
        }
    }

    fn use_case(repo: MockMediaSearchRepository, cache: MockSearchCache) -> SearchMediaUseCase {
        SearchMediaUseCase::new(
            Arc::new(repo),
            Arc::new(cache),
            Arc::new(MediaUrlBuilder::default()),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_miss_queries_store_and_writes_cache() {
        let mut repo = MockMediaSearchRepository::new();
        repo.expect_search()
            .times(1)
            .returning(|_| Ok(store_hits()));

        let expected_key = cache_key(&request());
        let mut cache = MockSearchCache::new();
        let key = expected_key.clone();
        cache
            .expect_get()
            .withf(move |k| k.to_string() == key)
            .times(1)
            .returning(|_| Ok(None));
        cache
            .expect_set()
            .withf(move |k, v, ttl| {
                k.to_string() == expected_key
                    && v.contains("\"doc-1\"")
                    && *ttl == Duration::from_secs(3600)
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let response = use_case(repo, cache).execute(&request()).await.unwrap();
        assert_eq!(response.total_results, 3017);
        assert_eq!(response.results.len(), 1);
        assert_eq!(
            response.results[0].media_url,
            "https://www.imago-images.de/bild/st/0108420352/s.jpg"
        );
        assert!(response.has_next);
        assert!(!response.has_previous);
    }

    #[tokio::test]
    async fn test_hit_skips_store() {
        let mut repo = MockMediaSearchRepository::new();
        repo.expect_search().never();

        let cached = MediaSearchResponse::new(
            1,
            vec![MediaResult {
                id: "cached".to_string(),
                ..Default::default()
            }],
            1,
            5,
        );
        let payload = serde_json::to_string(&cached).unwrap();
        let mut cache = MockSearchCache::new();
        cache
            .expect_get()
            .returning(move |_| Ok(Some(payload.clone())));
        cache.expect_set().never();

        let response = use_case(repo, cache).execute(&request()).await.unwrap();
        assert_eq!(response, cached);
    }

    #[tokio::test]
    async fn test_failing_cache_does_not_fail_search() {
        let mut repo = MockMediaSearchRepository::new();
        repo.expect_search()
            .times(1)
            .returning(|_| Ok(store_hits()));

        let mut cache = MockSearchCache::new();
        cache
            .expect_get()
            .returning(|_| Err(CacheError::Unavailable("connection refused".to_string())));
        cache
            .expect_set()
            .returning(|_, _, _| Err(CacheError::Timeout(Duration::from_millis(500))));

        let response = use_case(repo, cache).execute(&request()).await.unwrap();
        assert_eq!(response.total_results, 3017);
        assert_eq!(response.results[0].id, "doc-1");
    }

    #[tokio::test]
    async fn test_corrupt_cache_entry_treated_as_miss() {
        let mut repo = MockMediaSearchRepository::new();
        repo.expect_search()
            .times(1)
            .returning(|_| Ok(store_hits()));

        let mut cache = MockSearchCache::new();
        cache
            .expect_get()
            .returning(|_| Ok(Some("not json".to_string())));
        cache.expect_set().times(1).returning(|_, _, _| Ok(()));

        let response = use_case(repo, cache).execute(&request()).await.unwrap();
        assert_eq!(response.results.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_result() {
        let mut repo = MockMediaSearchRepository::new();
        repo.expect_search()
            .returning(|_| Ok(SearchHits::default()));
        let mut cache = MockSearchCache::new();
        cache.expect_get().returning(|_| Ok(None));
        cache.expect_set().returning(|_, _, _| Ok(()));

        let response = use_case(repo, cache).execute(&request()).await.unwrap();
        assert_eq!(response.total_results, 0);
        assert!(response.results.is_empty());
        assert!(!response.has_next);
        assert!(!response.has_previous);
    }

    #[tokio::test]
    async fn test_store_errors_mapped() {
        let cases = vec![
            (
                StoreError::RetriesExhausted {
                    attempts: 3,
                    last_error: "timeout".to_string(),
                },
                true,
            ),
            (StoreError::Timeout(Duration::from_secs(10)), true),
            (
                StoreError::Rejected {
                    status: Some(400),
                    reason: "parse_exception".to_string(),
                },
                false,
            ),
            (StoreError::MalformedResponse("eof".to_string()), false),
        ];

        for (store_err, unavailable) in cases {
            let mut repo = MockMediaSearchRepository::new();
            let err = store_err.clone();
            repo.expect_search().returning(move |_| Err(err.clone()));
            let mut cache = MockSearchCache::new();
            cache.expect_get().returning(|_| Ok(None));
            cache.expect_set().never();

            let result = use_case(repo, cache).execute(&request()).await;
            match result {
                Err(SearchMediaError::StoreUnavailable(_)) => assert!(unavailable, "{store_err:?}"),
                Err(SearchMediaError::StoreQuery(_)) => assert!(!unavailable, "{store_err:?}"),
                Ok(_) => panic!("expected error for {store_err:?}"),
            }
        }
    }
}
