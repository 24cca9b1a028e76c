use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::entity::SearchHits;
use crate::domain::repository::MediaSearchRepository;
use crate::domain::service::BuiltQuery;
use crate::error::StoreError;
use crate::infrastructure::retry::{with_retry, RetryConfig, RetryError};

/// RetryingMediaSearchRepository は検索呼び出しに試行ごとの期限とリトライを付与するデコレータ。
/// 一時障害 (接続失敗・タイムアウト) のみ再試行し、それ以外は即座に返す。
pub struct RetryingMediaSearchRepository {
    inner: Arc<dyn MediaSearchRepository>,
    retry: RetryConfig,
    attempt_timeout: Duration,
}

impl RetryingMediaSearchRepository {
    pub fn new(
        inner: Arc<dyn MediaSearchRepository>,
        retry: RetryConfig,
        attempt_timeout: Duration,
    ) -> Self {
        Self {
            inner,
            retry,
            attempt_timeout,
        }
    }
}

#[async_trait]
impl MediaSearchRepository for RetryingMediaSearchRepository {
    async fn search(&self, query: &BuiltQuery) -> Result<SearchHits, StoreError> {
        let inner = &self.inner;
        let deadline = self.attempt_timeout;
        let result = with_retry(&self.retry, StoreError::is_transient, move || async move {
            match tokio::time::timeout(deadline, inner.search(query)).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(deadline)),
            }
        })
        .await;

        result.map_err(|e| match e {
            RetryError::Permanent(err) => err,
            RetryError::ExhaustedRetries {
                attempts,
                last_error,
            } => StoreError::RetriesExhausted {
                attempts,
                last_error: last_error.to_string(),
            },
        })
    }

    async fn ping(&self) -> bool {
        tokio::time::timeout(self.attempt_timeout, self.inner.ping())
            .await
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::domain::entity::{SearchLimits, SearchRequest};
    use crate::domain::repository::media_search_repository::MockMediaSearchRepository;
    use crate::domain::service::build_query;

    fn fast_retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            multiplier: 2.0,
            jitter: false,
        }
    }

    fn query() -> BuiltQuery {
        build_query(&SearchRequest::new("sunset", &SearchLimits::default()))
    }

    fn hits(total: u64) -> SearchHits {
        SearchHits {
            total,
            hits: vec![],
        }
    }

    #[tokio::test]
    async fn test_transient_failures_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let mut mock = MockMediaSearchRepository::new();
        mock.expect_search().times(3).returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StoreError::Unavailable("connection refused".into()))
            } else {
                Ok(hits(42))
            }
        });

        let repo = RetryingMediaSearchRepository::new(
            Arc::new(mock),
            fast_retry(),
            Duration::from_secs(1),
        );
        let result = repo.search(&query()).await.unwrap();
        assert_eq!(result.total, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_returned_immediately() {
        let mut mock = MockMediaSearchRepository::new();
        mock.expect_search().times(1).returning(|_| {
            Err(StoreError::Rejected {
                status: Some(400),
                reason: "parse_exception".into(),
            })
        });

        let repo = RetryingMediaSearchRepository::new(
            Arc::new(mock),
            fast_retry(),
            Duration::from_secs(1),
        );
        let err = repo.search(&query()).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: Some(400), .. }));
    }

    #[tokio::test]
    async fn test_exhaustion_reported() {
        let mut mock = MockMediaSearchRepository::new();
        mock.expect_search()
            .times(3)
            .returning(|_| Err(StoreError::Unavailable("connection refused".into())));

        let repo = RetryingMediaSearchRepository::new(
            Arc::new(mock),
            fast_retry(),
            Duration::from_secs(1),
        );
        match repo.search(&query()).await.unwrap_err() {
            StoreError::RetriesExhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    struct SlowRepository {
        calls: AtomicU32,
    }

    #[async_trait]
    impl MediaSearchRepository for SlowRepository {
        async fn search(&self, _query: &BuiltQuery) -> Result<SearchHits, StoreError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
            Ok(hits(1))
        }

        async fn ping(&self) -> bool {
            tokio::time::sleep(Duration::from_secs(5)).await;
            true
        }
    }

    #[tokio::test]
    async fn test_attempt_deadline_is_retried() {
        let slow = Arc::new(SlowRepository {
            calls: AtomicU32::new(0),
        });
        let repo = RetryingMediaSearchRepository::new(
            slow.clone(),
            fast_retry(),
            Duration::from_millis(50),
        );
        let result = repo.search(&query()).await.unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(slow.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_ping_deadline() {
        let repo = RetryingMediaSearchRepository::new(
            Arc::new(SlowRepository {
                calls: AtomicU32::new(0),
            }),
            fast_retry(),
            Duration::from_millis(50),
        );
        assert!(!repo.ping().await);
    }
}
