use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError, RedisResult};
use tracing::debug;

use crate::domain::repository::SearchCache;
use crate::error::CacheError;

/// 失敗時は即座に 1 回だけ再試行する。
const ATTEMPTS_PER_OPERATION: u32 = 2;

/// RedisSearchCache は Redis ベースの検索結果キャッシュ。
///
/// キー設計:
///   - `{key_prefix}media-search:v1:{sha256}`: シリアライズ済みレスポンス JSON
pub struct RedisSearchCache {
    conn: ConnectionManager,
    key_prefix: String,
    operation_timeout: Duration,
}

impl RedisSearchCache {
    pub fn new(conn: ConnectionManager, key_prefix: &str, operation_timeout: Duration) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.to_string(),
            operation_timeout,
        }
    }

    fn prefixed_key(&self, key: &str) -> String {
        prefixed_key(&self.key_prefix, key)
    }

    /// `op` を操作期限付きで実行する。ConnectionManager は切断後バックグラウンドで再接続するため、
    /// 2 回目の試行は通常新しい接続で行われる。
    async fn run<T, F, Fut>(&self, op_name: &'static str, op: F) -> Result<T, CacheError>
    where
        F: Fn(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        run_with_reconnect(op_name, self.operation_timeout, || op(self.conn.clone())).await
    }
}

/// run_with_reconnect は操作ごとの期限を付けて最大 ATTEMPTS_PER_OPERATION 回実行する。
async fn run_with_reconnect<T, F, Fut>(
    op_name: &'static str,
    timeout: Duration,
    mut op: F,
) -> Result<T, CacheError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RedisResult<T>>,
{
    let mut attempt = 1;
    loop {
        let err = match tokio::time::timeout(timeout, op()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => map_redis_error(e),
            Err(_) => CacheError::Timeout(timeout),
        };
        debug!(op = op_name, attempt, error = %err, "redis operation failed");
        if attempt >= ATTEMPTS_PER_OPERATION {
            return Err(err);
        }
        attempt += 1;
    }
}

#[async_trait]
impl SearchCache for RedisSearchCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let full_key = self.prefixed_key(key);
        self.run("GET", |mut conn| {
            let full_key = full_key.clone();
            async move {
                let value: RedisResult<Option<String>> = conn.get(full_key).await;
                value
            }
        })
        .await
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let full_key = self.prefixed_key(key);
        // SETEX は 0 秒を受け付けないため最小 1 秒に丸める。
        let seconds = ttl.as_secs().max(1);
        self.run("SETEX", |mut conn| {
            let full_key = full_key.clone();
            let value = value.to_string();
            async move { conn.set_ex::<_, _, ()>(full_key, value, seconds).await }
        })
        .await
    }

    async fn ping(&self) -> bool {
        let result = self
            .run("PING", |mut conn| async move {
                let pong: RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
                pong
            })
            .await;
        matches!(result, Ok(ref pong) if pong == "PONG")
    }
}

fn prefixed_key(prefix: &str, key: &str) -> String {
    format!("{}{}", prefix, key)
}

fn map_redis_error(err: RedisError) -> CacheError {
    CacheError::Unavailable(err.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn io_error() -> RedisError {
        RedisError::from((redis::ErrorKind::IoError, "broken pipe"))
    }

    #[tokio::test]
    async fn test_second_attempt_after_failure() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = run_with_reconnect("GET", Duration::from_millis(100), move || async move {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(io_error())
            } else {
                Ok(Some("cached".to_string()))
            }
        })
        .await;
        assert_eq!(result, Ok(Some("cached".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_two_attempts() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), CacheError> =
            run_with_reconnect("SETEX", Duration::from_millis(100), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(io_error())
            })
            .await;
        match result {
            Err(CacheError::Unavailable(msg)) => assert!(msg.contains("broken pipe")),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), ATTEMPTS_PER_OPERATION);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_attempt() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<String, CacheError> =
            run_with_reconnect("PING", Duration::from_millis(20), move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok("PONG".to_string())
            })
            .await;
        assert_eq!(result, Err(CacheError::Timeout(Duration::from_millis(20))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_map_redis_error() {
        let err = map_redis_error(RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )));
        match err {
            CacheError::Unavailable(msg) => assert!(msg.contains("connection refused")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_key_prefix() {
        // ConnectionManager は実際の Redis なしでは作れないため、キー生成ロジックのみテスト
        assert_eq!(
            prefixed_key("prod:", "media-search:v1:abc"),
            "prod:media-search:v1:abc"
        );
        assert_eq!(prefixed_key("", "media-search:v1:abc"), "media-search:v1:abc");
    }
}
