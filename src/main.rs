use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use media_search_server::adapter::handler::{self, AppState};
use media_search_server::adapter::repository::{
    MediaSearchElasticsearchRepository, RedisSearchCache, RetryingMediaSearchRepository,
};
use media_search_server::domain::repository::{MediaSearchRepository, SearchCache};
use media_search_server::domain::service::MediaUrlBuilder;
use media_search_server::infrastructure::cache::InMemorySearchCache;
use media_search_server::infrastructure::config::{Config, RedisConfig, DEFAULT_CONFIG_PATH};
use media_search_server::infrastructure::telemetry;
use media_search_server::usecase::{CheckHealthUseCase, SearchMediaUseCase};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {config_path}"))?;

    telemetry::init_logging(&cfg.logging)
        .map_err(|e| anyhow::anyhow!("failed to init logging: {}", e))?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "starting media search server"
    );

    // --- Index store: Elasticsearch + retry decorator ---
    let es_repo = MediaSearchElasticsearchRepository::new(&cfg.elasticsearch)
        .context("failed to build index store client")?;
    info!(url = %cfg.elasticsearch.url, index = %cfg.elasticsearch.index, "index store client ready");
    let repo: Arc<dyn MediaSearchRepository> = Arc::new(RetryingMediaSearchRepository::new(
        Arc::new(es_repo),
        cfg.retry.to_retry_config(),
        cfg.retry.attempt_timeout(),
    ));

    // --- Search cache: Redis or InMemory fallback ---
    let cache: Arc<dyn SearchCache> = match cfg.redis {
        Some(ref redis_cfg) => match connect_redis(redis_cfg).await {
            Ok(cache) => {
                info!("Redis connection established");
                Arc::new(cache)
            }
            Err(e) => {
                warn!(error = %e, "Redis unreachable at startup, using InMemory search cache");
                Arc::new(InMemorySearchCache::new(cfg.cache.max_entries))
            }
        },
        None => {
            info!("Redis not configured, using InMemory search cache");
            Arc::new(InMemorySearchCache::new(cfg.cache.max_entries))
        }
    };

    let url_builder = Arc::new(MediaUrlBuilder::new(cfg.media_url.clone()));
    let state = AppState {
        search_media_uc: Arc::new(SearchMediaUseCase::new(
            repo.clone(),
            cache.clone(),
            url_builder,
            cfg.cache.ttl(),
        )),
        check_health_uc: Arc::new(CheckHealthUseCase::new(repo, cache)),
        limits: cfg.search.limits(),
    };
    let app = handler::router(state);

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    info!("media search server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("media search server exited");
    Ok(())
}

async fn connect_redis(cfg: &RedisConfig) -> anyhow::Result<RedisSearchCache> {
    info!(url = %redact_url(&cfg.url), "connecting to Redis");
    let client = redis::Client::open(cfg.url.as_str())
        .map_err(|e| anyhow::anyhow!("failed to create Redis client: {}", e))?;
    let conn = tokio::time::timeout(
        cfg.operation_timeout() * 4,
        redis::aio::ConnectionManager::new(client),
    )
    .await
    .map_err(|_| anyhow::anyhow!("timed out connecting to Redis"))?
    .map_err(|e| anyhow::anyhow!("failed to connect to Redis: {}", e))?;
    Ok(RedisSearchCache::new(
        conn,
        &cfg.key_prefix,
        cfg.operation_timeout(),
    ))
}

/// Drops credentials from a connection URL before it is logged.
fn redact_url(url: &str) -> String {
    match url.split_once('@') {
        Some((scheme_and_auth, host)) => {
            let scheme = scheme_and_auth.split("//").next().unwrap_or_default();
            format!("{scheme}//***@{host}")
        }
        None => url.to_string(),
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
