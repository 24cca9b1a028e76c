use std::time::Duration;

use async_trait::async_trait;
use opensearch::auth::Credentials;
use opensearch::cert::CertificateValidation;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::http::Url;
use opensearch::{OpenSearch, SearchParts};
use serde_json::Value;
use tracing::debug;

use crate::domain::entity::{RawHit, SearchHits};
use crate::domain::repository::MediaSearchRepository;
use crate::domain::service::BuiltQuery;
use crate::error::StoreError;
use crate::infrastructure::config::ElasticsearchConfig;

/// ログおよびエラー値に残すストアエラー本文の最大長。
const MAX_REASON_CHARS: usize = 512;

/// MediaSearchElasticsearchRepository は Elasticsearch 互換 REST API を使った
/// MediaSearchRepository 実装。ストアのエラーはここで StoreError に変換する。
pub struct MediaSearchElasticsearchRepository {
    client: OpenSearch,
    index: String,
    request_timeout: Duration,
}

impl MediaSearchElasticsearchRepository {
    pub fn new(cfg: &ElasticsearchConfig) -> anyhow::Result<Self> {
        let url = Url::parse(&cfg.url)?;
        let conn_pool = SingleNodeConnectionPool::new(url);
        let mut builder = TransportBuilder::new(conn_pool).timeout(cfg.request_timeout());

        if !cfg.verify_certs {
            builder = builder.cert_validation(CertificateValidation::None);
        }
        if !cfg.username.is_empty() && !cfg.password.is_empty() {
            builder = builder.auth(Credentials::Basic(
                cfg.username.clone(),
                cfg.password.clone(),
            ));
        }

        let transport = builder.build()?;
        Ok(Self {
            client: OpenSearch::new(transport),
            index: cfg.index.clone(),
            request_timeout: cfg.request_timeout(),
        })
    }

    fn map_transport_error(&self, err: opensearch::Error) -> StoreError {
        if err.is_timeout() {
            return StoreError::Timeout(self.request_timeout);
        }
        match err.status_code() {
            Some(status) => classify_status(status.as_u16(), &err.to_string()),
            None => StoreError::Unavailable(err.to_string()),
        }
    }
}

#[async_trait]
impl MediaSearchRepository for MediaSearchElasticsearchRepository {
    async fn search(&self, query: &BuiltQuery) -> Result<SearchHits, StoreError> {
        debug!(index = %self.index, from = query.from(), size = query.size(), "executing search");

        let response = self
            .client
            .search(SearchParts::Index(&[self.index.as_str()]))
            .body(query.body().clone())
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status_code();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status.as_u16(), &body));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
        parse_search_body(&body)
    }

    async fn ping(&self) -> bool {
        match self.client.ping().send().await {
            Ok(response) => response.status_code().is_success(),
            Err(e) => {
                debug!(error = %e, "index store ping failed");
                false
            }
        }
    }
}

/// classify_status は非成功ステータスを StoreError に分類する。
/// 過負荷・ゲートウェイ系は一時障害としてリトライ対象にする。
pub fn classify_status(status: u16, body: &str) -> StoreError {
    let reason = truncate(body);
    match status {
        429 | 502 | 503 | 504 => StoreError::Unavailable(format!("status {status}: {reason}")),
        _ => StoreError::Rejected {
            status: Some(status),
            reason,
        },
    }
}

/// parse_search_body は検索レスポンスから総件数と順序付きヒットを取り出す。
pub fn parse_search_body(body: &Value) -> Result<SearchHits, StoreError> {
    let hits = body
        .get("hits")
        .ok_or_else(|| StoreError::MalformedResponse("missing hits section".to_string()))?;

    // 旧形式では total が数値で返る。
    let total = match hits.get("total") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(obj) => obj.get("value").and_then(Value::as_u64),
        None => None,
    }
    .ok_or_else(|| StoreError::MalformedResponse("missing hits.total".to_string()))?;

    let hits = hits
        .get("hits")
        .and_then(Value::as_array)
        .ok_or_else(|| StoreError::MalformedResponse("missing hits.hits".to_string()))?
        .iter()
        .map(|hit| {
            let id = hit.get("_id").and_then(Value::as_str).map(str::to_string);
            let source = hit
                .get("_source")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            RawHit::new(id, source)
        })
        .collect();

    Ok(SearchHits { total, hits })
}

fn truncate(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() <= MAX_REASON_CHARS {
        body.to_string()
    } else {
        body.chars().take(MAX_REASON_CHARS).collect::<String>() + "..."
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_new_rejects_invalid_url() {
        let cfg = ElasticsearchConfig {
            url: "not a url".to_string(),
            username: String::new(),
            password: String::new(),
            index: "imago".to_string(),
            request_timeout_seconds: 30,
            verify_certs: true,
        };
        assert!(MediaSearchElasticsearchRepository::new(&cfg).is_err());
    }

    #[test]
    fn test_new_with_credentials() {
        let cfg = ElasticsearchConfig {
            url: "https://localhost:9200".to_string(),
            username: "elastic".to_string(),
            password: "secret".to_string(),
            index: "imago".to_string(),
            request_timeout_seconds: 5,
            verify_certs: false,
        };
        let repo = MediaSearchElasticsearchRepository::new(&cfg).unwrap();
        assert_eq!(repo.index, "imago");
        assert_eq!(repo.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_classify_overload_as_transient() {
        for status in [429, 502, 503, 504] {
            assert!(classify_status(status, "busy").is_transient(), "{status}");
        }
    }

    #[test]
    fn test_classify_client_errors_as_rejected() {
        for status in [400, 401, 403, 404, 500] {
            let err = classify_status(status, "{\"error\":\"parse_exception\"}");
            assert!(!err.is_transient());
            assert!(matches!(err, StoreError::Rejected { status: Some(s), .. } if s == status));
        }
    }

    #[test]
    fn test_long_reason_truncated() {
        let err = classify_status(400, &"x".repeat(2000));
        match err {
            StoreError::Rejected { reason, .. } => {
                assert_eq!(reason.chars().count(), MAX_REASON_CHARS + 3)
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_parse_search_body() {
        let body = json!({
            "took": 3,
            "hits": {
                "total": { "value": 3017, "relation": "eq" },
                "hits": [
                    { "_id": "a1", "_score": 2.0, "_source": { "bildnummer": "1", "db": "st" } },
                    { "_id": "a2", "_score": 1.0, "_source": { "suchtext": "x" } },
                    { "_score": 0.5 }
                ]
            }
        });
        let parsed = parse_search_body(&body).unwrap();
        assert_eq!(parsed.total, 3017);
        assert_eq!(parsed.hits.len(), 3);
        assert_eq!(parsed.hits[0].id.as_deref(), Some("a1"));
        assert_eq!(parsed.hits[0].source["db"], "st");
        assert_eq!(parsed.hits[1].id.as_deref(), Some("a2"));
        assert_eq!(parsed.hits[2].id, None);
        assert!(parsed.hits[2].source.is_empty());
    }

    #[test]
    fn test_parse_legacy_numeric_total() {
        let body = json!({ "hits": { "total": 7, "hits": [] } });
        assert_eq!(parse_search_body(&body).unwrap().total, 7);
    }

    #[test]
    fn test_parse_malformed_body() {
        for body in [
            json!({}),
            json!({ "hits": { "hits": [] } }),
            json!({ "hits": { "total": { "value": 1 } } }),
        ] {
            assert!(matches!(
                parse_search_body(&body),
                Err(StoreError::MalformedResponse(_))
            ));
        }
    }
}
