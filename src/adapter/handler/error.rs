use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::ValidationError;
use crate::usecase::SearchMediaError;

pub const CODE_VALIDATION_ERROR: &str = "MEDIA_SEARCH_VALIDATION_ERROR";
pub const CODE_STORE_UNAVAILABLE: &str = "MEDIA_SEARCH_STORE_UNAVAILABLE";
pub const CODE_INTERNAL_ERROR: &str = "MEDIA_SEARCH_INTERNAL_ERROR";

/// ErrorDetail は入力エラーの対象パラメータと理由を表す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorDetail {
    pub field: String,
    pub reason: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ErrorDetail>,
}

/// ErrorResponse は ErrorBody を `{ "error": ... }` で包むエンベロープ。
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>, details: Vec<ErrorDetail>) -> Self {
        Self {
            error: ErrorBody {
                code: code.to_string(),
                message: message.into(),
                request_id: uuid::Uuid::new_v4().to_string(),
                details,
            },
        }
    }
}

/// ApiError は REST ハンドラのエラー型。
/// ストアの詳細はログにのみ出し、レスポンスには汎用メッセージを返す。
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Search(#[from] SearchMediaError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new(
                    CODE_VALIDATION_ERROR,
                    "invalid search parameters",
                    vec![ErrorDetail {
                        field: err.field().to_string(),
                        reason: err.reason().to_string(),
                        message: err.to_string(),
                    }],
                ),
            ),
            ApiError::Search(SearchMediaError::StoreUnavailable(_)) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new(
                    CODE_STORE_UNAVAILABLE,
                    "search backend is temporarily unavailable",
                    vec![],
                ),
            ),
            ApiError::Search(SearchMediaError::StoreQuery(_)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(CODE_INTERNAL_ERROR, "internal server error", vec![]),
            ),
        };

        match &self {
            ApiError::Validation(err) => {
                warn!(request_id = %body.error.request_id, error = %err, "rejected search request")
            }
            ApiError::Search(err) => {
                error!(request_id = %body.error.request_id, error = %err, "search request failed")
            }
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let resp =
            ApiError::from(ValidationError::UnknownField("Invalid Field".into())).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], CODE_VALIDATION_ERROR);
        assert_eq!(json["error"]["details"][0]["field"], "fields");
        assert_eq!(json["error"]["details"][0]["reason"], "unknown_value");
        assert!(uuid::Uuid::parse_str(json["error"]["request_id"].as_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_store_unavailable_hides_detail() {
        let resp = ApiError::from(SearchMediaError::StoreUnavailable(
            "connection refused to 10.0.0.5:9200".into(),
        ))
        .into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], CODE_STORE_UNAVAILABLE);
        assert!(!json.to_string().contains("10.0.0.5"));
        assert!(json["error"].get("details").is_none());
    }

    #[tokio::test]
    async fn test_store_query_error_is_internal() {
        let resp = ApiError::from(SearchMediaError::StoreQuery("parse_exception".into()))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert_eq!(json["error"]["code"], CODE_INTERNAL_ERROR);
        assert!(!json.to_string().contains("parse_exception"));
    }
}
