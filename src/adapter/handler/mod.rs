pub mod error;
pub mod health_handler;
pub mod media_handler;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::domain::entity::SearchLimits;
use crate::usecase::{CheckHealthUseCase, SearchMediaUseCase};

/// AppState はアプリケーション全体の共有状態を表す。
#[derive(Clone)]
pub struct AppState {
    pub search_media_uc: Arc<SearchMediaUseCase>,
    pub check_health_uc: Arc<CheckHealthUseCase>,
    pub limits: SearchLimits,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler::healthz,
        health_handler::health,
        media_handler::search_media,
    ),
    components(schemas(
        crate::domain::entity::MediaResult,
        crate::domain::entity::MediaSearchResponse,
        crate::usecase::HealthReport,
        crate::usecase::HealthStatus,
        error::ErrorResponse,
        error::ErrorBody,
        error::ErrorDetail,
    )),
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// REST API ルーターを構築する。
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health_handler::healthz))
        .route("/health", get(health_handler::health))
        .route("/api/media/search", get(media_handler::search_media))
        .route("/api-docs/openapi.json", get(openapi_json))
        .layer(TraceLayer::new_for_http())
        // 公開 API のため全オリジンを許可する
        .layer(CorsLayer::permissive())
        .with_state(state)
}
