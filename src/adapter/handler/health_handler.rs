use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use super::AppState;
use crate::usecase::{HealthReport, HealthStatus};

#[utoipa::path(get, path = "/healthz", responses((status = 200, description = "Process is alive")))]
pub async fn healthz() -> &'static str {
    "ok"
}

/// health はストアとキャッシュの到達性を返す。ストア停止時のみ 503。
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Healthy or degraded", body = HealthReport),
        (status = 503, description = "Index store unreachable", body = HealthReport),
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.check_health_uc.execute().await;
    let status = match report.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    (status, Json(report))
}
