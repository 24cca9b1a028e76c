use axum::extract::{Query, State};
use axum::Json;

use super::error::{ApiError, ErrorResponse};
use super::AppState;
use crate::domain::entity::{MediaSearchResponse, SearchParams};

/// search_params_from_pairs はクエリペアを SearchParams に集める。
/// `fields` は繰り返し指定可能で、`order_by` は `order` の別名。未知のパラメータは無視し、
/// 単一値パラメータが重複した場合は最後の値を採用する。
pub fn search_params_from_pairs(pairs: Vec<(String, String)>) -> SearchParams {
    let mut params = SearchParams::default();
    for (key, value) in pairs {
        let slot = match key.as_str() {
            "fields" => {
                params.fields.push(value);
                continue;
            }
            "keyword" => &mut params.keyword,
            "page" => &mut params.page,
            "limit" => &mut params.limit,
            "sort_by" => &mut params.sort_by,
            "order" | "order_by" => &mut params.order,
            "date_from" => &mut params.date_from,
            "date_to" => &mut params.date_to,
            "height_min" => &mut params.height_min,
            "height_max" => &mut params.height_max,
            "width_min" => &mut params.width_min,
            "width_max" => &mut params.width_max,
            _ => continue,
        };
        *slot = Some(value);
    }
    params
}

#[utoipa::path(
    get,
    path = "/api/media/search",
    params(
        ("keyword" = String, Query, description = "Search keyword (2-256 characters, no query syntax)"),
        ("fields" = Option<Vec<String>>, Query, description = "Fields to search: suchtext, fotografen, bildnummer. Repeatable or comma-separated"),
        ("page" = Option<u32>, Query, description = "Page number, starting at 1"),
        ("limit" = Option<u32>, Query, description = "Results per page"),
        ("sort_by" = Option<String>, Query, description = "datum, breite, hoehe or fotografen"),
        ("order" = Option<String>, Query, description = "asc or desc (alias: order_by)"),
        ("date_from" = Option<String>, Query, description = "Earliest date, YYYY-MM-DD"),
        ("date_to" = Option<String>, Query, description = "Latest date, YYYY-MM-DD"),
        ("height_min" = Option<u32>, Query, description = "Minimum height in pixels"),
        ("height_max" = Option<u32>, Query, description = "Maximum height in pixels"),
        ("width_min" = Option<u32>, Query, description = "Minimum width in pixels"),
        ("width_max" = Option<u32>, Query, description = "Maximum width in pixels"),
    ),
    responses(
        (status = 200, description = "Search results", body = MediaSearchResponse),
        (status = 422, description = "Invalid parameters", body = ErrorResponse),
        (status = 500, description = "Store query failed", body = ErrorResponse),
        (status = 503, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn search_media(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<MediaSearchResponse>, ApiError> {
    let request = search_params_from_pairs(pairs).validate(&state.limits)?;
    let response = state.search_media_uc.execute(&request).await?;
    Ok(Json(response))
}
