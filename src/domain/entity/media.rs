use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// RawHit はインデックスストアが返した 1 件のドキュメント。
/// フィールドは欠落・空文字・型違いのいずれもあり得る。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawHit {
    pub id: Option<String>,
    pub source: Map<String, Value>,
}

impl RawHit {
    pub fn new(id: Option<String>, source: Map<String, Value>) -> Self {
        Self { id, source }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHits {
    /// ページサイズではなくストア全体での一致件数。
    pub total: u64,
    pub hits: Vec<RawHit>,
}

/// MediaResult は正規化済みの出力レコード。すべてのフィールドを常にシリアライズする。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MediaResult {
    pub id: String,
    pub image_number: String,
    pub database: String,
    pub search_text: String,
    pub photographer: String,
    pub date: String,
    pub height: Option<u64>,
    pub width: Option<u64>,
    pub media_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MediaSearchResponse {
    pub total_results: u64,
    pub results: Vec<MediaResult>,
    pub page: u32,
    pub limit: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl MediaSearchResponse {
    /// page・limit・total からナビゲーションフラグを導出してページを組み立てる。
    pub fn new(total_results: u64, results: Vec<MediaResult>, page: u32, limit: u32) -> Self {
        let seen = u64::from(page) * u64::from(limit);
        Self {
            total_results,
            results,
            page,
            limit,
            has_next: seen < total_results,
            has_previous: page > 1,
        }
    }
}
