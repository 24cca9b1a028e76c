use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::domain::entity::{Bounds, SearchRequest};

/// キャッシュキーの名前空間とバージョン。形式を変えたら v を上げる。
pub const CACHE_KEY_PREFIX: &str = "media-search:v1:";

#[derive(Serialize)]
struct Canonical<'a> {
    keyword: &'a str,
    fields: Vec<&'a str>,
    page: u32,
    limit: u32,
    sort_by: Option<&'a str>,
    order: &'a str,
    date: Bounds<String>,
    height: &'a Bounds<u32>,
    width: &'a Bounds<u32>,
}

/// cache_key は正規化済みリクエストから決定的なキャッシュキーを生成する。
/// 同じキーのリクエストは必ず同じクエリを組み立てる。フィールド順や空白の差は検証時に正規化済み。
pub fn cache_key(request: &SearchRequest) -> String {
    let canonical = Canonical {
        keyword: &request.keyword,
        fields: request.fields.iter().map(|f| f.as_str()).collect(),
        page: request.page,
        limit: request.limit,
        sort_by: request.sort_by.map(|s| s.as_str()),
        order: request.order.as_str(),
        date: Bounds {
            min: request.date.min.map(|d| d.format("%Y-%m-%d").to_string()),
            max: request.date.max.map(|d| d.format("%Y-%m-%d").to_string()),
        },
        height: &request.height,
        width: &request.width,
    };
    // 構造体のフィールド順でシリアライズされるため出力は安定している。
    let encoded = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Sha256::digest(&encoded);
    format!("{CACHE_KEY_PREFIX}{}", hex::encode(digest))
}
