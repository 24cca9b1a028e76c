use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::domain::entity::{MediaResult, RawHit};
use crate::domain::service::media_url::MediaUrlBuilder;

const FIELD_IMAGE_NUMBER: &str = "bildnummer";
const FIELD_DATABASE: &str = "db";
const FIELD_SEARCH_TEXT: &str = "suchtext";
const FIELD_PHOTOGRAPHER: &str = "fotografen";
const FIELD_DATE: &str = "datum";
const FIELD_HEIGHT: &str = "hoehe";
const FIELD_WIDTH: &str = "breite";

/// HitNormalizer はストアの生ドキュメントを MediaResult に変換する。
pub struct HitNormalizer {
    url_builder: Arc<MediaUrlBuilder>,
}

impl HitNormalizer {
    pub fn new(url_builder: Arc<MediaUrlBuilder>) -> Self {
        Self { url_builder }
    }

    /// normalize_all はストアの順序を保ったまま正規化する。識別子のないヒットは警告ログを出して除外する。
    pub fn normalize_all(&self, hits: &[RawHit]) -> Vec<MediaResult> {
        hits.iter()
            .enumerate()
            .filter_map(|(position, hit)| {
                let result = self.normalize(hit);
                if result.is_none() {
                    warn!(
                        position,
                        fields = ?hit.source.keys().collect::<Vec<_>>(),
                        "skipping hit without _id or bildnummer"
                    );
                }
                result
            })
            .collect()
    }

    /// normalize はストア id と画像番号のどちらも持たないヒットに対してのみ `None` を返す。
    pub fn normalize(&self, hit: &RawHit) -> Option<MediaResult> {
        let image_number = text_field(hit, FIELD_IMAGE_NUMBER);
        let id = hit
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or_else(|| (!image_number.is_empty()).then(|| image_number.clone()))?;

        let database = text_field(hit, FIELD_DATABASE);
        let media_url = self
            .url_builder
            .build(&image_number, (!database.is_empty()).then_some(database.as_str()));

        Some(MediaResult {
            id,
            media_url,
            image_number,
            database,
            search_text: text_field(hit, FIELD_SEARCH_TEXT),
            photographer: text_field(hit, FIELD_PHOTOGRAPHER),
            date: text_field(hit, FIELD_DATE),
            height: numeric_field(hit, FIELD_HEIGHT),
            width: numeric_field(hit, FIELD_WIDTH),
        })
    }
}

/// 文字列はトリムし、数値は文字列化する。それ以外は空文字列。
fn text_field(hit: &RawHit, name: &str) -> String {
    match hit.source.get(name) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

fn numeric_field(hit: &RawHit, name: &str) -> Option<u64> {
    match hit.source.get(name)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}
