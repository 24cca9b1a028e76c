use std::collections::BTreeMap;

use serde::Deserialize;

/// MediaUrlConfig はサムネイル URL の組み立てに使う固定データ。
/// 既定値は既存クライアントとの互換のため変更しないこと。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MediaUrlConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_pad_width")]
    pub pad_width: usize,
    #[serde(default = "default_segment")]
    pub default_segment: String,
    #[serde(default = "default_segments")]
    pub segments: BTreeMap<String, String>,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default = "default_file_format")]
    pub file_format: String,
}

impl Default for MediaUrlConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            pad_width: default_pad_width(),
            default_segment: default_segment(),
            segments: default_segments(),
            file_prefix: default_file_prefix(),
            file_format: default_file_format(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.imago-images.de".to_string()
}

fn default_pad_width() -> usize {
    10
}

fn default_segment() -> String {
    "sp".to_string()
}

fn default_segments() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("stock".to_string(), "st".to_string()),
        ("st".to_string(), "st".to_string()),
        ("sp".to_string(), "sp".to_string()),
    ])
}

fn default_file_prefix() -> String {
    "s".to_string()
}

fn default_file_format() -> String {
    "jpg".to_string()
}

/// MediaUrlBuilder はドキュメントの識別子フィールドからサムネイル URL を組み立てる。
#[derive(Debug, Clone)]
pub struct MediaUrlBuilder {
    config: MediaUrlConfig,
}

impl MediaUrlBuilder {
    pub fn new(config: MediaUrlConfig) -> Self {
        Self { config }
    }

    /// `BASE/bild/{segment}/{padded id}/{prefix}.{format}` を返す。
    ///
    /// 識別子は設定幅までゼロ埋めし、それより長い識別子はそのまま使う。
    /// 未知または欠落した db コードは既定セグメントになる。
    ///
    /// 空または数字以外の識別子はファイルを指せないため空文字列を返す。
    pub fn build(&self, image_number: &str, database: Option<&str>) -> String {
        let image_number = image_number.trim();
        if image_number.is_empty() || !image_number.bytes().all(|b| b.is_ascii_digit()) {
            return String::new();
        }

        let segment = self.segment_for(database);
        format!(
            "{}/bild/{}/{:0>width$}/{}.{}",
            self.config.base_url.trim_end_matches('/'),
            segment,
            image_number,
            self.config.file_prefix,
            self.config.file_format,
            width = self.config.pad_width,
        )
    }

    fn segment_for(&self, database: Option<&str>) -> &str {
        database
            .map(|db| db.trim().to_ascii_lowercase())
            .and_then(|db| self.config.segments.get(&db))
            .unwrap_or(&self.config.default_segment)
    }
}

impl Default for MediaUrlBuilder {
    fn default() -> Self {
        Self::new(MediaUrlConfig::default())
    }
}
