use std::collections::BTreeSet;
use std::fmt;
use std::num::IntErrorKind;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_KEYWORD_CHARS: usize = 2;
pub const MAX_KEYWORD_CHARS: usize = 256;

/// ストアのクエリ構文で意味を持つ文字。これらを含むキーワードは拒否し、
/// ワイルドカードや DSL クエリへの展開を防ぐ。
pub const RESERVED_KEYWORD_CHARS: &[char] = &[
    '*', '?', '{', '}', '[', ']', '(', ')', '^', '"', '~', ':', '\\', '<', '>', '=', '!', '|',
    '&', '+',
];

/// SearchField はキーワード検索の対象にできるインデックスフィールド。
/// 宣言順がクエリ内のフィールド順になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Suchtext,
    Fotografen,
    Bildnummer,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Suchtext => "suchtext",
            SearchField::Fotografen => "fotografen",
            SearchField::Bildnummer => "bildnummer",
        }
    }
}

impl FromStr for SearchField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suchtext" => Ok(SearchField::Suchtext),
            "fotografen" => Ok(SearchField::Fotografen),
            "bildnummer" => Ok(SearchField::Bildnummer),
            _ => Err(ValidationError::UnknownField(s.to_string())),
        }
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SortField はソート可能なインデックスフィールド。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Datum,
    Breite,
    Hoehe,
    Fotografen,
}

impl SortField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortField::Datum => "datum",
            SortField::Breite => "breite",
            SortField::Hoehe => "hoehe",
            SortField::Fotografen => "fotografen",
        }
    }
}

impl FromStr for SortField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "datum" => Ok(SortField::Datum),
            "breite" => Ok(SortField::Breite),
            "hoehe" => Ok(SortField::Hoehe),
            "fotografen" => Ok(SortField::Fotografen),
            _ => Err(ValidationError::UnknownSortField(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(ValidationError::UnknownOrder(s.to_string())),
        }
    }
}

/// Bounds はフィルタ次元の閉区間。どちらの端も省略できる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T> Default for Bounds<T> {
    fn default() -> Self {
        Self {
            min: None,
            max: None,
        }
    }
}

impl<T: PartialOrd> Bounds<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    fn is_ordered(&self) -> bool {
        match (&self.min, &self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }
}

/// ストアが from + size として受け付ける上限 (index.max_result_window の既定値)。
pub const DEFAULT_MAX_RESULT_WINDOW: u64 = 10_000;

/// SearchLimits はページサイズの既定値と上限。設定から与えられる。
/// max_result_window を超えるページはストアに届く前に検証エラーになる。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_result_window: u64,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            default_page_size: 5,
            max_page_size: 100,
            max_result_window: DEFAULT_MAX_RESULT_WINDOW,
        }
    }
}

/// SearchParams は HTTP クエリパラメータをそのまま保持する未検証の入力。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pub keyword: Option<String>,
    pub fields: Vec<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub height_min: Option<String>,
    pub height_max: Option<String>,
    pub width_min: Option<String>,
    pub width_max: Option<String>,
}

/// SearchRequest は検証済みの検索条件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub keyword: String,
    pub fields: BTreeSet<SearchField>,
    pub page: u32,
    pub limit: u32,
    pub sort_by: Option<SortField>,
    pub order: SortOrder,
    pub date: Bounds<NaiveDate>,
    pub height: Bounds<u32>,
    pub width: Bounds<u32>,
}

impl SearchRequest {
    /// キーワード以外を既定値にしたリクエスト。キーワードは正規化しない。
    pub fn new(keyword: impl Into<String>, limits: &SearchLimits) -> Self {
        Self {
            keyword: keyword.into(),
            fields: BTreeSet::from([SearchField::Suchtext]),
            page: 1,
            limit: limits.default_page_size,
            sort_by: None,
            order: SortOrder::default(),
            date: Bounds::default(),
            height: Bounds::default(),
            width: Bounds::default(),
        }
    }

    /// Zero-based offset of the first hit on the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// ページに含まれ得る最後のヒットの次の位置。
    pub fn window_end(&self) -> u64 {
        self.offset() + u64::from(self.limit)
    }
}

impl SearchParams {
    pub fn validate(&self, limits: &SearchLimits) -> Result<SearchRequest, ValidationError> {
        let keyword = normalize_keyword(self.keyword.as_deref().unwrap_or_default())?;

        let mut fields = BTreeSet::new();
        for raw in self
            .fields
            .iter()
            .flat_map(|f| f.split(','))
            .filter(|f| !f.trim().is_empty())
        {
            fields.insert(raw.parse::<SearchField>()?);
        }
        if fields.is_empty() {
            if self.fields.is_empty() {
                fields.insert(SearchField::Suchtext);
            } else {
                return Err(ValidationError::NoFields);
            }
        }

        let page = match non_blank(&self.page) {
            Some(raw) => parse_positive("page", raw)?,
            None => 1,
        };

        let limit = match non_blank(&self.limit) {
            Some(raw) => parse_positive("limit", raw)?,
            None => limits.default_page_size,
        };
        if limit > limits.max_page_size {
            return Err(ValidationError::LimitOutOfRange {
                value: limit,
                max: limits.max_page_size,
            });
        }

        if u64::from(page) * u64::from(limit) > limits.max_result_window {
            return Err(ValidationError::PageOutOfRange {
                page,
                limit,
                max_result_window: limits.max_result_window,
            });
        }

        let sort_by = non_blank(&self.sort_by)
            .map(str::parse::<SortField>)
            .transpose()?;
        let order = non_blank(&self.order)
            .map(str::parse::<SortOrder>)
            .transpose()?
            .unwrap_or_default();

        let date = Bounds::new(
            parse_date("date_from", &self.date_from)?,
            parse_date("date_to", &self.date_to)?,
        );
        check_ordered(&date, "date_from", "date_to")?;

        let height = Bounds::new(
            parse_non_negative("height_min", &self.height_min)?,
            parse_non_negative("height_max", &self.height_max)?,
        );
        check_ordered(&height, "height_min", "height_max")?;

        let width = Bounds::new(
            parse_non_negative("width_min", &self.width_min)?,
            parse_non_negative("width_max", &self.width_max)?,
        );
        check_ordered(&width, "width_min", "width_max")?;

        Ok(SearchRequest {
            keyword,
            fields,
            page,
            limit,
            sort_by,
            order,
            date,
            height,
            width,
        })
    }
}

/// キーワードをトリムし、連続空白を 1 つにまとめて規則を検証する。
/// keyword 型フィールドは大文字小文字を区別するため、大小はそのまま残す。
fn normalize_keyword(raw: &str) -> Result<String, ValidationError> {
    let keyword = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if keyword.is_empty() {
        return Err(ValidationError::MissingKeyword);
    }
    let chars = keyword.chars().count();
    if !(MIN_KEYWORD_CHARS..=MAX_KEYWORD_CHARS).contains(&chars) {
        return Err(ValidationError::KeywordLength {
            min: MIN_KEYWORD_CHARS,
            max: MAX_KEYWORD_CHARS,
        });
    }
    if let Some(c) = keyword.chars().find(|c| RESERVED_KEYWORD_CHARS.contains(c)) {
        return Err(ValidationError::ReservedCharacter(c));
    }
    Ok(keyword)
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_positive(field: &'static str, raw: &str) -> Result<u32, ValidationError> {
    match raw.parse::<u32>() {
        Ok(value) if value >= 1 => Ok(value),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Err(too_large(field, raw)),
        _ => Err(ValidationError::NotPositive {
            field,
            value: raw.to_string(),
        }),
    }
}

fn parse_non_negative(
    field: &'static str,
    raw: &Option<String>,
) -> Result<Option<u32>, ValidationError> {
    non_blank(raw)
        .map(|v| {
            v.parse::<u32>().map_err(|e| match e.kind() {
                IntErrorKind::PosOverflow => too_large(field, v),
                _ => ValidationError::NotNonNegative {
                    field,
                    value: v.to_string(),
                },
            })
        })
        .transpose()
}

fn too_large(field: &'static str, raw: &str) -> ValidationError {
    ValidationError::TooLarge {
        field,
        value: raw.to_string(),
        max: u64::from(u32::MAX),
    }
}

fn parse_date(
    field: &'static str,
    raw: &Option<String>,
) -> Result<Option<NaiveDate>, ValidationError> {
    non_blank(raw)
        .map(|v| {
            NaiveDate::parse_from_str(v, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
                field,
                value: v.to_string(),
            })
        })
        .transpose()
}

fn check_ordered<T: PartialOrd>(
    bounds: &Bounds<T>,
    lower: &'static str,
    upper: &'static str,
) -> Result<(), ValidationError> {
    if bounds.is_ordered() {
        Ok(())
    } else {
        Err(ValidationError::InvertedRange { lower, upper })
    }
}
