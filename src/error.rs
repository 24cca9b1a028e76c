use std::time::Duration;

use thiserror::Error;

/// ValidationError は検索パラメータの検証エラーを表す。
/// ストアやキャッシュに到達する前に呼び出し元へ返される。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("keyword is required")]
    MissingKeyword,
    #[error("keyword must be between {min} and {max} characters long")]
    KeywordLength { min: usize, max: usize },
    #[error("keyword contains reserved query character '{0}'")]
    ReservedCharacter(char),
    #[error("at least one field is required")]
    NoFields,
    #[error("invalid field: {0}")]
    UnknownField(String),
    #[error("invalid sort field: {0}")]
    UnknownSortField(String),
    #[error("invalid order: {0}")]
    UnknownOrder(String),
    #[error("{field} must be a positive integer, got '{value}'")]
    NotPositive { field: &'static str, value: String },
    #[error("{field} must be a non-negative integer, got '{value}'")]
    NotNonNegative { field: &'static str, value: String },
    #[error("{field} must be at most {max}, got '{value}'")]
    TooLarge {
        field: &'static str,
        value: String,
        max: u64,
    },
    #[error("limit must be between 1 and {max}, got {value}")]
    LimitOutOfRange { value: u32, max: u32 },
    #[error("page {page} with limit {limit} reaches past the first {max_result_window} results")]
    PageOutOfRange {
        page: u32,
        limit: u32,
        max_result_window: u64,
    },
    #[error("{field} must be in YYYY-MM-DD format, got '{value}'")]
    InvalidDate { field: &'static str, value: String },
    #[error("{lower} must be less than or equal to {upper}")]
    InvertedRange {
        lower: &'static str,
        upper: &'static str,
    },
}

impl ValidationError {
    /// Returns the request parameter the error refers to.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingKeyword
            | ValidationError::KeywordLength { .. }
            | ValidationError::ReservedCharacter(_) => "keyword",
            ValidationError::NoFields | ValidationError::UnknownField(_) => "fields",
            ValidationError::UnknownSortField(_) => "sort_by",
            ValidationError::UnknownOrder(_) => "order",
            ValidationError::NotPositive { field, .. }
            | ValidationError::NotNonNegative { field, .. }
            | ValidationError::TooLarge { field, .. }
            | ValidationError::InvalidDate { field, .. } => field,
            ValidationError::LimitOutOfRange { .. } => "limit",
            ValidationError::PageOutOfRange { .. } => "page",
            ValidationError::InvertedRange { lower, .. } => lower,
        }
    }

    /// Returns a machine-readable reason for the error detail.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::MissingKeyword | ValidationError::NoFields => "required",
            ValidationError::KeywordLength { .. } => "invalid_length",
            ValidationError::ReservedCharacter(_) => "reserved_character",
            ValidationError::UnknownField(_)
            | ValidationError::UnknownSortField(_)
            | ValidationError::UnknownOrder(_) => "unknown_value",
            ValidationError::NotPositive { .. } | ValidationError::NotNonNegative { .. } => {
                "invalid_integer"
            }
            ValidationError::TooLarge { .. }
            | ValidationError::LimitOutOfRange { .. }
            | ValidationError::PageOutOfRange { .. } => "out_of_range",
            ValidationError::InvalidDate { .. } => "invalid_date",
            ValidationError::InvertedRange { .. } => "inverted_range",
        }
    }
}

/// StoreError はインデックスストア境界のエラー分類。
/// ストア固有のエラー型はこの型に変換され、境界の外へは出ない。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("index store unreachable: {0}")]
    Unavailable(String),
    #[error("index store call exceeded {0:?}")]
    Timeout(Duration),
    #[error("index store rejected the query (status {status:?}): {reason}")]
    Rejected { status: Option<u16>, reason: String },
    #[error("index store returned an unreadable response: {0}")]
    MalformedResponse(String),
    #[error("index store still failing after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },
}

impl StoreError {
    /// 接続失敗とタイムアウトのみ一時障害として再試行対象にする。
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Unavailable(_) | StoreError::Timeout(_))
    }
}

/// CacheError はキャッシュストアの障害を表す。呼び出し元には公開されず、ミスとして扱われる。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation exceeded {0:?}")]
    Timeout(Duration),
}
