//! Error types shared by the store, index and library / 错误类型

use thiserror::Error;

use crate::capture::policy::PolicyRejection;

/// Record store errors / 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O, quota or constraint failure in SQLite; the write did not happen.
    #[error("persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("invalid record: {0}")]
    Invalid(String),
}

/// Search index errors / 索引错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// Index membership no longer matches the store; recover with a full rebuild.
    #[error("index drift detected for document {id}: {reason}")]
    Drift { id: i64, reason: &'static str },

    #[error("document cannot be indexed: {0}")]
    InvalidDocument(String),
}

/// Capture settings errors / 设置错误
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings storage failed: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("invalid domain entry: {0}")]
    InvalidDomain(String),

    #[error("domain already listed: {0}")]
    Duplicate(String),

    #[error("malformed settings row: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Library service errors / 服务错误
#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("database open failed: {0}")]
    Open(#[from] sqlx::Error),
}

/// Capture pipeline errors; logged for auto captures, returned for manual ones / 捕获错误
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("auto capture is disabled")]
    Disabled,

    #[error("capture rejected for {url}: {reason}")]
    PolicyRejected { url: String, reason: PolicyRejection },

    #[error("extraction failed for {url}: {reason}")]
    ExtractionFailed { url: String, reason: String },

    #[error("no usable content at {url} ({length} chars)")]
    NoContent { url: String, length: usize },

    #[error("no snapshot of {url} from surface {surface_id}")]
    NoSnapshot { surface_id: String, url: String },

    #[error("settings unavailable: {0}")]
    Settings(#[from] SettingsError),

    /// Primary and fallback extraction both failed / 两种提取均失败
    #[error("extraction exhausted for {url}: {primary}; {fallback}")]
    ExtractionExhausted { url: String, primary: String, fallback: String },

    #[error("persistence failed: {0}")]
    PersistenceFailed(#[from] LibraryError),
}
