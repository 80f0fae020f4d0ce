use serde::{Deserialize, Serialize};

/// Title stored when a capture carries none / 默认标题
pub const UNTITLED: &str = "(untitled)";

/// Captured page record / 已捕获的页面记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CapturedDocument {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub site_name: String,
    pub word_count: i64,
    pub reading_time: i64,
    /// Last capture time (RFC 3339) / 最后捕获时间
    pub timestamp: String,
    pub visit_count: i64,
}

/// Capture candidate: everything except `url` may be missing / 待保存的页面数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialDocument {
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub word_count: Option<i64>,
    #[serde(default)]
    pub reading_time: Option<i64>,
}

impl PartialDocument {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Whether the candidate carries usable content / 是否有可用内容
    pub fn has_content(&self) -> bool {
        present(&self.content).is_some()
    }
}

/// Non-empty text value, or None / 非空文本
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Non-zero count, or None / 非零数值
pub(crate) fn positive(value: Option<i64>) -> Option<i64> {
    value.filter(|v| *v > 0)
}

/// Upsert result / 保存结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertOutcome {
    pub record: CapturedDocument,
    pub was_update: bool,
}

/// Store statistics / 存储统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub record_count: u64,
    /// Estimated, not exact / 估算值
    pub approximate_bytes: u64,
    pub last_updated: Option<String>,
}

/// Full data export / 数据导出
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageExport {
    pub export_date: String,
    pub version: String,
    pub total_pages: usize,
    pub pages: Vec<CapturedDocument>,
}
