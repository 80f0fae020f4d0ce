//! Search index schema definition / 搜索索引的 Schema 定义

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::tokenizer::tokenize;
use crate::error::IndexError;
use crate::models::{CapturedDocument, UNTITLED};

/// Indexed text fields / 索引字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexField {
    Title,
    Content,
    Excerpt,
}

impl IndexField {
    pub const ALL: [IndexField; 3] = [IndexField::Title, IndexField::Content, IndexField::Excerpt];
}

/// Indexed copy of a page: field text plus its token sets / 已索引文档
#[derive(Debug, Clone)]
pub struct IndexedEntry {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    title_tokens: HashSet<String>,
    content_tokens: HashSet<String>,
    excerpt_tokens: HashSet<String>,
}

impl IndexedEntry {
    /// Build from a stored record; empty fields fall back to their defaults / 从记录构建
    pub fn from_document(doc: &CapturedDocument) -> Result<Self, IndexError> {
        if doc.id <= 0 {
            return Err(IndexError::InvalidDocument(format!(
                "page {} has no store-assigned id",
                doc.url
            )));
        }

        let title = if doc.title.is_empty() { UNTITLED.to_string() } else { doc.title.clone() };
        Ok(Self {
            id: doc.id,
            title_tokens: tokenize(&title).into_iter().collect(),
            content_tokens: tokenize(&doc.content).into_iter().collect(),
            excerpt_tokens: tokenize(&doc.excerpt).into_iter().collect(),
            title,
            content: doc.content.clone(),
            excerpt: doc.excerpt.clone(),
        })
    }

    pub fn tokens(&self, field: IndexField) -> &HashSet<String> {
        match field {
            IndexField::Title => &self.title_tokens,
            IndexField::Content => &self.content_tokens,
            IndexField::Excerpt => &self.excerpt_tokens,
        }
    }

    /// Whether the indexed text equals the record's fields / 是否与记录一致
    pub fn matches(&self, doc: &CapturedDocument) -> bool {
        let title = if doc.title.is_empty() { UNTITLED } else { doc.title.as_str() };
        self.id == doc.id && self.title == title && self.content == doc.content && self.excerpt == doc.excerpt
    }
}

/// Search query options / 搜索查询选项
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Search keywords / 搜索关键词
    pub query: String,
    /// Maximum number of results to return (0 = unlimited) / 最大返回结果数
    pub limit: usize,
    /// Offset (for pagination) / 偏移量
    pub offset: usize,
}

impl SearchOptions {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 0,
            offset: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Search result / 搜索结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// Stored page / 页面记录
    pub document: CapturedDocument,
    /// Title with highlight markers / 高亮标题
    pub title_html: String,
    /// Excerpt or content preview with highlight markers / 高亮摘要
    pub snippet_html: String,
}
