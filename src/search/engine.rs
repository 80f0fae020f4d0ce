//! Search index - in-memory full-text index over captured pages / 搜索索引
//!
//! Architecture principle: only expose primitive operations, do not control flow / 架构原则
//! - add / update / remove: single document / 单文档操作
//! - rebuild_from: reload everything from the record store / 从存储重建
//! - search: ids matching any query token / 搜索
//! - clear: clear index / 清空索引
//!
//! The index is derived data and is never persisted.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use super::schema::{IndexField, IndexedEntry};
use super::tokenizer::tokenize_query;
use crate::error::IndexError;
use crate::models::CapturedDocument;

/// Postings for one field: token -> document ids / 单字段倒排表
#[derive(Debug, Default)]
struct FieldIndex {
    postings: BTreeMap<String, HashSet<i64>>,
}

impl FieldIndex {
    fn insert(&mut self, id: i64, tokens: &HashSet<String>) {
        for token in tokens {
            self.postings.entry(token.clone()).or_default().insert(id);
        }
    }

    fn remove(&mut self, id: i64, tokens: &HashSet<String>) {
        for token in tokens {
            if let Some(ids) = self.postings.get_mut(token) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.postings.remove(token);
                }
            }
        }
    }

    /// Forward match: every indexed token starting with `prefix` / 前缀匹配
    fn collect_prefix(&self, prefix: &str, out: &mut HashSet<i64>) {
        for (token, ids) in self.postings.range(prefix.to_string()..) {
            if !token.starts_with(prefix) {
                break;
            }
            out.extend(ids.iter().copied());
        }
    }
}

#[derive(Debug, Default)]
struct IndexInner {
    fields: HashMap<IndexField, FieldIndex>,
    entries: HashMap<i64, IndexedEntry>,
    last_updated: Option<i64>,
}

impl IndexInner {
    fn insert(&mut self, entry: IndexedEntry) {
        for field in IndexField::ALL {
            self.fields
                .entry(field)
                .or_default()
                .insert(entry.id, entry.tokens(field));
        }
        self.entries.insert(entry.id, entry);
        self.touch();
    }

    fn remove(&mut self, id: i64) -> Option<IndexedEntry> {
        let entry = self.entries.remove(&id)?;
        for field in IndexField::ALL {
            if let Some(index) = self.fields.get_mut(&field) {
                index.remove(id, entry.tokens(field));
            }
        }
        self.touch();
        Some(entry)
    }

    fn touch(&mut self) {
        self.last_updated = Some(chrono::Utc::now().timestamp());
    }
}

/// Index statistics / 索引统计
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: usize,
    pub token_count: usize,
    pub last_updated: Option<i64>,
}

/// Search index / 搜索索引
///
/// Fields title, content and excerpt are tokenized independently. A search returns
/// every document having at least one field token that starts with some query token
/// (OR across query tokens). Ranking is left to the query engine.
pub struct SearchIndex {
    inner: RwLock<IndexInner>,
}

impl SearchIndex {
    /// Create an empty index / 创建空索引
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexInner::default()),
        }
    }

    /// Index a document not seen before / 索引新文档
    pub fn add(&self, doc: &CapturedDocument) -> Result<(), IndexError> {
        let entry = IndexedEntry::from_document(doc)?;
        let mut inner = self.inner.write();
        if inner.entries.contains_key(&entry.id) {
            return Err(IndexError::Drift { id: entry.id, reason: "add of an already indexed document" });
        }
        inner.insert(entry);
        Ok(())
    }

    /// Replace the fields of an indexed document / 更新已索引文档
    pub fn update(&self, doc: &CapturedDocument) -> Result<(), IndexError> {
        let entry = IndexedEntry::from_document(doc)?;
        let mut inner = self.inner.write();
        if inner.remove(entry.id).is_none() {
            return Err(IndexError::Drift { id: entry.id, reason: "update of a document never indexed" });
        }
        inner.insert(entry);
        Ok(())
    }

    /// Remove a document, returns whether it was indexed / 删除文档
    pub fn remove(&self, id: i64) -> bool {
        self.inner.write().remove(id).is_some()
    }

    /// Replace the whole index with `docs` / 从文档集合重建索引
    ///
    /// Documents that cannot be indexed are logged and skipped. Returns the indexed count.
    pub fn rebuild_from(&self, docs: &[CapturedDocument]) -> usize {
        let mut fresh = IndexInner::default();
        for doc in docs {
            match IndexedEntry::from_document(doc) {
                Ok(entry) => fresh.insert(entry),
                Err(e) => tracing::warn!("Skipping page {} ({}) during index rebuild: {}", doc.id, doc.url, e),
            }
        }
        fresh.touch();
        let indexed = fresh.entries.len();

        *self.inner.write() = fresh;
        tracing::info!("Search index rebuilt: {} of {} pages indexed", indexed, docs.len());
        indexed
    }

    /// Search ids matching any query token / 搜索
    pub fn search(&self, query: &str) -> HashSet<i64> {
        let mut ids = HashSet::new();
        let tokens = tokenize_query(query);
        if tokens.is_empty() {
            return ids;
        }

        let inner = self.inner.read();
        for token in &tokens {
            for index in inner.fields.values() {
                index.collect_prefix(token, &mut ids);
            }
        }
        ids
    }

    /// Drop every document / 清空索引
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        *inner = IndexInner::default();
        inner.touch();
    }

    pub fn contains(&self, id: i64) -> bool {
        self.inner.read().entries.contains_key(&id)
    }

    /// Indexed fields of a document, for consistency checks / 获取已索引字段
    pub fn entry(&self, id: i64) -> Option<IndexedEntry> {
        self.inner.read().entries.get(&id).cloned()
    }

    /// 获取文档数量
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get index statistics / 获取索引统计信息
    pub fn stats(&self) -> IndexStats {
        let inner = self.inner.read();
        let mut tokens: HashSet<&str> = HashSet::new();
        for index in inner.fields.values() {
            tokens.extend(index.postings.keys().map(String::as_str));
        }
        IndexStats {
            document_count: inner.entries.len(),
            token_count: tokens.len(),
            last_updated: inner.last_updated,
        }
    }
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new()
    }
}
