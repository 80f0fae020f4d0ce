//! Search module - tokenizer, in-memory index and query engine / 搜索模块
//!
//! Architecture principles / 架构原则：
//! - The index only exposes primitive operations: add, update, remove, rebuild_from, search
//! - The page library decides when they run and keeps them in step with the store
//! - Call direction: Library → Search (unidirectional) / 调用方向
//!
//! Index features / 索引特性：
//! - Rebuilt from the record store at startup, never persisted
//! - Multilingual: CJK / Hangul / Hiragana / Thai per character, alphabetic words otherwise
//! - Forward (prefix) matching on query tokens

pub mod engine;
pub mod highlight;
pub mod query;
pub mod schema;
pub mod tokenizer;

pub use engine::{IndexStats, SearchIndex};
pub use highlight::highlight;
pub use query::QueryEngine;
pub use schema::{IndexField, SearchOptions, SearchResult};
pub use tokenizer::tokenize;
