//! Query engine - index lookup, record resolution, ranking and highlighting / 查询引擎
//!
//! Ranking is by recency only: newest capture first, ties by newest id.

use std::cmp::Ordering;
use std::sync::Arc;

use super::highlight::{highlight, preview};
use super::schema::{SearchOptions, SearchResult};
use crate::error::LibraryError;
use crate::library::PageLibrary;
use crate::models::CapturedDocument;

/// Characters of content shown when a page has no excerpt / 内容预览长度
pub const PREVIEW_CHARS: usize = 200;

/// Query engine over a page library / 查询引擎
#[derive(Clone)]
pub struct QueryEngine {
    library: Arc<PageLibrary>,
}

impl QueryEngine {
    pub fn new(library: Arc<PageLibrary>) -> Self {
        Self { library }
    }

    /// Ranked pages for `text`; a blank query returns every page / 查询（空查询返回全部）
    pub async fn query(&self, text: &str) -> Result<Vec<CapturedDocument>, LibraryError> {
        let mut pages = if text.trim().is_empty() {
            self.library.get_all().await?
        } else {
            let ids: Vec<i64> = self.library.index().search(text).into_iter().collect();
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            self.library.store().get_by_ids(&ids).await?
        };

        pages.sort_by(by_recency);
        Ok(pages)
    }

    /// Ranked, paged and highlighted results / 带高亮的分页结果
    ///
    /// Returns the page of results plus the total number of matches.
    pub async fn search(&self, options: &SearchOptions) -> Result<(Vec<SearchResult>, usize), LibraryError> {
        let pages = self.query(&options.query).await?;
        let total = pages.len();
        let limit = if options.limit == 0 { usize::MAX } else { options.limit };

        let results = pages
            .into_iter()
            .skip(options.offset)
            .take(limit)
            .map(|page| render(page, &options.query))
            .collect();

        Ok((results, total))
    }
}

/// Newest first / 按时间倒序
fn by_recency(a: &CapturedDocument, b: &CapturedDocument) -> Ordering {
    b.timestamp.cmp(&a.timestamp).then_with(|| b.id.cmp(&a.id))
}

fn render(document: CapturedDocument, query: &str) -> SearchResult {
    let snippet = if document.excerpt.is_empty() {
        preview(&document.content, PREVIEW_CHARS)
    } else {
        document.excerpt.clone()
    };

    SearchResult {
        title_html: highlight(&document.title, query),
        snippet_html: highlight(&snippet, query),
        document,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PartialDocument;
    use std::collections::HashSet;

    fn page(url: &str, title: &str, content: &str) -> PartialDocument {
        PartialDocument {
            url: url.to_string(),
            title: Some(title.to_string()),
            content: Some(content.to_string()),
            ..Default::default()
        }
    }

    async fn create_engine() -> QueryEngine {
        let library = PageLibrary::in_memory().await.unwrap();
        QueryEngine::new(Arc::new(library))
    }

    #[tokio::test]
    async fn test_empty_query_returns_everything() {
        let engine = create_engine().await;
        engine.library.save(&page("https://a.test", "A page", "alpha")).await.unwrap();
        engine.library.save(&page("https://b.test", "B page", "beta")).await.unwrap();

        let all: HashSet<i64> = engine.library.get_all().await.unwrap().into_iter().map(|p| p.id).collect();
        for blank in ["", "   ", "\t\n"] {
            let found: HashSet<i64> = engine.query(blank).await.unwrap().into_iter().map(|p| p.id).collect();
            assert_eq!(found, all);
        }
    }

    #[tokio::test]
    async fn test_empty_store_empty_query() {
        let engine = create_engine().await;
        assert!(engine.query("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_ranked_by_recency() {
        let engine = create_engine().await;
        let a = engine.library.save(&page("https://a.test", "Rust one", "")).await.unwrap().record;
        let b = engine.library.save(&page("https://b.test", "Rust two", "")).await.unwrap().record;
        // timestamps have millisecond resolution
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        // Revisit a: it becomes the most recent / 重新访问后排在最前
        engine.library.save(&PartialDocument::new("https://a.test")).await.unwrap();

        let ids: Vec<i64> = engine.query("rust").await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_query_no_match() {
        let engine = create_engine().await;
        engine.library.save(&page("https://a.test", "Alpha", "")).await.unwrap();
        assert!(engine.query("zzz").await.unwrap().is_empty());
        // punctuation-only query tokenizes to nothing / 纯标点查询无结果
        assert!(engine.query("!!!").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_highlights_and_pages() {
        let engine = create_engine().await;
        for i in 0..5 {
            engine
                .library
                .save(&page(&format!("https://p{}.test", i), "Rust notes", "learning rust daily"))
                .await
                .unwrap();
        }

        let (results, total) = engine
            .search(&SearchOptions::new("rust").with_limit(2).with_offset(1))
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title_html, "<mark>Rust</mark> notes");
        assert_eq!(results[0].snippet_html, "learning <mark>rust</mark> daily");
    }
}
