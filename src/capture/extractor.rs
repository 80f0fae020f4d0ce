//! Content extraction from rendered page snapshots / 页面内容提取
//!
//! Two extractors share the same output shape:
//! - `ArticleExtractor` reads the main article region and page metadata
//! - `FallbackExtractor` derives title and content from generic page structure

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::capture::policy::hostname;
use crate::config::ContentLimits;
use crate::error::CaptureError;
use crate::models::{PartialDocument, UNTITLED};
use crate::search::tokenizer::{count_words, reading_time};

/// Document ready state reported by a fully loaded page / 页面加载完成状态
pub const READY_STATE_COMPLETE: &str = "complete";

/// Rendered document of one surface at one moment / 页面快照
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    #[serde(default = "default_ready_state", alias = "ready_state")]
    pub ready_state: String,
}

fn default_ready_state() -> String {
    READY_STATE_COMPLETE.to_string()
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            ready_state: default_ready_state(),
        }
    }

    pub fn with_ready_state(mut self, state: impl Into<String>) -> Self {
        self.ready_state = state.into();
        self
    }
}

/// Turns a snapshot into a capture candidate / 内容提取器
#[async_trait]
pub trait PageExtractor: Send + Sync {
    /// Extractor name used in logs / 名称
    fn name(&self) -> &'static str;

    /// Err when the snapshot yields no usable content / 无可用内容时返回错误
    async fn extract(&self, snapshot: &PageSnapshot) -> Result<PartialDocument, CaptureError>;
}

fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).unwrap_or_else(|e| panic!("invalid selector {}: {:?}", selector, e))
}

static TITLE: Lazy<Selector> = Lazy::new(|| css("title"));
static H1: Lazy<Selector> = Lazy::new(|| css("h1"));
static H2: Lazy<Selector> = Lazy::new(|| css("h2"));
pub(crate) static BODY: Lazy<Selector> = Lazy::new(|| css("body"));
static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| css(r#"meta[name="description"]"#));
static OG_DESCRIPTION: Lazy<Selector> = Lazy::new(|| css(r#"meta[property="og:description"]"#));
static OG_TITLE: Lazy<Selector> = Lazy::new(|| css(r#"meta[property="og:title"]"#));
static OG_SITE_NAME: Lazy<Selector> = Lazy::new(|| css(r#"meta[property="og:site_name"]"#));

/// Main content regions, most specific first / 主内容区域
pub(crate) static MAIN_REGIONS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "article",
        "main",
        r#"[role="main"]"#,
        "#main",
        ".main-content",
        ".content",
    ]
    .into_iter()
    .map(css)
    .collect()
});

const NON_VISIBLE: &[&str] = &["script", "style", "noscript", "template", "svg"];

/// Visible text of an element, one text run per line / 可见文本
pub(crate) fn visible_text(element: ElementRef<'_>) -> String {
    element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .map(|e| NON_VISIBLE.contains(&e.name()))
                    .unwrap_or(false)
            });
            if hidden {
                return None;
            }
            let text = text.trim();
            (!text.is_empty()).then_some(text)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Visible body text of a parsed document / 正文文本
pub(crate) fn body_text(doc: &Html) -> String {
    doc.select(&BODY).next().map(visible_text).unwrap_or_default()
}

fn first_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .find(|t| !t.is_empty())
}

fn meta_content(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .filter_map(|m| m.value().attr("content"))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Fill counts and the excerpt fallback the same way for both extractors / 统一计算字数与摘要
fn finish(
    url: &str,
    title: String,
    text: &str,
    description: Option<String>,
    site_name: Option<String>,
    limits: &ContentLimits,
) -> PartialDocument {
    let content = truncate_chars(text, limits.max_content_length).trim().to_string();
    let word_count = count_words(&content);
    let excerpt = description
        .unwrap_or_else(|| truncate_chars(&content, limits.excerpt_length))
        .trim()
        .to_string();

    PartialDocument {
        url: url.to_string(),
        title: Some(title),
        excerpt: Some(excerpt),
        site_name: site_name.or_else(|| hostname(url)),
        word_count: Some(word_count),
        reading_time: Some(reading_time(word_count)),
        content: Some(content),
    }
}

/// Primary extractor: main article region plus metadata / 主提取器
#[derive(Debug, Clone, Default)]
pub struct ArticleExtractor {
    limits: ContentLimits,
}

impl ArticleExtractor {
    pub fn new(limits: ContentLimits) -> Self {
        Self { limits }
    }

    fn parse(&self, snapshot: &PageSnapshot) -> Result<PartialDocument, CaptureError> {
        let doc = Html::parse_document(&snapshot.html);

        // Largest text among the candidate regions wins
        let article = MAIN_REGIONS
            .iter()
            .flat_map(|sel| doc.select(sel))
            .map(visible_text)
            .max_by_key(|text| text.chars().count())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| CaptureError::ExtractionFailed {
                url: snapshot.url.clone(),
                reason: "no article region".to_string(),
            })?;

        let title = meta_content(&doc, &OG_TITLE)
            .or_else(|| first_text(&doc, &TITLE))
            .unwrap_or_else(|| UNTITLED.to_string());
        let description = meta_content(&doc, &META_DESCRIPTION).or_else(|| meta_content(&doc, &OG_DESCRIPTION));
        let site_name = meta_content(&doc, &OG_SITE_NAME);

        Ok(finish(&snapshot.url, title, &article, description, site_name, &self.limits))
    }
}

#[async_trait]
impl PageExtractor for ArticleExtractor {
    fn name(&self) -> &'static str {
        "article"
    }

    async fn extract(&self, snapshot: &PageSnapshot) -> Result<PartialDocument, CaptureError> {
        self.parse(snapshot)
    }
}

/// Simplified extractor over the whole body / 备用提取器
#[derive(Debug, Clone, Default)]
pub struct FallbackExtractor {
    limits: ContentLimits,
}

impl FallbackExtractor {
    pub fn new(limits: ContentLimits) -> Self {
        Self { limits }
    }

    fn parse(&self, snapshot: &PageSnapshot) -> Result<PartialDocument, CaptureError> {
        let doc = Html::parse_document(&snapshot.html);
        let text = body_text(&doc);

        let length = text.chars().count();
        if length < self.limits.min_content_length {
            return Err(CaptureError::NoContent {
                url: snapshot.url.clone(),
                length,
            });
        }

        let title = first_text(&doc, &TITLE)
            .or_else(|| first_text(&doc, &H1))
            .or_else(|| first_text(&doc, &H2))
            .unwrap_or_else(|| UNTITLED.to_string());
        let description = meta_content(&doc, &META_DESCRIPTION);

        Ok(finish(&snapshot.url, title, &text, description, None, &self.limits))
    }
}

#[async_trait]
impl PageExtractor for FallbackExtractor {
    fn name(&self) -> &'static str {
        "fallback"
    }

    async fn extract(&self, snapshot: &PageSnapshot) -> Result<PartialDocument, CaptureError> {
        self.parse(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE: &str = r#"<html><head>
        <title>Rust Weekly</title>
        <meta property="og:site_name" content="This Week in Rust">
        <meta name="description" content="News about the Rust language">
        <script>var tracking = "ignored words";</script>
        </head><body>
        <nav>Home About</nav>
        <article><h1>Issue 500</h1><p>Ownership and borrowing explained.</p>
        <style>.x { color: red }</style></article>
        </body></html>"#;

    #[tokio::test]
    async fn test_article_extraction() {
        let page = ArticleExtractor::default()
            .extract(&PageSnapshot::new("https://this-week-in-rust.org/blog", ARTICLE))
            .await
            .unwrap();

        assert_eq!(page.title.as_deref(), Some("Rust Weekly"));
        assert_eq!(page.site_name.as_deref(), Some("This Week in Rust"));
        assert_eq!(page.excerpt.as_deref(), Some("News about the Rust language"));
        let content = page.content.unwrap();
        assert!(content.contains("Ownership and borrowing"));
        assert!(!content.contains("Home About"));
        assert!(!content.contains("color: red"));
        assert_eq!(page.word_count, Some(6));
        assert_eq!(page.reading_time, Some(1));
    }

    #[tokio::test]
    async fn test_article_requires_region() {
        let html = "<html><body><div>Just a div</div></body></html>";
        let err = ArticleExtractor::default()
            .extract(&PageSnapshot::new("https://a.test", html))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::ExtractionFailed { .. }));
    }

    #[tokio::test]
    async fn test_article_defaults() {
        let html = "<html><body><main>Some main text here</main></body></html>";
        let page = ArticleExtractor::default()
            .extract(&PageSnapshot::new("https://Docs.Example.com/a", html))
            .await
            .unwrap();
        assert_eq!(page.title.as_deref(), Some(UNTITLED));
        assert_eq!(page.site_name.as_deref(), Some("docs.example.com"));
        assert_eq!(page.excerpt.as_deref(), Some("Some main text here"));
    }

    #[tokio::test]
    async fn test_content_truncated_to_limit() {
        let limits = ContentLimits {
            max_content_length: 20,
            excerpt_length: 5,
            min_content_length: 1,
        };
        let html = format!("<html><body><article>{}</article></body></html>", "word ".repeat(100));
        let page = ArticleExtractor::new(limits)
            .extract(&PageSnapshot::new("https://a.test", html))
            .await
            .unwrap();
        assert!(page.content.unwrap().chars().count() <= 20);
        assert_eq!(page.excerpt.as_deref(), Some("word"));
        assert_eq!(page.word_count, Some(4));
    }

    #[tokio::test]
    async fn test_fallback_title_from_heading() {
        let body = "A paragraph that is long enough to pass the minimum content length check.";
        let html = format!("<html><body><h2>Sub</h2><h1>Heading</h1><p>{}</p></body></html>", body);
        let page = FallbackExtractor::default()
            .extract(&PageSnapshot::new("https://b.test/x", html))
            .await
            .unwrap();
        assert_eq!(page.title.as_deref(), Some("Heading"));
        assert_eq!(page.site_name.as_deref(), Some("b.test"));
        assert!(page.has_content());
    }

    #[tokio::test]
    async fn test_fallback_rejects_short_pages() {
        let err = FallbackExtractor::default()
            .extract(&PageSnapshot::new("https://b.test", "<html><body>tiny</body></html>"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::NoContent { length: 4, .. }));
    }

    #[test]
    fn test_snapshot_ready_state_default() {
        let snapshot: PageSnapshot = serde_json::from_str(r#"{"url":"https://a.test","html":""}"#).unwrap();
        assert_eq!(snapshot.ready_state, READY_STATE_COMPLETE);
    }
}
