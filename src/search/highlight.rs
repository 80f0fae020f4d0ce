//! Query highlighting / 搜索关键字高亮

use regex::RegexBuilder;

pub const MARK_OPEN: &str = "<mark>";
pub const MARK_CLOSE: &str = "</mark>";

/// Escape HTML special characters / HTML 转义
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Wrap every case-insensitive occurrence of each query word in `<mark>` / 高亮关键字
///
/// All words are matched in one pass, longest first, so a word never matches
/// inside markers added for another. The text is HTML-escaped.
pub fn highlight(text: &str, query: &str) -> String {
    let mut words: Vec<&str> = query.split_whitespace().collect();
    if text.is_empty() || words.is_empty() {
        return escape_html(text);
    }
    words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    words.dedup();

    let pattern = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    let re = match RegexBuilder::new(&pattern).case_insensitive(true).build() {
        Ok(re) => re,
        Err(e) => {
            tracing::debug!("Skipping highlight for {:?}: {}", query, e);
            return escape_html(text);
        }
    };

    let mut result = String::with_capacity(text.len() + 16);
    let mut last = 0;
    for m in re.find_iter(text) {
        result.push_str(&escape_html(&text[last..m.start()]));
        result.push_str(MARK_OPEN);
        result.push_str(&escape_html(m.as_str()));
        result.push_str(MARK_CLOSE);
        last = m.end();
    }
    result.push_str(&escape_html(&text[last..]));
    result
}

/// First `max_chars` characters, with `...` when cut / 截取预览
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highlight_words_independently() {
        assert_eq!(
            highlight("Hello brave new World", "world hello"),
            "<mark>Hello</mark> brave new <mark>World</mark>"
        );
    }

    #[test]
    fn test_highlight_every_occurrence() {
        assert_eq!(highlight("abc ABC aBc", "abc"), "<mark>abc</mark> <mark>ABC</mark> <mark>aBc</mark>");
    }

    #[test]
    fn test_highlight_escapes_regex() {
        assert_eq!(highlight("cost is $5.00 (approx)", "$5.00"), "cost is <mark>$5.00</mark> (approx)");
        assert_eq!(highlight("a+b=c", "a+b"), "<mark>a+b</mark>=c");
        assert_eq!(highlight("x.y", "(x"), "x.y");
    }

    #[test]
    fn test_highlight_never_rewrites_markers() {
        assert_eq!(highlight("Hello", "hello mark"), "<mark>Hello</mark>");
        assert_eq!(highlight("Rustacean", "rust rustacean"), "<mark>Rustacean</mark>");
        assert_eq!(highlight("rust rustacean", "rust rustacean"), "<mark>rust</mark> <mark>rustacean</mark>");
    }

    #[test]
    fn test_highlight_escapes_html() {
        assert_eq!(
            highlight("<b>Tom & Jerry</b>", "tom"),
            "&lt;b&gt;<mark>Tom</mark> &amp; Jerry&lt;/b&gt;"
        );
        assert_eq!(highlight("a<b", "a<b"), "<mark>a&lt;b</mark>");
        assert_eq!(highlight("it's", ""), "it&#x27;s");
    }

    #[test]
    fn test_highlight_cjk() {
        assert_eq!(highlight("你好世界", "世界"), "你好<mark>世界</mark>");
    }

    #[test]
    fn test_highlight_empty() {
        assert_eq!(highlight("", "abc"), "");
        assert_eq!(highlight("text", "   "), "text");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 200), "short");
        assert_eq!(preview("你好世界", 2), "你好...");
    }
}
