//! Capture eligibility: static skip list and domain filter / 捕获策略
//!
//! Domain entries match a hostname when:
//! - equal: `example.com` matches `example.com`
//! - suffix: `example.com` matches `sub.example.com`
//! - wildcard: `*.example.com` matches `example.com` and any subdomain

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::settings::{CaptureSettings, FilterMode};

/// Internal and administrative URL prefixes never captured / 跳过的 URL 前缀
pub const SKIP_URLS: &[&str] = &[
    "chrome://",
    "chrome-extension://",
    "moz-extension://",
    "edge://",
    "about:",
    "view-source:",
    "file://",
    "data:",
];

static DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?(\.[a-zA-Z0-9]([a-zA-Z0-9-]*[a-zA-Z0-9])?)*$")
        .unwrap_or_else(|e| panic!("invalid domain regex: {}", e))
});

/// Why a URL was not captured / 拒绝原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyRejection {
    /// Internal scheme from the skip list / 内部页面
    SkipListed(&'static str),
    /// Not an absolute URL with a host / 无效 URL
    InvalidUrl,
    /// Host listed in blacklist mode / 黑名单命中
    Blacklisted(String),
    /// Host not listed in whitelist mode / 不在白名单
    NotWhitelisted(String),
}

impl std::fmt::Display for PolicyRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyRejection::SkipListed(prefix) => write!(f, "internal url ({})", prefix),
            PolicyRejection::InvalidUrl => write!(f, "invalid url"),
            PolicyRejection::Blacklisted(host) => write!(f, "{} is blacklisted", host),
            PolicyRejection::NotWhitelisted(host) => write!(f, "{} is not whitelisted", host),
        }
    }
}

/// Reject internal URLs from the static skip list / 检查内部 URL
pub fn check_skip_list(url: &str) -> Result<(), PolicyRejection> {
    let lower = url.trim().to_lowercase();
    match SKIP_URLS.iter().find(|prefix| lower.starts_with(*prefix)) {
        Some(prefix) => Err(PolicyRejection::SkipListed(*prefix)),
        None => Ok(()),
    }
}

/// Lowercased hostname of an absolute URL / 提取主机名
pub fn hostname(url: &str) -> Option<String> {
    Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_end_matches('.').to_lowercase()))
        .filter(|h| !h.is_empty())
}

/// Whether `hostname` matches any entry of `domains` / 主机名是否在列表中
pub fn host_matches(hostname: &str, domains: &[String]) -> bool {
    let host = hostname.to_lowercase();
    domains.iter().any(|entry| {
        let entry = normalize_domain_entry(entry);
        let base = entry.strip_prefix("*.").unwrap_or(entry.as_str());
        !base.is_empty() && (host == base || host.ends_with(&format!(".{}", base)))
    })
}

/// Full eligibility check for automatic capture / 自动捕获资格检查
pub fn evaluate(url: &str, settings: &CaptureSettings) -> Result<(), PolicyRejection> {
    check_skip_list(url)?;
    let host = hostname(url).ok_or(PolicyRejection::InvalidUrl)?;

    match settings.filter_mode {
        FilterMode::Whitelist => {
            if host_matches(&host, &settings.domain_whitelist) {
                Ok(())
            } else {
                Err(PolicyRejection::NotWhitelisted(host))
            }
        }
        FilterMode::Blacklist => {
            if host_matches(&host, &settings.domain_blacklist) {
                Err(PolicyRejection::Blacklisted(host))
            } else {
                Ok(())
            }
        }
    }
}

/// Trimmed, lowercased entry / 规范化域名条目
pub fn normalize_domain_entry(entry: &str) -> String {
    entry.trim().trim_end_matches('.').to_lowercase()
}

/// Accepts `example.com` or `*.example.com` / 校验域名条目
pub fn is_valid_domain_entry(entry: &str) -> bool {
    let domain = entry.strip_prefix("*.").unwrap_or(entry);
    !domain.is_empty() && domain.len() < 254 && DOMAIN_RE.is_match(domain)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(mode: FilterMode, blacklist: &[&str], whitelist: &[&str]) -> CaptureSettings {
        CaptureSettings {
            auto_capture_enabled: true,
            filter_mode: mode,
            domain_blacklist: blacklist.iter().map(|s| s.to_string()).collect(),
            domain_whitelist: whitelist.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_skip_list() {
        let s = CaptureSettings::default();
        assert_eq!(evaluate("chrome://settings", &s), Err(PolicyRejection::SkipListed("chrome://")));
        assert!(matches!(evaluate("moz-extension://abc/page.html", &s), Err(PolicyRejection::SkipListed(_))));
        assert!(matches!(evaluate("about:blank", &s), Err(PolicyRejection::SkipListed(_))));
        assert!(evaluate("https://example.com", &s).is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let s = CaptureSettings::default();
        assert_eq!(evaluate("not a url", &s), Err(PolicyRejection::InvalidUrl));
        assert_eq!(evaluate("", &s), Err(PolicyRejection::InvalidUrl));
    }

    #[test]
    fn test_whitelist_suffix_match() {
        let s = settings(FilterMode::Whitelist, &[], &["example.com"]);
        assert!(evaluate("https://sub.example.com/x", &s).is_ok());
        assert!(evaluate("https://example.com", &s).is_ok());
        assert_eq!(
            evaluate("https://other.com", &s),
            Err(PolicyRejection::NotWhitelisted("other.com".to_string()))
        );
        // suffix match is on label boundaries / 按标签边界匹配
        assert!(evaluate("https://notexample.com", &s).is_err());
    }

    #[test]
    fn test_empty_whitelist_rejects_all() {
        let s = settings(FilterMode::Whitelist, &[], &[]);
        assert!(evaluate("https://example.com", &s).is_err());
    }

    #[test]
    fn test_blacklist_modes() {
        let s = settings(FilterMode::Blacklist, &["ads.test", "*.tracker.test"], &["ads.test"]);
        assert!(matches!(evaluate("https://ads.test/banner", &s), Err(PolicyRejection::Blacklisted(_))));
        assert!(matches!(evaluate("https://x.ads.test", &s), Err(PolicyRejection::Blacklisted(_))));
        assert!(matches!(evaluate("https://a.b.tracker.test", &s), Err(PolicyRejection::Blacklisted(_))));
        assert!(matches!(evaluate("https://tracker.test", &s), Err(PolicyRejection::Blacklisted(_))));
        assert!(evaluate("https://news.test", &s).is_ok());
    }

    #[test]
    fn test_host_case_insensitive() {
        assert!(host_matches("WWW.Example.COM", &["example.com".to_string()]));
        assert!(host_matches("www.example.com", &["EXAMPLE.com".to_string()]));
    }

    #[test]
    fn test_domain_entry_validation() {
        assert!(is_valid_domain_entry("example.com"));
        assert!(is_valid_domain_entry("*.google.com"));
        assert!(is_valid_domain_entry("localhost"));
        assert!(!is_valid_domain_entry("*."));
        assert!(!is_valid_domain_entry("bad domain.com"));
        assert!(!is_valid_domain_entry("-start.com"));
        assert!(!is_valid_domain_entry(&"a".repeat(254)));
    }
}
