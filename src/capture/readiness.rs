//! Page readiness check and injectable delays / 页面就绪检测

use async_trait::async_trait;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::time::Duration;

use super::extractor::{body_text, PageSnapshot, BODY, MAIN_REGIONS, READY_STATE_COMPLETE};

/// Decides whether a snapshot looks fully rendered / 就绪判定
pub trait ReadinessProbe: Send + Sync {
    fn is_ready(&self, snapshot: &PageSnapshot) -> bool;
}

static TEST_ID: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("[data-testid]").unwrap_or_else(|e| panic!("invalid selector: {:?}", e))
});

/// Body text longer than a threshold, ready state `complete` and a main region present / 默认就绪判定
#[derive(Debug, Clone)]
pub struct DefaultReadiness {
    min_body_chars: usize,
}

impl DefaultReadiness {
    pub fn new(min_body_chars: usize) -> Self {
        Self { min_body_chars }
    }
}

impl Default for DefaultReadiness {
    fn default() -> Self {
        Self::new(50)
    }
}

impl ReadinessProbe for DefaultReadiness {
    fn is_ready(&self, snapshot: &PageSnapshot) -> bool {
        if snapshot.ready_state != READY_STATE_COMPLETE {
            return false;
        }

        let doc = Html::parse_document(&snapshot.html);
        if body_text(&doc).chars().count() <= self.min_body_chars {
            return false;
        }

        // the body itself is the last resort region
        MAIN_REGIONS
            .iter()
            .chain([&*TEST_ID, &*BODY])
            .any(|sel| doc.select(sel).next().is_some())
    }
}

/// Delay source, swapped out in tests / 延时接口
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real timer / tokio 定时器
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested delays without waiting / 记录延时但不等待
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSleeper {
    pub(crate) calls: parking_lot::Mutex<Vec<Duration>>,
}

#[cfg(test)]
#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.calls.lock().push(duration);
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: &str = "This body carries comfortably more than fifty characters of visible text.";

    #[test]
    fn test_ready_page() {
        let html = format!("<html><body><main>{}</main></body></html>", LONG);
        assert!(DefaultReadiness::default().is_ready(&PageSnapshot::new("https://a.test", html)));
    }

    #[test]
    fn test_loading_state_not_ready() {
        let html = format!("<html><body><main>{}</main></body></html>", LONG);
        let snapshot = PageSnapshot::new("https://a.test", html).with_ready_state("interactive");
        assert!(!DefaultReadiness::default().is_ready(&snapshot));
    }

    #[test]
    fn test_short_body_not_ready() {
        let html = "<html><body><main>Loading...</main><script>window.app = 'a long script body that does not count as text'</script></body></html>";
        assert!(!DefaultReadiness::default().is_ready(&PageSnapshot::new("https://a.test", html)));
    }

    #[tokio::test]
    async fn test_recording_sleeper() {
        let sleeper = RecordingSleeper::default();
        sleeper.sleep(Duration::from_millis(800)).await;
        sleeper.sleep(Duration::from_millis(800)).await;
        assert_eq!(sleeper.calls.lock().len(), 2);
    }
}
