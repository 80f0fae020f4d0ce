//! Capture coordinator - navigation events to stored, indexed pages / 捕获协调器
//!
//! Each attempt walks an explicit state machine:
//! `Idle → PolicyCheck → AwaitingReadiness → Extracting → [FallbackExtracting] → Persisting → Indexed`,
//! with `Abandoned` as the only failure state. Automatic captures run as
//! independent tasks and only log their failures; manual captures return them.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::extractor::{ArticleExtractor, FallbackExtractor, PageExtractor, PageSnapshot};
use super::policy::{self, PolicyRejection};
use super::readiness::{DefaultReadiness, ReadinessProbe, Sleeper, TokioSleeper};
use crate::config::{AppConfig, CaptureConfig};
use crate::error::CaptureError;
use crate::library::PageLibrary;
use crate::models::{PartialDocument, UpsertOutcome};
use crate::settings::{CaptureSettings, SettingsSource};

/// Capture attempt state / 捕获状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CaptureState {
    Idle,
    PolicyCheck,
    AwaitingReadiness,
    Extracting,
    FallbackExtracting,
    Persisting,
    Indexed,
    Abandoned,
}

/// Navigation notification from the host / 导航事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEvent {
    #[serde(alias = "surface_id")]
    pub surface_id: String,
    pub url: String,
    #[serde(default = "default_true", alias = "is_main_frame")]
    pub is_main_frame: bool,
    /// Client-side route change (SPA) / 单页应用路由变化
    #[serde(default, alias = "is_history_state_change")]
    pub is_history_state_change: bool,
}

fn default_true() -> bool {
    true
}

/// Trace of one capture attempt / 捕获过程记录
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureReport {
    pub url: String,
    pub surface_id: Option<String>,
    pub transitions: Vec<CaptureState>,
    pub readiness_attempts: u32,
    pub extractor: Option<&'static str>,
    pub outcome: Option<UpsertOutcome>,
    pub error: Option<String>,
}

impl CaptureReport {
    fn new(url: &str, surface_id: Option<&str>) -> Self {
        Self {
            url: url.to_string(),
            surface_id: surface_id.map(str::to_string),
            transitions: Vec::new(),
            readiness_attempts: 0,
            extractor: None,
            outcome: None,
            error: None,
        }
    }

    fn enter(&mut self, state: CaptureState) {
        tracing::trace!("Capture {} -> {:?}", self.url, state);
        self.transitions.push(state);
    }

    /// Current state; `Idle` before the first transition / 当前状态
    pub fn state(&self) -> CaptureState {
        self.transitions.last().copied().unwrap_or(CaptureState::Idle)
    }

    pub fn is_indexed(&self) -> bool {
        self.state() == CaptureState::Indexed
    }
}

/// Current rendered document of a surface / 页面快照来源
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn snapshot(&self, surface_id: &str) -> Option<PageSnapshot>;
}

/// Latest snapshot pushed by the host for each surface / 快照登记表
#[derive(Default)]
pub struct SnapshotRegistry {
    snapshots: RwLock<HashMap<String, PageSnapshot>>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, surface_id: &str, snapshot: PageSnapshot) {
        self.snapshots.write().insert(surface_id.to_string(), snapshot);
    }

    pub fn remove(&self, surface_id: &str) -> bool {
        self.snapshots.write().remove(surface_id).is_some()
    }
}

#[async_trait]
impl PageSource for SnapshotRegistry {
    async fn snapshot(&self, surface_id: &str) -> Option<PageSnapshot> {
        self.snapshots.read().get(surface_id).cloned()
    }
}

/// Last seen URL per surface, used to drop repeated notifications / 标签页最后 URL
#[derive(Default)]
pub struct SurfaceTracker {
    last_urls: Mutex<HashMap<String, String>>,
}

impl SurfaceTracker {
    /// Record `url` for the surface; false when it is unchanged / 记录 URL，未变化时返回 false
    pub fn observe(&self, surface_id: &str, url: &str) -> bool {
        let mut last_urls = self.last_urls.lock();
        if last_urls.get(surface_id).map(String::as_str) == Some(url) {
            return false;
        }
        last_urls.insert(surface_id.to_string(), url.to_string());
        true
    }

    pub fn forget(&self, surface_id: &str) {
        self.last_urls.lock().remove(surface_id);
    }

    pub fn len(&self) -> usize {
        self.last_urls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Capture coordinator / 捕获协调器
pub struct CaptureCoordinator {
    library: Arc<PageLibrary>,
    settings: Arc<dyn SettingsSource>,
    source: Arc<dyn PageSource>,
    primary: Arc<dyn PageExtractor>,
    fallback: Arc<dyn PageExtractor>,
    probe: Arc<dyn ReadinessProbe>,
    sleeper: Arc<dyn Sleeper>,
    timing: CaptureConfig,
    surfaces: SurfaceTracker,
}

impl CaptureCoordinator {
    pub fn new(
        library: Arc<PageLibrary>,
        settings: Arc<dyn SettingsSource>,
        source: Arc<dyn PageSource>,
        config: &AppConfig,
    ) -> Self {
        Self {
            library,
            settings,
            source,
            primary: Arc::new(ArticleExtractor::new(config.content.clone())),
            fallback: Arc::new(FallbackExtractor::new(config.content.clone())),
            probe: Arc::new(DefaultReadiness::new(config.content.min_content_length)),
            sleeper: Arc::new(TokioSleeper),
            timing: config.capture.clone(),
            surfaces: SurfaceTracker::default(),
        }
    }

    pub fn with_extractors(mut self, primary: Arc<dyn PageExtractor>, fallback: Arc<dyn PageExtractor>) -> Self {
        self.primary = primary;
        self.fallback = fallback;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn surfaces(&self) -> &SurfaceTracker {
        &self.surfaces
    }

    /// Surface closed: forget its last URL; a pending capture still finishes / 标签页关闭
    pub fn forget_surface(&self, surface_id: &str) {
        self.surfaces.forget(surface_id);
    }

    /// Schedule an automatic capture for a navigation, if it warrants one / 处理导航事件
    ///
    /// Returns `None` for sub-frame navigations and for repeats of the
    /// surface's last seen URL.
    pub fn handle_navigation(self: &Arc<Self>, event: NavigationEvent) -> Option<JoinHandle<CaptureReport>> {
        if !event.is_main_frame {
            return None;
        }
        if !self.surfaces.observe(&event.surface_id, &event.url) {
            tracing::trace!("Surface {} still at {}, skipping", event.surface_id, event.url);
            return None;
        }

        let coordinator = Arc::clone(self);
        Some(tokio::spawn(async move {
            let report = coordinator
                .capture_navigation(&event.surface_id, &event.url, event.is_history_state_change)
                .await;
            if let Some(error) = &report.error {
                tracing::debug!("Auto capture of {} abandoned: {}", report.url, error);
            }
            report
        }))
    }

    /// Run one automatic capture to completion / 执行一次自动捕获
    pub async fn capture_navigation(&self, surface_id: &str, url: &str, is_spa: bool) -> CaptureReport {
        let mut report = CaptureReport::new(url, Some(surface_id));
        match self.run_auto(&mut report, surface_id, url, is_spa).await {
            Ok(outcome) => {
                tracing::info!(
                    "Captured {} ({} words){}",
                    outcome.record.url,
                    outcome.record.word_count,
                    if is_spa { " [spa]" } else { "" }
                );
                report.outcome = Some(outcome);
            }
            Err(e) => {
                if matches!(e, CaptureError::PersistenceFailed(_)) {
                    tracing::warn!("Failed to capture {}: {}", url, e);
                }
                report.enter(CaptureState::Abandoned);
                report.error = Some(e.to_string());
            }
        }
        report
    }

    /// Capture a snapshot on request / 手动捕获
    ///
    /// Skips the auto-capture toggle and the domain filter; internal URLs are
    /// still refused.
    pub async fn capture_manual(&self, snapshot: PageSnapshot) -> Result<CaptureReport, CaptureError> {
        let mut report = CaptureReport::new(&snapshot.url, None);
        match self.run_manual(&mut report, snapshot).await {
            Ok(outcome) => {
                tracing::info!("Manually captured {}", outcome.record.url);
                report.outcome = Some(outcome);
                Ok(report)
            }
            Err(e) => {
                tracing::warn!("Manual capture of {} failed: {}", report.url, e);
                report.enter(CaptureState::Abandoned);
                Err(e)
            }
        }
    }

    async fn run_manual(&self, report: &mut CaptureReport, snapshot: PageSnapshot) -> Result<UpsertOutcome, CaptureError> {
        report.enter(CaptureState::PolicyCheck);
        policy::check_skip_list(&snapshot.url).map_err(|reason| rejected(&snapshot.url, reason))?;

        let candidate = self.extract(report, &snapshot).await?;
        self.persist(report, &candidate).await
    }

    async fn run_auto(
        &self,
        report: &mut CaptureReport,
        surface_id: &str,
        url: &str,
        is_spa: bool,
    ) -> Result<UpsertOutcome, CaptureError> {
        report.enter(CaptureState::PolicyCheck);
        let settings = self.settings.load().await?;
        check_auto(url, &settings)?;

        self.sleeper.sleep(self.timing.settle_delay(is_spa)).await;

        report.enter(CaptureState::AwaitingReadiness);
        let snapshot = self.await_readiness(report, surface_id, url).await?;

        let candidate = self.extract(report, &snapshot).await?;
        self.persist(report, &candidate).await
    }

    /// Bounded best-effort wait; proceeds with the last snapshot even if never ready / 有限次就绪等待
    ///
    /// Only snapshots of `url` count. A snapshot left over from the surface's
    /// previous page, or from a page it moved on to, is ignored.
    async fn await_readiness(
        &self,
        report: &mut CaptureReport,
        surface_id: &str,
        url: &str,
    ) -> Result<PageSnapshot, CaptureError> {
        let mut latest: Option<PageSnapshot> = None;

        for attempt in 0..=self.timing.max_retries {
            report.readiness_attempts = attempt + 1;
            match self.source.snapshot(surface_id).await {
                Some(snapshot) if snapshot.url == url => latest = Some(snapshot),
                Some(snapshot) => {
                    tracing::trace!("Surface {} shows {}, waiting for {}", surface_id, snapshot.url, url);
                }
                None => {}
            }
            if latest.as_ref().map(|s| self.probe.is_ready(s)).unwrap_or(false) {
                break;
            }
            if attempt == self.timing.max_retries {
                tracing::debug!("Surface {} not ready after {} retries, capturing anyway", surface_id, attempt);
                break;
            }
            tracing::trace!("Surface {} not ready, retry {}/{}", surface_id, attempt + 1, self.timing.max_retries);
            self.sleeper.sleep(self.timing.retry_delay()).await;
        }

        latest.ok_or_else(|| CaptureError::NoSnapshot {
            surface_id: surface_id.to_string(),
            url: url.to_string(),
        })
    }

    async fn extract(&self, report: &mut CaptureReport, snapshot: &PageSnapshot) -> Result<PartialDocument, CaptureError> {
        report.enter(CaptureState::Extracting);
        let primary_error = match self.primary.extract(snapshot).await {
            Ok(candidate) if candidate.has_content() => {
                report.extractor = Some(self.primary.name());
                return Ok(candidate);
            }
            Ok(_) => "no content".to_string(),
            Err(e) => e.to_string(),
        };
        tracing::debug!("{} extractor gave up on {}: {}", self.primary.name(), snapshot.url, primary_error);

        report.enter(CaptureState::FallbackExtracting);
        let fallback_error = match self.fallback.extract(snapshot).await {
            Ok(candidate) if candidate.has_content() => {
                report.extractor = Some(self.fallback.name());
                return Ok(candidate);
            }
            Ok(_) => "no content".to_string(),
            Err(e) => e.to_string(),
        };

        Err(CaptureError::ExtractionExhausted {
            url: snapshot.url.clone(),
            primary: primary_error,
            fallback: fallback_error,
        })
    }

    async fn persist(&self, report: &mut CaptureReport, candidate: &PartialDocument) -> Result<UpsertOutcome, CaptureError> {
        report.enter(CaptureState::Persisting);
        let outcome = self.library.save(candidate).await?;
        report.enter(CaptureState::Indexed);
        Ok(outcome)
    }
}

fn rejected(url: &str, reason: PolicyRejection) -> CaptureError {
    CaptureError::PolicyRejected {
        url: url.to_string(),
        reason,
    }
}

fn check_auto(url: &str, settings: &CaptureSettings) -> Result<(), CaptureError> {
    if !settings.auto_capture_enabled {
        return Err(CaptureError::Disabled);
    }
    policy::evaluate(url, settings).map_err(|reason| rejected(url, reason))
}
