//! Capture pipeline - navigation in, stored and indexed pages out / 页面捕获
//!
//! - `policy`: skip list and domain filter / 捕获策略
//! - `extractor`: article and fallback extractors over a page snapshot / 内容提取
//! - `readiness`: bounded readiness polling helpers / 就绪检测
//! - `coordinator`: per-attempt state machine and surface tracking / 捕获协调

pub mod coordinator;
pub mod extractor;
pub mod policy;
pub mod readiness;

pub use coordinator::{
    CaptureCoordinator, CaptureReport, CaptureState, NavigationEvent, PageSource, SnapshotRegistry, SurfaceTracker,
};
pub use extractor::{ArticleExtractor, FallbackExtractor, PageExtractor, PageSnapshot};
pub use policy::PolicyRejection;
pub use readiness::{DefaultReadiness, ReadinessProbe, Sleeper, TokioSleeper};
