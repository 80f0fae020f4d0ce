use std::sync::Arc;

use finder_backend::capture::{CaptureCoordinator, SnapshotRegistry};
use finder_backend::config::AppConfig;
use finder_backend::error::LibraryError;
use finder_backend::search::QueryEngine;
use finder_backend::settings::SqliteSettings;
use finder_backend::PageLibrary;

/// Shared application state / 应用共享状态
pub struct AppState {
    pub library: Arc<PageLibrary>,
    pub query: QueryEngine,
    pub settings: Arc<SqliteSettings>,
    /// Latest rendered document per surface, pushed by the host / 各标签页最新快照
    pub snapshots: Arc<SnapshotRegistry>,
    pub coordinator: Arc<CaptureCoordinator>,
}

impl AppState {
    /// Open the page library and wire the capture pipeline / 初始化
    pub async fn new(config: &AppConfig) -> Result<Self, LibraryError> {
        let library = Arc::new(PageLibrary::open(config).await?);
        Ok(Self::with_library(library, config))
    }

    pub fn with_library(library: Arc<PageLibrary>, config: &AppConfig) -> Self {
        let settings = Arc::new(SqliteSettings::new(library.store().pool().clone()));
        let snapshots = Arc::new(SnapshotRegistry::new());
        let coordinator = Arc::new(CaptureCoordinator::new(
            library.clone(),
            settings.clone(),
            snapshots.clone(),
            config,
        ));

        Self {
            query: QueryEngine::new(library.clone()),
            library,
            settings,
            snapshots,
            coordinator,
        }
    }
}
