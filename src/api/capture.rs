use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use finder_backend::capture::{CaptureReport, NavigationEvent, PageSnapshot};
use finder_backend::error::CaptureError;

use crate::api::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct NavigationResponse {
    /// Whether an automatic capture was scheduled / 是否已安排自动捕获
    pub scheduled: bool,
}

/// POST /api/navigation - 导航通知
pub async fn navigation(
    State(state): State<Arc<AppState>>,
    Json(event): Json<NavigationEvent>,
) -> Json<ApiResponse<NavigationResponse>> {
    // The capture runs detached; its outcome only shows up in the logs
    let scheduled = state.coordinator.handle_navigation(event).is_some();
    Json(ApiResponse::success(NavigationResponse { scheduled }))
}

/// POST /api/surfaces/:id/snapshot - 推送页面快照
pub async fn publish_snapshot(
    State(state): State<Arc<AppState>>,
    Path(surface_id): Path<String>,
    Json(snapshot): Json<PageSnapshot>,
) -> Json<ApiResponse<()>> {
    state.snapshots.publish(&surface_id, snapshot);
    Json(ApiResponse::success(()))
}

/// POST /api/surfaces/:id/close - 标签页关闭
pub async fn close_surface(
    State(state): State<Arc<AppState>>,
    Path(surface_id): Path<String>,
) -> Json<ApiResponse<bool>> {
    state.coordinator.forget_surface(&surface_id);
    let had_snapshot = state.snapshots.remove(&surface_id);
    Json(ApiResponse::success(had_snapshot))
}

/// POST /api/capture - 手动捕获
pub async fn capture(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<PageSnapshot>,
) -> Json<ApiResponse<CaptureReport>> {
    match state.coordinator.capture_manual(snapshot).await {
        Ok(report) => Json(ApiResponse::success(report)),
        Err(e @ CaptureError::PersistenceFailed(_)) => Json(ApiResponse::internal(&e.to_string())),
        Err(e) => Json(ApiResponse::error(&e.to_string())),
    }
}
