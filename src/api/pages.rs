use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use finder_backend::models::{CapturedDocument, PageExport};

use crate::api::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub removed: u64,
}

/// GET /api/pages - 全部页面（最新在前）
pub async fn list_pages(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<CapturedDocument>>> {
    match state.query.query("").await {
        Ok(pages) => Json(ApiResponse::success(pages)),
        Err(e) => Json(ApiResponse::internal(&e.to_string())),
    }
}

/// GET /api/pages/:id - 获取页面
pub async fn get_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Json<ApiResponse<CapturedDocument>> {
    match state.library.get_by_id(id).await {
        Ok(Some(page)) => Json(ApiResponse::success(page)),
        Ok(None) => Json(ApiResponse::not_found("页面不存在")),
        Err(e) => Json(ApiResponse::internal(&e.to_string())),
    }
}

/// POST /api/pages/:id/delete - 删除页面
pub async fn delete_page(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Json<ApiResponse<()>> {
    match state.library.delete(id).await {
        Ok(true) => Json(ApiResponse::success(())),
        Ok(false) => Json(ApiResponse::not_found("页面不存在")),
        Err(e) => Json(ApiResponse::internal(&e.to_string())),
    }
}

/// POST /api/pages/clear - 清空全部页面
pub async fn clear_pages(State(state): State<Arc<AppState>>) -> Json<ApiResponse<ClearResponse>> {
    match state.library.clear().await {
        Ok(removed) => Json(ApiResponse::success(ClearResponse { removed })),
        Err(e) => {
            tracing::error!("Failed to clear pages: {}", e);
            Json(ApiResponse::internal(&e.to_string()))
        }
    }
}

/// GET /api/pages/export - 导出全部页面
pub async fn export_pages(State(state): State<Arc<AppState>>) -> Json<ApiResponse<PageExport>> {
    match state.library.store().export().await {
        Ok(export) => {
            tracing::info!("Exported {} pages", export.total_pages);
            Json(ApiResponse::success(export))
        }
        Err(e) => Json(ApiResponse::internal(&e.to_string())),
    }
}
