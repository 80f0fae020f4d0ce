use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use finder_backend::models::StoreStats;
use finder_backend::search::IndexStats;

use crate::api::ApiResponse;
use crate::state::AppState;

/// GET /api/health - 健康检查
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "build_time": env!("BUILD_TIME"),
    }))
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub store: StoreStats,
    pub index: IndexStats,
}

/// GET /api/stats - 存储与索引统计
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsResponse>> {
    match state.library.stats().await {
        Ok(store) => Json(ApiResponse::success(StatsResponse {
            store,
            index: state.library.index().stats(),
        })),
        Err(e) => Json(ApiResponse::internal(&e.to_string())),
    }
}

#[derive(Debug, Serialize)]
pub struct RebuildResponse {
    pub indexed: usize,
    pub consistent: bool,
}

/// POST /api/index/rebuild - 从存储重建索引
pub async fn rebuild_index(State(state): State<Arc<AppState>>) -> Json<ApiResponse<RebuildResponse>> {
    let indexed = match state.library.rebuild().await {
        Ok(n) => n,
        Err(e) => {
            tracing::error!("Index rebuild failed: {}", e);
            return Json(ApiResponse::internal(&e.to_string()));
        }
    };
    tracing::info!("Search index rebuilt with {} pages", indexed);

    match state.library.verify().await {
        Ok(consistent) => Json(ApiResponse::success(RebuildResponse { indexed, consistent })),
        Err(e) => Json(ApiResponse::internal(&e.to_string())),
    }
}
