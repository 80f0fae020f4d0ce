use axum::{extract::State, Json};
use std::sync::Arc;

use finder_backend::search::SearchOptions;

use super::types::*;
use crate::api::ApiResponse;
use crate::state::AppState;

/// POST /api/search - 搜索已捕获页面
pub async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Json<ApiResponse<SearchResponse>> {
    let limit = req.limit.clamp(1, 500);
    let page = req.page.max(1);
    let options = SearchOptions::new(req.query.as_str())
        .with_limit(limit)
        .with_offset((page - 1) * limit);

    match state.query.search(&options).await {
        Ok((results, total)) => Json(ApiResponse::success(SearchResponse {
            results,
            total,
            page,
            limit,
        })),
        Err(e) => {
            tracing::error!("Search for {:?} failed: {}", req.query, e);
            Json(ApiResponse::internal(&e.to_string()))
        }
    }
}
