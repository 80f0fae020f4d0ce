use axum::{extract::State, Json};
use std::sync::Arc;

use finder_backend::error::SettingsError;
use finder_backend::settings::{CaptureSettings, SettingsSource};

use super::types::*;
use crate::api::ApiResponse;
use crate::state::AppState;

fn settings_error(e: SettingsError) -> ApiResponse<CaptureSettings> {
    match e {
        SettingsError::InvalidDomain(_) | SettingsError::Duplicate(_) => ApiResponse::error(&e.to_string()),
        _ => {
            tracing::error!("Capture settings storage error: {}", e);
            ApiResponse::internal(&e.to_string())
        }
    }
}

/// GET /api/settings - 获取捕获设置
pub async fn get_settings(State(state): State<Arc<AppState>>) -> Json<ApiResponse<CaptureSettings>> {
    match state.settings.load().await {
        Ok(settings) => Json(ApiResponse::success(settings)),
        Err(e) => Json(settings_error(e)),
    }
}

/// POST /api/settings - 保存捕获设置
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CaptureSettings>,
) -> Json<ApiResponse<CaptureSettings>> {
    match state.settings.save(&req).await {
        Ok(saved) => Json(ApiResponse::success(saved)),
        Err(e) => Json(settings_error(e)),
    }
}

/// POST /api/settings/domains/add - 添加域名
pub async fn add_domain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DomainEntryRequest>,
) -> Json<ApiResponse<CaptureSettings>> {
    match state.settings.add_domain(req.list, &req.domain).await {
        Ok(saved) => Json(ApiResponse::success(saved)),
        Err(e) => Json(settings_error(e)),
    }
}

/// POST /api/settings/domains/remove - 移除域名
pub async fn remove_domain(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DomainEntryRequest>,
) -> Json<ApiResponse<CaptureSettings>> {
    match state.settings.remove_domain(req.list, &req.domain).await {
        Ok(saved) => Json(ApiResponse::success(saved)),
        Err(e) => Json(settings_error(e)),
    }
}
