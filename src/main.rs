use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod state;

use finder_backend::config;
use state::AppState;

/// All HTTP routes / 路由表
fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::server::health_check))
        .route("/api/stats", get(api::server::get_stats))
        .route("/api/index/rebuild", post(api::server::rebuild_index))
        // 捕获
        .route("/api/navigation", post(api::capture::navigation))
        .route("/api/surfaces/:id/snapshot", post(api::capture::publish_snapshot))
        .route("/api/surfaces/:id/close", post(api::capture::close_surface))
        .route("/api/capture", post(api::capture::capture))
        // 搜索与页面
        .route("/api/search", post(api::search::search))
        .route("/api/pages", get(api::pages::list_pages))
        .route("/api/pages/export", get(api::pages::export_pages))
        .route("/api/pages/clear", post(api::pages::clear_pages))
        .route("/api/pages/:id", get(api::pages::get_page))
        .route("/api/pages/:id/delete", post(api::pages::delete_page))
        // 设置
        .route("/api/settings", get(api::settings::get_settings))
        .route("/api/settings", post(api::settings::update_settings))
        .route("/api/settings/domains/add", post(api::settings::add_domain))
        .route("/api/settings/domains/remove", post(api::settings::remove_domain))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "finder_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::load_config().map_err(anyhow::Error::msg)?;
    tracing::info!("Server will listen on {}:{}", app_config.server.host, app_config.server.port);

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    // Open the store and rebuild the search index from it / 打开存储并重建索引
    let state = Arc::new(AppState::new(&app_config).await?);
    let stats = state.library.index().stats();
    tracing::info!(
        "Search index ready: {} pages, {} distinct tokens",
        stats.document_count,
        stats.token_count
    );

    let app = router(state.clone());

    let bind_addr = app_config.get_bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server running at http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await?;

    state.library.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use finder_backend::config::AppConfig;
    use finder_backend::PageLibrary;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn create_app() -> Router {
        let library = Arc::new(PageLibrary::in_memory().await.unwrap());
        router(Arc::new(AppState::with_library(library, &AppConfig::default())))
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Value {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_app().await;
        let body = call(&app, "GET", "/api/health", None).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_capture_then_search() {
        let app = create_app().await;
        let html = "<html><head><title>Tokio tutorial</title></head><body>\
            <main>Tokio is an asynchronous runtime for the Rust programming language.</main></body></html>";

        let captured = call(&app, "POST", "/api/capture", Some(json!({"url": "https://tokio.rs/tutorial", "html": html}))).await;
        assert_eq!(captured["code"], 200);
        let id = captured["data"]["outcome"]["record"]["id"].as_i64().unwrap();

        let found = call(&app, "POST", "/api/search", Some(json!({"query": "tokio"}))).await;
        assert_eq!(found["data"]["total"], 1);
        assert_eq!(found["data"]["results"][0]["titleHtml"], "<mark>Tokio</mark> tutorial");

        let page = call(&app, "GET", &format!("/api/pages/{}", id), None).await;
        assert_eq!(page["data"]["visitCount"], 1);

        let cleared = call(&app, "POST", "/api/pages/clear", None).await;
        assert_eq!(cleared["data"]["removed"], 1);
        let empty = call(&app, "POST", "/api/search", Some(json!({"query": "tokio"}))).await;
        assert_eq!(empty["data"]["total"], 0);
    }

    #[tokio::test]
    async fn test_capture_refuses_internal_url() {
        let app = create_app().await;
        let body = call(&app, "POST", "/api/capture", Some(json!({"url": "chrome://history", "html": ""}))).await;
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_missing_page() {
        let app = create_app().await;
        assert_eq!(call(&app, "GET", "/api/pages/42", None).await["code"], 404);
        assert_eq!(call(&app, "POST", "/api/pages/42/delete", None).await["code"], 404);
    }

    #[tokio::test]
    async fn test_domain_settings() {
        let app = create_app().await;
        let added = call(
            &app,
            "POST",
            "/api/settings/domains/add",
            Some(json!({"list": "blacklist", "domain": "*.ads.test"})),
        )
        .await;
        assert_eq!(added["data"]["domainBlacklist"], json!(["*.ads.test"]));

        let invalid = call(
            &app,
            "POST",
            "/api/settings/domains/add",
            Some(json!({"list": "whitelist", "domain": "not a domain"})),
        )
        .await;
        assert_eq!(invalid["code"], 400);

        let settings = call(&app, "GET", "/api/settings", None).await;
        assert_eq!(settings["data"]["filterMode"], "blacklist");
        assert_eq!(settings["data"]["autoCaptureEnabled"], true);
    }

    #[tokio::test]
    async fn test_navigation_dedup_and_close() {
        let app = create_app().await;
        let event = json!({"surfaceId": "7", "url": "https://example.com/", "isMainFrame": true});
        assert_eq!(call(&app, "POST", "/api/navigation", Some(event.clone())).await["data"]["scheduled"], true);
        assert_eq!(call(&app, "POST", "/api/navigation", Some(event.clone())).await["data"]["scheduled"], false);

        call(&app, "POST", "/api/surfaces/7/close", None).await;
        assert_eq!(call(&app, "POST", "/api/navigation", Some(event)).await["data"]["scheduled"], true);
    }
}
