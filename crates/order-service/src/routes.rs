//! 路由配置模块

use std::time::Duration;

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use order_shared::config::ServerConfig;
use order_shared::observability::middleware as obs_middleware;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::info;

use crate::{handlers, state::AppState};

/// 订单 API 路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/order", post(handlers::create_order))
        .route("/order/{id}", get(handlers::get_order))
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
}

/// 构建完整应用：API 路由、可选静态目录、CORS 与可观测性中间件
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = api_routes();

    if let Some(dir) = config.static_dir.as_deref().filter(|d| !d.is_empty()) {
        info!(static_dir = %dir, "挂载静态文件目录");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(cors_layer(&config.cors_origins))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}

/// CORS 配置：`*` 允许任意来源，否则按逗号分隔的来源列表
fn cors_layer(allowed_origins: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    if allowed_origins.trim() == "*" {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<HeaderValue>().ok())
            .collect();
        layer.allow_origin(origins)
    }
}
