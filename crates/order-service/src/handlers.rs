//! 订单 HTTP 处理器

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::{Value, json};
use tracing::info;

use crate::error::{ApiError, Result};
use crate::models::Order;
use crate::state::AppState;

/// 查询订单
///
/// GET /order/{id}
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_uid): Path<String>,
) -> Result<Json<Order>> {
    if order_uid.trim().is_empty() {
        return Err(ApiError::BadRequest("Order ID is required".to_string()));
    }

    // 按原样查询，不去除首尾空白
    let order = state.service.get_order(&order_uid).await?;
    Ok(Json(Order::clone(&order)))
}

/// 创建订单
///
/// POST /order
pub async fn create_order(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Order>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>)> {
    let Json(order) =
        payload.map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e.body_text())))?;

    let order_uid = order.order_uid.clone();
    state.service.create_order(order).await?;
    info!(%order_uid, "Order created via HTTP");

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Order successfully created" })),
    ))
}

/// 存活探针
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "order-service"
    }))
}

/// 就绪探针：检查数据库连接并报告缓存条目数
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = state.service.health_check().await.is_ok();
    let status = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_ok { "ok" } else { "degraded" },
            "service": "order-service",
            "checks": {
                "database": if db_ok { "ok" } else { "fail" },
                "cache_entries": state.service.cache().count()
            }
        })),
    )
}
