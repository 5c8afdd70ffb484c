//! 应用状态定义

use std::sync::Arc;

use crate::service::OrderService;

/// Axum 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<OrderService>,
}

impl AppState {
    pub fn new(service: Arc<OrderService>) -> Self {
        Self { service }
    }
}
