//! HTTP 层错误类型
//!
//! 将共享的 `OrderError` 映射为 HTTP 状态码与 `{"error": ..., "code": ...}` 响应体。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use order_shared::error::OrderError;
use serde_json::json;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// 订单 HTTP 接口错误
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Order(#[from] OrderError),
}

impl ApiError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Order(e) => match e {
                OrderError::NotFound { .. } => StatusCode::NOT_FOUND,
                OrderError::AlreadyExists { .. } => StatusCode::CONFLICT,
                OrderError::Validation(_) => StatusCode::BAD_REQUEST,
                OrderError::Database(_)
                | OrderError::Migration(_)
                | OrderError::Kafka(_)
                | OrderError::Config(_)
                | OrderError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Order(e) => e.code(),
        }
    }

    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Order(OrderError::NotFound { id, .. }) => format!("Order {id} not found"),
            Self::Order(OrderError::AlreadyExists { value, .. }) => {
                format!("Order {value} already exists")
            }
            Self::Order(OrderError::Validation(message)) => format!("Validation failed: {message}"),
            Self::Order(e) => {
                tracing::error!(error = %e, code = e.code(), "订单请求处理失败");
                INTERNAL_MESSAGE.to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = json!({
            "error": self.public_message(),
            "code": self.error_code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
