//! 查询错误类型

use thiserror::Error;

/// 一次订单查询可能出现的错误
#[derive(Debug, Error)]
pub enum LookupError {
    /// 服务端返回非 2xx
    #[error("Server returned {status}{}", body_suffix(.body))]
    Http { status: u16, body: String },

    /// 网络层失败（连接、超时、读取响应体）
    #[error("{0}")]
    Transport(String),

    /// 响应体不是合法 JSON
    #[error("{0}")]
    Decode(String),

    #[error("invalid base url: {0}")]
    InvalidUrl(String),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(": {body}")
    }
}

impl From<reqwest::Error> for LookupError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for LookupError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
