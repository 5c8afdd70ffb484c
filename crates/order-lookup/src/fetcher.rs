//! 订单获取

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::debug;

use crate::error::LookupError;

/// 按订单号获取订单 JSON
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderFetcher: Send + Sync {
    async fn fetch_order(&self, order_id: &str) -> Result<Value, LookupError>;
}

/// 通过 `GET {base_url}/order/{id}` 获取订单
pub struct HttpOrderFetcher {
    client: Client,
    base_url: Url,
}

impl HttpOrderFetcher {
    /// `timeout` 为空时不设置请求超时
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, LookupError> {
        let base_url =
            Url::parse(base_url).map_err(|e| LookupError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(LookupError::InvalidUrl(base_url.to_string()));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self { client, base_url })
    }

    /// 订单号作为单个路径段进行百分号编码
    pub fn order_url(&self, order_id: &str) -> Result<Url, LookupError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| LookupError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("order")
            .push(order_id);
        Ok(url)
    }
}

#[async_trait]
impl OrderFetcher for HttpOrderFetcher {
    async fn fetch_order(&self, order_id: &str) -> Result<Value, LookupError> {
        let url = self.order_url(order_id)?;
        debug!(%url, "请求订单");

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}
