//! Kafka 订单消费者
//!
//! 每条消息解码为 `Order` 后交给服务层保存。解码失败或保存失败只记录日志并跳过，
//! 不提交 offset；保存成功后由 `KafkaConsumer` 提交。

use std::sync::Arc;

use order_shared::config::KafkaConfig;
use order_shared::error::{OrderError, Result};
use order_shared::kafka::{ConsumerMessage, KafkaConsumer};
use order_shared::observability::metrics;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::models::Order;
use crate::service::OrderService;

pub struct OrderConsumer {
    consumer: KafkaConsumer,
    service: Arc<OrderService>,
}

impl OrderConsumer {
    /// 创建消费者并订阅订单 topic
    pub fn new(config: &KafkaConfig, service: Arc<OrderService>) -> Result<Self> {
        let consumer = KafkaConsumer::new(config)?;
        consumer.subscribe(&[config.topic.as_str()])?;
        Ok(Self { consumer, service })
    }

    /// 消费直到关闭信号变为 `true`
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let service = self.service;
        self.consumer
            .start(shutdown, move |msg| {
                let service = service.clone();
                async move { handle_message(&service, &msg).await }
            })
            .await;
        info!("订单消费者已停止");
    }
}

/// 处理单条订单消息
pub async fn handle_message(service: &OrderService, msg: &ConsumerMessage) -> Result<()> {
    let order: Order = match msg.deserialize_payload() {
        Ok(order) => order,
        Err(e) => {
            metrics::record_order_ingested("invalid");
            warn!(error = %e, offset = msg.offset, "订单消息无法解码");
            return Err(e);
        }
    };

    let order_uid = order.order_uid.clone();
    match service.create_order(order).await {
        Ok(()) => {
            metrics::record_order_ingested("stored");
            info!(%order_uid, offset = msg.offset, "订单已从 Kafka 入库");
            Ok(())
        }
        Err(e @ OrderError::Validation(_)) => {
            metrics::record_order_ingested("invalid");
            warn!(error = %e, %order_uid, "订单校验失败");
            Err(e)
        }
        Err(e) => {
            metrics::record_order_ingested("failed");
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::OrderCache;
    use crate::fixtures::sample_order;
    use crate::repository::MockOrderRepositoryTrait;
    use std::collections::HashMap;

    fn message(payload: Vec<u8>) -> ConsumerMessage {
        ConsumerMessage {
            topic: "orders".to_string(),
            partition: 0,
            offset: 7,
            key: None,
            payload,
            timestamp: None,
            headers: HashMap::new(),
        }
    }

    fn service(repo: MockOrderRepositoryTrait) -> (OrderService, Arc<OrderCache>) {
        let cache = Arc::new(OrderCache::default());
        (OrderService::new(Arc::new(repo), cache.clone()), cache)
    }

    #[tokio::test]
    async fn test_valid_message_is_stored_and_cached() {
        let mut repo = MockOrderRepositoryTrait::new();
        repo.expect_create_order().times(1).returning(|_| Ok(()));
        let (service, cache) = service(repo);

        let payload = serde_json::to_vec(&sample_order("kafka-order")).unwrap();
        handle_message(&service, &message(payload)).await.unwrap();

        assert!(cache.get("kafka-order").is_some());
    }

    #[tokio::test]
    async fn test_malformed_message_is_rejected_without_storage() {
        let mut repo = MockOrderRepositoryTrait::new();
        repo.expect_create_order().never();
        let (service, _cache) = service(repo);

        let err = handle_message(&service, &message(b"{not json".to_vec()))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Kafka(_)));
    }

    #[tokio::test]
    async fn test_invalid_order_is_rejected_without_storage() {
        let mut repo = MockOrderRepositoryTrait::new();
        repo.expect_create_order().never();
        let (service, _cache) = service(repo);

        let mut order = sample_order("no-items");
        order.items.clear();
        let payload = serde_json::to_vec(&order).unwrap();

        let err = handle_message(&service, &message(payload)).await.unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_storage_failure_is_returned() {
        let mut repo = MockOrderRepositoryTrait::new();
        repo.expect_create_order()
            .returning(|_| Err(OrderError::Database(sqlx::Error::PoolTimedOut)));
        let (service, cache) = service(repo);

        let payload = serde_json::to_vec(&sample_order("db-down")).unwrap();
        let err = handle_message(&service, &message(payload)).await.unwrap_err();

        assert!(matches!(err, OrderError::Database(_)));
        assert!(cache.get("db-down").is_none());
    }
}
