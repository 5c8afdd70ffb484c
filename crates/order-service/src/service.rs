//! 订单服务
//!
//! 组合仓储与缓存：写入时先校验再落库，成功后写缓存；
//! 查询时缓存优先，未命中再查库并回填。

use std::sync::Arc;

use order_shared::error::{OrderError, Result};
use tracing::{debug, info, instrument};
use validator::Validate;

use crate::cache::OrderCache;
use crate::models::{Order, first_validation_error};
use crate::repository::OrderRepositoryTrait;

pub struct OrderService {
    repo: Arc<dyn OrderRepositoryTrait>,
    cache: Arc<OrderCache>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepositoryTrait>, cache: Arc<OrderCache>) -> Self {
        Self { repo, cache }
    }

    pub fn cache(&self) -> &Arc<OrderCache> {
        &self.cache
    }

    /// 校验订单，失败时返回第一个出错字段的信息
    pub fn validate_order(order: &Order) -> Result<()> {
        order
            .validate()
            .map_err(|errors| OrderError::Validation(first_validation_error(&errors)))
    }

    #[instrument(skip(self, order), fields(order_uid = %order.order_uid))]
    pub async fn create_order(&self, order: Order) -> Result<()> {
        Self::validate_order(&order)?;
        self.repo.create_order(&order).await?;
        self.cache.set(order);
        info!("订单已保存");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_uid: &str) -> Result<Arc<Order>> {
        if let Some(order) = self.cache.get(order_uid) {
            debug!("命中订单缓存");
            return Ok(order);
        }

        let order = self
            .repo
            .get_order_by_id(order_uid)
            .await?
            .ok_or_else(|| OrderError::order_not_found(order_uid))?;

        let order = Arc::new(order);
        self.cache.set_shared(order.clone());
        debug!("订单从数据库加载并回填缓存");
        Ok(order)
    }

    /// 从数据库恢复全部订单到缓存，返回恢复数量
    pub async fn restore_cache(&self) -> Result<usize> {
        let orders = self.repo.get_all_orders().await?;
        let loaded = self.cache.load(orders);
        info!(loaded, "订单缓存已从数据库恢复");
        Ok(loaded)
    }

    pub async fn health_check(&self) -> Result<()> {
        self.repo.ping().await
    }
}
