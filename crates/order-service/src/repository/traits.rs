//! 仓储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，支持 mock 测试

use async_trait::async_trait;
use order_shared::error::Result;

use crate::models::Order;

/// 订单仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderRepositoryTrait: Send + Sync {
    /// 在单个事务中写入订单及其收货、支付、商品记录
    async fn create_order(&self, order: &Order) -> Result<()>;
    async fn get_all_orders(&self) -> Result<Vec<Order>>;
    async fn get_order_by_id(&self, order_uid: &str) -> Result<Option<Order>>;
    async fn ping(&self) -> Result<()>;
}
