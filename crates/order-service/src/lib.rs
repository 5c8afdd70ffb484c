//! 订单服务
//!
//! 从 Kafka 消费订单写入 PostgreSQL，并通过 HTTP 按订单号提供查询。
//!
//! ## 模块结构
//!
//! - `models`: 订单领域模型与校验规则
//! - `cache`: 分片 TTL 内存缓存
//! - `repository`: PostgreSQL 仓储层
//! - `service`: 缓存优先的订单服务
//! - `consumer`: Kafka 订单消费者
//! - `handlers` / `routes` / `state`: HTTP 接口
//! - `error`: HTTP 错误映射

pub mod cache;
pub mod consumer;
pub mod error;
pub mod fixtures;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;

pub use cache::OrderCache;
pub use error::ApiError;
pub use models::{Delivery, Item, Order, Payment};
pub use repository::{OrderRepository, OrderRepositoryTrait};
pub use service::OrderService;

/// 内嵌的数据库迁移
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
