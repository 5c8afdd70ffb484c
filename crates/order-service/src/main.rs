//! 订单服务入口
//!
//! 启动顺序：配置 → 可观测性 → 数据库（带重试）→ 迁移 → 恢复缓存 →
//! 缓存清理与 Kafka 消费后台任务 → HTTP 服务。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use order_service::{
    MIGRATOR, OrderCache, OrderRepository, OrderService, consumer::OrderConsumer, routes,
    state::AppState,
};
use order_shared::{config::AppConfig, database::Database, observability};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 加载并校验配置
    let config = AppConfig::load("order-service")?;
    config.validate()?;

    // 2. 初始化可观测性
    let _guard = observability::init(&config.service_name, &config.observability).await?;

    info!("Starting order-service on {}", config.server_addr());
    info!(environment = %config.environment, "Configuration loaded");

    // 3. 数据库连接与迁移
    let db = Database::connect_with_retry(&config.database).await?;
    db.run_migrations(&MIGRATOR).await?;
    info!("Database connection established");

    // 4. 组装服务并从数据库恢复缓存
    let cache = Arc::new(OrderCache::new(config.cache.ttl()));
    let repo = Arc::new(OrderRepository::new(db.pool().clone()));
    let service = Arc::new(OrderService::new(repo, cache.clone()));
    service.restore_cache().await?;

    // 5. 后台任务共用一个关闭信号
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let eviction = tokio::spawn(
        cache
            .clone()
            .run_eviction(config.cache.eviction_interval(), shutdown_rx.clone()),
    );

    let consumer = OrderConsumer::new(&config.kafka, service.clone())?;
    let consumption = tokio::spawn(consumer.run(shutdown_rx));

    // 6. HTTP 服务
    let app = routes::build_router(AppState::new(service), &config.server);
    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 7. 通知后台任务退出并等待
    let _ = shutdown_tx.send(true);
    let timeout = Duration::from_secs(config.server.shutdown_timeout_seconds);
    let background = async {
        if let Err(e) = eviction.await {
            error!(error = %e, "缓存清理任务异常退出");
        }
        if let Err(e) = consumption.await {
            error!(error = %e, "订单消费任务异常退出");
        }
    };
    if tokio::time::timeout(timeout, background).await.is_err() {
        warn!(timeout_secs = timeout.as_secs(), "后台任务未在超时时间内退出");
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// K8s 通过 SIGTERM 通知 Pod 停止；本地开发通过 Ctrl+C。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
