//! 指数退避重试
//!
//! 用于启动阶段连接基础设施（数据库等）这类瞬时故障场景。

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

use crate::error::OrderError;

/// 重试策略
///
/// 第 N 次失败后等待 `initial_delay * multiplier^(N-1)`，不超过 `max_delay`。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 总尝试次数（含首次）
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            ..Default::default()
        }
    }

    /// 第 `failed` 次失败之后的等待时间（failed 从 1 开始）
    pub fn delay_after(&self, failed: u32) -> Duration {
        let exponent = failed.saturating_sub(1) as i32;
        let delay_ms = self.initial_delay.as_millis() as f64 * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }
}

/// 按策略执行异步操作
///
/// `is_retryable` 返回 false 的错误立即返回，不消耗剩余次数。
pub async fn retry_with_policy<F, Fut, T>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&OrderError) -> bool,
    mut operation: F,
) -> Result<T, OrderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, OrderError>>,
{
    let mut failed: u32 = 0;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if failed > 0 {
                    info!(operation = operation_name, attempts = failed + 1, "重试后成功");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        failed += 1;

        if !is_retryable(&err) || failed >= policy.max_attempts {
            warn!(
                operation = operation_name,
                attempt = failed,
                max_attempts = policy.max_attempts,
                error = %err,
                "操作失败，放弃重试"
            );
            return Err(err);
        }

        let delay = policy.delay_after(failed);
        warn!(
            operation = operation_name,
            attempt = failed,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "操作失败，退避后重试"
        );
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    #[test]
    fn test_delay_doubles_from_initial() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
        assert_eq!(policy.delay_after(4), Duration::from_secs(16));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy {
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(policy.delay_after(10), Duration::from_secs(5));
    }

    #[test]
    fn test_new_requires_at_least_one_attempt() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_policy(&fast_policy(5), "flaky", |_| true, || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(OrderError::Kafka("broker 不可达".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        let value = tokio_test::assert_ok!(result);
        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = retry_with_policy(&fast_policy(5), "down", |_| true, || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(OrderError::Database(sqlx::Error::PoolTimedOut))
            }
        })
        .await;

        tokio_test::assert_err!(result);
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), _> = retry_with_policy(
            &fast_policy(5),
            "invalid",
            OrderError::is_retryable,
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(OrderError::Validation("bad".to_string()))
                }
            },
        )
        .await;

        assert!(matches!(result, Err(OrderError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
