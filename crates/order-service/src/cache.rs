//! 订单内存缓存
//!
//! 256 个分片，按订单号的 FNV-1a 哈希选择分片，每个分片一把读写锁，
//! 读多写少的查询路径只竞争单个分片。条目带 TTL，过期后对读取不可见，
//! 由后台清理任务周期性删除。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use order_shared::observability::metrics;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::models::Order;

pub const SHARD_COUNT: usize = 256;
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(5 * 60);

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

struct CacheItem {
    order: Arc<Order>,
    expires_at: Instant,
}

impl CacheItem {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
struct CacheShard {
    items: RwLock<HashMap<String, CacheItem>>,
}

/// 分片 TTL 订单缓存
pub struct OrderCache {
    shards: Vec<CacheShard>,
    ttl: Duration,
}

impl Default for OrderCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl OrderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| CacheShard::default()).collect(),
            ttl,
        }
    }

    /// 订单号对应的分片下标
    pub fn shard_index(key: &str) -> usize {
        let hash = key.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
            (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
        });
        hash as usize % SHARD_COUNT
    }

    fn shard(&self, key: &str) -> &CacheShard {
        &self.shards[Self::shard_index(key)]
    }

    /// 写入或覆盖订单，重新计算过期时间
    pub fn set(&self, order: Order) {
        self.set_shared(Arc::new(order));
    }

    pub fn set_shared(&self, order: Arc<Order>) {
        let item = CacheItem {
            expires_at: Instant::now() + self.ttl,
            order: order.clone(),
        };
        self.shard(&order.order_uid)
            .items
            .write()
            .insert(order.order_uid.clone(), item);
    }

    /// 读取未过期的订单
    pub fn get(&self, order_uid: &str) -> Option<Arc<Order>> {
        let now = Instant::now();
        let hit = self
            .shard(order_uid)
            .items
            .read()
            .get(order_uid)
            .filter(|item| item.is_live(now))
            .map(|item| item.order.clone());

        metrics::record_cache_lookup(hit.is_some());
        hit
    }

    /// 批量写入（启动时从数据库恢复）
    pub fn load<I>(&self, orders: I) -> usize
    where
        I: IntoIterator<Item = Order>,
    {
        let mut loaded = 0;
        for order in orders {
            self.set(order);
            loaded += 1;
        }
        metrics::set_cache_entries(self.count());
        loaded
    }

    /// 未过期条目数
    pub fn count(&self) -> usize {
        let now = Instant::now();
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .items
                    .read()
                    .values()
                    .filter(|item| item.is_live(now))
                    .count()
            })
            .sum()
    }

    /// 删除所有过期条目，返回删除数量
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;
        for shard in &self.shards {
            let mut items = shard.items.write();
            let before = items.len();
            items.retain(|_, item| item.is_live(now));
            removed += before - items.len();
        }
        removed
    }

    /// 后台清理循环，直到关闭信号变为 `true`
    pub async fn run_eviction(
        self: Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_secs = interval.as_secs(), "订单缓存清理任务已启动");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("订单缓存清理任务退出");
                        return;
                    }
                }
                _ = ticker.tick() => {
                    let removed = self.evict_expired();
                    let remaining = self.count();
                    metrics::set_cache_entries(remaining);
                    debug!(removed, remaining, "已清理过期订单缓存");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_order;

    #[test]
    fn test_set_then_get() {
        let cache = OrderCache::default();
        cache.set(sample_order("b563feb7b2b84b6test"));

        let order = cache.get("b563feb7b2b84b6test").unwrap();
        assert_eq!(order.order_uid, "b563feb7b2b84b6test");
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn test_shard_index_is_fnv1a() {
        // FNV-1a 32 位参考值
        assert_eq!(OrderCache::shard_index(""), 2_166_136_261usize % SHARD_COUNT);
        assert_eq!(OrderCache::shard_index("a"), 0xe40c292c_usize % SHARD_COUNT);
        assert_eq!(
            OrderCache::shard_index("order-1"),
            OrderCache::shard_index("order-1")
        );
        assert!(OrderCache::shard_index("anything") < SHARD_COUNT);
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let cache = OrderCache::default();
        cache.set(sample_order("dup"));

        let mut updated = sample_order("dup");
        updated.track_number = "UPDATED".to_string();
        cache.set(updated);

        assert_eq!(cache.get("dup").unwrap().track_number, "UPDATED");
        assert_eq!(cache.count(), 1);
    }

    #[test]
    fn test_load_and_count() {
        let cache = OrderCache::default();
        let loaded = cache.load((0..50).map(|i| sample_order(&format!("order-{i}"))));

        assert_eq!(loaded, 50);
        assert_eq!(cache.count(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_invisible() {
        let cache = OrderCache::new(Duration::from_secs(60));
        cache.set(sample_order("short-lived"));

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.get("short-lived").is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get("short-lived").is_none());
        assert_eq!(cache.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_expired_removes_only_expired() {
        let cache = OrderCache::new(Duration::from_secs(60));
        cache.set(sample_order("old"));

        tokio::time::advance(Duration::from_secs(30)).await;
        cache.set(sample_order("new"));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(cache.evict_expired(), 1);
        assert!(cache.get("old").is_none());
        assert!(cache.get("new").is_some());
        assert_eq!(cache.evict_expired(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_loop_runs_and_stops() {
        let cache = Arc::new(OrderCache::new(Duration::from_secs(10)));
        cache.set(sample_order("evict-me"));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(cache.clone().run_eviction(Duration::from_secs(30), rx));

        tokio::time::sleep(Duration::from_secs(31)).await;
        tokio::task::yield_now().await;
        assert_eq!(cache.shards[OrderCache::shard_index("evict-me")].items.read().len(), 0);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
