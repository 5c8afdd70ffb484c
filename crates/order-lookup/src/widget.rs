//! 订单查询状态机
//!
//! 每次查询：`Idle → Loading → {Success | Error}`。查询可以重叠，
//! 每次查询领取一个递增的令牌，响应返回时若令牌已不是最新，
//! 直接丢弃：既不渲染也不隐藏加载指示器，这两件事归最新一次查询。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::fetcher::OrderFetcher;
use crate::render::{EMPTY_INPUT_ALERT, render_error, render_order};
use crate::view::LookupView;

/// 输入框上的按键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Char(char),
    Other,
}

/// 显示区域所处状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupState {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// 一次触发的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// 按键不触发查询
    Ignored,
    /// 输入为空，已提示且未发请求
    Alerted,
    /// 最新查询，已渲染
    Rendered(LookupState),
    /// 已有更新的查询，本次响应被丢弃
    Discarded,
}

pub struct LookupWidget {
    fetcher: Arc<dyn OrderFetcher>,
    view: Arc<dyn LookupView>,
    latest: AtomicU64,
    // 令牌比较与写显示在同一把锁内完成
    state: Mutex<LookupState>,
}

impl LookupWidget {
    pub fn new(fetcher: Arc<dyn OrderFetcher>, view: Arc<dyn LookupView>) -> Self {
        Self {
            fetcher,
            view,
            latest: AtomicU64::new(0),
            state: Mutex::new(LookupState::Idle),
        }
    }

    pub fn state(&self) -> LookupState {
        *self.state.lock()
    }

    /// 输入框按键：只有 Enter 触发查询，等同点击按钮
    pub async fn on_key(&self, key: Key, input: &str) -> LookupOutcome {
        match key {
            Key::Enter => self.on_click(input).await,
            _ => LookupOutcome::Ignored,
        }
    }

    /// 点击查询按钮
    pub async fn on_click(&self, input: &str) -> LookupOutcome {
        let order_id = input.trim();
        if order_id.is_empty() {
            self.view.alert(EMPTY_INPUT_ALERT);
            return LookupOutcome::Alerted;
        }

        let token = {
            let mut state = self.state.lock();
            let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
            *state = LookupState::Loading;
            self.view.set_loading(true);
            self.view.clear();
            token
        };
        debug!(token, order_id, "开始查询订单");

        let result = self.fetcher.fetch_order(order_id).await;

        let mut state = self.state.lock();
        if self.latest.load(Ordering::SeqCst) != token {
            debug!(token, order_id, "已有更新的查询，丢弃本次响应");
            return LookupOutcome::Discarded;
        }

        let rendered = match result {
            Ok(value) => {
                self.view.show_result(&render_order(&value));
                info!(order_id, "订单查询完成");
                LookupState::Success
            }
            Err(e) => {
                warn!(order_id, error = %e, "订单查询失败");
                self.view.show_error(&render_error(&e.to_string()));
                LookupState::Error
            }
        };
        self.view.set_loading(false);
        *state = rendered;

        LookupOutcome::Rendered(rendered)
    }
}
