//! 订单查询组件
//!
//! 用户输入订单号，组件请求 `GET /order/{id}` 并把 JSON 或错误渲染到结果区域。
//! 组件本身不依赖具体界面：显示通过 [`LookupView`] 抽象，网络请求通过
//! [`OrderFetcher`] 抽象，终端前端是其中一种实现。
//!
//! ## 模块结构
//!
//! - `view`: 四个界面元素的显示契约
//! - `fetcher`: 订单获取（reqwest 实现）
//! - `render`: 结果与错误文本
//! - `widget`: 查询状态机与过期响应丢弃
//! - `terminal`: 终端显示与交互循环
//! - `error`: 查询错误类型

pub mod error;
pub mod fetcher;
pub mod render;
pub mod terminal;
pub mod view;
pub mod widget;

pub use error::LookupError;
pub use fetcher::{HttpOrderFetcher, OrderFetcher};
pub use view::{Display, LookupView, MemoryView};
pub use widget::{Key, LookupOutcome, LookupState, LookupWidget};
