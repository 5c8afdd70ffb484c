//! 显示契约
//!
//! 对应界面上的四个元素：输入框由调用方提供文本，其余三个
//! （结果区域、加载指示器、阻塞式提示）由视图实现负责呈现。

use parking_lot::Mutex;

/// 查询组件的显示端
pub trait LookupView: Send + Sync {
    /// 阻塞式提示，用于输入校验失败
    fn alert(&self, message: &str);

    fn set_loading(&self, visible: bool);

    /// 清空上一次的结果与错误状态
    fn clear(&self);

    /// 以正常样式显示结果
    fn show_result(&self, text: &str);

    /// 以错误样式显示
    fn show_error(&self, text: &str);
}

/// 显示区域当前内容
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Display {
    pub text: String,
    pub is_error: bool,
    pub loading: bool,
    pub alerts: Vec<String>,
}

/// 内存中的视图，供无界面场景与测试读取当前显示
#[derive(Debug, Default)]
pub struct MemoryView {
    display: Mutex<Display>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Display {
        self.display.lock().clone()
    }
}

impl LookupView for MemoryView {
    fn alert(&self, message: &str) {
        self.display.lock().alerts.push(message.to_string());
    }

    fn set_loading(&self, visible: bool) {
        self.display.lock().loading = visible;
    }

    fn clear(&self) {
        let mut display = self.display.lock();
        display.text.clear();
        display.is_error = false;
    }

    fn show_result(&self, text: &str) {
        let mut display = self.display.lock();
        display.text = text.to_string();
        display.is_error = false;
    }

    fn show_error(&self, text: &str) {
        let mut display = self.display.lock();
        display.text = text.to_string();
        display.is_error = true;
    }
}
