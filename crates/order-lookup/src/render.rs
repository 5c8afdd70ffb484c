//! 结果与错误文本

use serde_json::Value;

pub const EMPTY_INPUT_ALERT: &str = "Please enter Order ID";
pub const NOT_FOUND_TEXT: &str = "Order not found";
const UNKNOWN_ERROR: &str = "Unknown error";

/// 响应是否视为“空订单”
///
/// null、布尔、数字以及空字符串、空数组、空对象都没有可展示的键。
pub fn is_empty_order(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// 成功响应的显示文本：空订单显示 `Order not found`，否则 2 空格缩进的 JSON
pub fn render_order(value: &Value) -> String {
    if is_empty_order(value) {
        return NOT_FOUND_TEXT.to_string();
    }
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// 失败的显示文本
pub fn render_error(message: &str) -> String {
    if message.is_empty() {
        format!("Error: {UNKNOWN_ERROR}")
    } else {
        format!("Error: {message}")
    }
}
