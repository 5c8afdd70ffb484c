//! 订单领域模型
//!
//! JSON 字段名即 Kafka 消息与 HTTP 响应的线上格式。
//! 校验规则通过 validator 派生宏声明，由服务层在入库前统一执行。

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// 订单
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Order {
    #[validate(length(min = 1, message = "order_uid is required"))]
    pub order_uid: String,
    #[validate(length(min = 1, message = "track_number is required"))]
    pub track_number: String,
    pub entry: String,
    #[validate(nested)]
    pub delivery: Delivery,
    #[validate(nested)]
    pub payment: Payment,
    #[validate(
        length(min = 1, message = "order must contain at least one item"),
        nested
    )]
    pub items: Vec<Item>,
    pub locale: String,
    #[serde(default)]
    pub internal_signature: String,
    pub customer_id: String,
    pub delivery_service: String,
    pub shardkey: String,
    pub sm_id: i64,
    pub date_created: DateTime<Utc>,
    pub oof_shard: String,
}

/// 收货信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Delivery {
    #[validate(length(min = 1, message = "delivery name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "delivery phone is required"))]
    pub phone: String,
    pub zip: String,
    pub city: String,
    pub address: String,
    pub region: String,
    #[validate(custom(function = "validate_contains_at"))]
    pub email: String,
}

/// 支付信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Payment {
    #[validate(length(min = 1, message = "payment transaction is required"))]
    pub transaction: String,
    #[serde(default)]
    pub request_id: String,
    pub currency: String,
    pub provider: String,
    #[validate(range(min = 1, message = "payment amount must be positive"))]
    pub amount: i64,
    pub payment_dt: i64,
    pub bank: String,
    pub delivery_cost: i64,
    pub goods_total: i64,
    pub custom_fee: i64,
}

/// 订单商品
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Item {
    #[validate(range(min = 1, message = "item chrt_id must be positive"))]
    pub chrt_id: i64,
    pub track_number: String,
    #[validate(range(min = 1, message = "item price must be positive"))]
    pub price: i64,
    pub rid: String,
    #[validate(length(min = 1, message = "item name is required"))]
    pub name: String,
    pub sale: i64,
    pub size: String,
    pub total_price: i64,
    pub nm_id: i64,
    pub brand: String,
    pub status: i64,
}

fn validate_contains_at(email: &str) -> Result<(), ValidationError> {
    if email.contains('@') {
        Ok(())
    } else {
        Err(ValidationError::new("email").with_message(Cow::Borrowed("delivery email is invalid")))
    }
}

const ORDER_FIELDS: &[&str] = &["order_uid", "track_number", "delivery", "payment", "items"];
const DELIVERY_FIELDS: &[&str] = &["name", "phone", "email"];
const PAYMENT_FIELDS: &[&str] = &["transaction", "amount"];
const ITEM_FIELDS: &[&str] = &["chrt_id", "price", "name"];

/// 返回第一条校验错误的可读文本
///
/// 按字段声明顺序查找：订单号、运单号、收货信息、支付信息、商品；
/// 商品列表按下标顺序，同一商品内按 chrt_id、price、name。
pub fn first_validation_error(errors: &ValidationErrors) -> String {
    first_in(errors, ORDER_FIELDS).unwrap_or_else(|| errors.to_string())
}

fn nested_fields(field: &str) -> &'static [&'static str] {
    match field {
        "delivery" => DELIVERY_FIELDS,
        "payment" => PAYMENT_FIELDS,
        "items" => ITEM_FIELDS,
        _ => &[],
    }
}

fn first_in(errors: &ValidationErrors, fields: &[&str]) -> Option<String> {
    let map = errors.errors();
    fields.iter().find_map(|&field| match map.get(field)? {
        ValidationErrorsKind::Field(field_errors) => field_errors.first().map(|e| match &e.message {
            Some(message) => message.to_string(),
            None => format!("{field}: {}", e.code),
        }),
        ValidationErrorsKind::Struct(nested) => first_in(nested, nested_fields(field)),
        // BTreeMap 按下标升序
        ValidationErrorsKind::List(entries) => entries
            .values()
            .find_map(|nested| first_in(nested, nested_fields(field))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_order;

    #[test]
    fn test_sample_order_is_valid() {
        assert!(sample_order("b563feb7b2b84b6test").validate().is_ok());
    }

    #[test]
    fn test_order_json_field_names() {
        let order = sample_order("b563feb7b2b84b6test");
        let json = serde_json::to_value(&order).unwrap();

        assert_eq!(json["order_uid"], "b563feb7b2b84b6test");
        assert_eq!(json["delivery"]["email"], "test@gmail.com");
        assert_eq!(json["payment"]["amount"], 1817);
        assert_eq!(json["items"][0]["chrt_id"], 9934930);
        assert_eq!(json["date_created"], "2021-11-26T06:22:19Z");
    }

    #[test]
    fn test_order_deserializes_without_optional_strings() {
        let mut json = serde_json::to_value(sample_order("no-signature")).unwrap();
        json.as_object_mut().unwrap().remove("internal_signature");
        json["payment"].as_object_mut().unwrap().remove("request_id");

        let order: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.internal_signature, "");
        assert_eq!(order.payment.request_id, "");
    }

    #[test]
    fn test_missing_uid_is_reported() {
        let mut order = sample_order("x");
        order.order_uid.clear();

        let errors = order.validate().unwrap_err();
        assert_eq!(first_validation_error(&errors), "order_uid is required");
    }

    #[test]
    fn test_email_without_at_is_invalid() {
        let mut order = sample_order("x");
        order.delivery.email = "test.gmail.com".to_string();

        let errors = order.validate().unwrap_err();
        assert_eq!(first_validation_error(&errors), "delivery email is invalid");
    }

    #[test]
    fn test_non_positive_amount_is_invalid() {
        let mut order = sample_order("x");
        order.payment.amount = 0;

        let errors = order.validate().unwrap_err();
        assert_eq!(
            first_validation_error(&errors),
            "payment amount must be positive"
        );
    }

    #[test]
    fn test_order_without_items_is_invalid() {
        let mut order = sample_order("x");
        order.items.clear();

        let errors = order.validate().unwrap_err();
        assert_eq!(
            first_validation_error(&errors),
            "order must contain at least one item"
        );
    }

    #[test]
    fn test_first_field_wins_over_later_fields() {
        let mut order = sample_order("x");
        order.order_uid.clear();
        order.delivery.email = "test.gmail.com".to_string();
        order.payment.amount = 0;

        let errors = order.validate().unwrap_err();
        assert_eq!(first_validation_error(&errors), "order_uid is required");
    }

    #[test]
    fn test_delivery_is_checked_before_payment() {
        let mut order = sample_order("x");
        order.delivery.phone.clear();
        order.delivery.email = "no-at-sign".to_string();
        order.payment.transaction.clear();

        let errors = order.validate().unwrap_err();
        assert_eq!(first_validation_error(&errors), "delivery phone is required");
    }

    #[test]
    fn test_item_errors_follow_item_then_field_order() {
        let mut order = sample_order("x");
        let mut second = order.items[0].clone();
        second.chrt_id = 0;
        order.items.push(second);
        order.items[0].price = -1;
        order.items[0].name.clear();

        let errors = order.validate().unwrap_err();
        assert_eq!(first_validation_error(&errors), "item price must be positive");
    }
}
