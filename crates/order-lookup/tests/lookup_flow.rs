//! 订单查询组件端到端测试
//!
//! 在随机端口上启动 axum 桩服务，使用真实的 reqwest 客户端发起查询。

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use order_lookup::{
    HttpOrderFetcher, Key, LookupOutcome, LookupState, LookupWidget, MemoryView,
};
use serde_json::json;
use tokio::net::TcpListener;

async fn stub_order(Path(id): Path<String>) -> Response {
    match id.as_str() {
        "null" => Json(json!(null)).into_response(),
        "empty" => Json(json!({})).into_response(),
        "missing" => (StatusCode::NOT_FOUND, "order missing not found").into_response(),
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "").into_response(),
        "garbage" => (StatusCode::OK, "not json").into_response(),
        "slow" => {
            tokio::time::sleep(Duration::from_millis(300)).await;
            Json(json!({"id": "slow"})).into_response()
        }
        "42" => Json(json!({"id": "42", "item": "Widget"})).into_response(),
        other => Json(json!({"id": other})).into_response(),
    }
}

async fn start_stub() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/order/{id}", get(stub_order));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn widget_for(base_url: &str) -> (Arc<LookupWidget>, Arc<MemoryView>) {
    let fetcher = HttpOrderFetcher::new(base_url, Some(Duration::from_secs(5))).unwrap();
    let view = Arc::new(MemoryView::new());
    let widget = Arc::new(LookupWidget::new(Arc::new(fetcher), view.clone()));
    (widget, view)
}

#[tokio::test]
async fn test_found_order_is_pretty_printed() {
    let base_url = start_stub().await;
    let (widget, view) = widget_for(&base_url).await;

    let outcome = widget.on_click("42").await;

    assert_eq!(outcome, LookupOutcome::Rendered(LookupState::Success));
    let display = view.snapshot();
    assert_eq!(display.text, "{\n  \"id\": \"42\",\n  \"item\": \"Widget\"\n}");
    assert!(!display.is_error);
    assert!(!display.loading);
}

#[tokio::test]
async fn test_null_and_empty_bodies_render_not_found() {
    let base_url = start_stub().await;
    let (widget, view) = widget_for(&base_url).await;

    for id in ["null", "empty"] {
        widget.on_click(id).await;
        let display = view.snapshot();
        assert_eq!(display.text, "Order not found");
        assert!(!display.is_error);
    }
}

#[tokio::test]
async fn test_not_found_status_includes_code_and_body() {
    let base_url = start_stub().await;
    let (widget, view) = widget_for(&base_url).await;

    let outcome = widget.on_click("missing").await;

    assert_eq!(outcome, LookupOutcome::Rendered(LookupState::Error));
    let display = view.snapshot();
    assert_eq!(display.text, "Error: Server returned 404: order missing not found");
    assert!(display.is_error);
    assert!(!display.loading);
}

#[tokio::test]
async fn test_error_status_with_empty_body() {
    let base_url = start_stub().await;
    let (widget, view) = widget_for(&base_url).await;

    widget.on_click("broken").await;

    assert_eq!(view.snapshot().text, "Error: Server returned 500");
}

#[tokio::test]
async fn test_invalid_json_is_an_error() {
    let base_url = start_stub().await;
    let (widget, view) = widget_for(&base_url).await;

    widget.on_click("garbage").await;

    let display = view.snapshot();
    assert!(display.is_error);
    assert!(display.text.starts_with("Error: "));
    assert_ne!(display.text, "Error: Unknown error");
}

#[tokio::test]
async fn test_network_failure_hides_loading() {
    // 绑定后立即释放端口，确保连接被拒绝
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (widget, view) = widget_for(&format!("http://{addr}")).await;

    let outcome = widget.on_click("42").await;

    assert_eq!(outcome, LookupOutcome::Rendered(LookupState::Error));
    let display = view.snapshot();
    assert!(display.text.starts_with("Error: "));
    assert!(display.is_error);
    assert!(!display.loading);
}

#[tokio::test]
async fn test_order_id_is_sent_as_one_encoded_segment() {
    let base_url = start_stub().await;
    let (widget, view) = widget_for(&base_url).await;

    widget.on_click(" a/b c ").await;

    assert_eq!(view.snapshot().text, "{\n  \"id\": \"a/b c\"\n}");
}

#[tokio::test]
async fn test_enter_key_matches_click() {
    let base_url = start_stub().await;
    let (clicked, clicked_view) = widget_for(&base_url).await;
    let (entered, entered_view) = widget_for(&base_url).await;

    clicked.on_click("42").await;
    entered.on_key(Key::Enter, "42").await;

    assert_eq!(clicked_view.snapshot(), entered_view.snapshot());
}

#[tokio::test]
async fn test_whitespace_input_sends_nothing() {
    // 指向不可达地址：若发出请求，显示会变成错误
    let (widget, view) = widget_for("http://127.0.0.1:1").await;

    let outcome = widget.on_click(" \t ").await;

    assert_eq!(outcome, LookupOutcome::Alerted);
    let display = view.snapshot();
    assert_eq!(display.alerts, vec!["Please enter Order ID"]);
    assert_eq!(display.text, "");
    assert!(!display.is_error);
    assert!(!display.loading);
}

#[tokio::test]
async fn test_only_latest_overlapping_lookup_renders() {
    let base_url = start_stub().await;
    let (widget, view) = widget_for(&base_url).await;

    let slow = {
        let widget = widget.clone();
        tokio::spawn(async move { widget.on_click("slow").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let fast = widget.on_click("fast").await;

    // 慢请求仍在途中时，最新查询已渲染并隐藏加载指示器
    assert_eq!(fast, LookupOutcome::Rendered(LookupState::Success));
    assert!(!view.snapshot().loading);

    assert_eq!(slow.await.unwrap(), LookupOutcome::Discarded);
    let display = view.snapshot();
    assert_eq!(display.text, "{\n  \"id\": \"fast\"\n}");
    assert!(!display.loading);
    assert_eq!(widget.state(), LookupState::Success);
}
