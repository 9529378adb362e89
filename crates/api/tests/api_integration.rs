//! Integration tests for the API server.

use std::sync::Arc;
use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use event_store::InMemoryEventStore;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::{InMemoryReportStore, ProjectionProcessor};
use serde_json::{Value, json};
use tower::ServiceExt;

use api::config::Config;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

fn setup() -> (Router, Arc<ProjectionProcessor<InMemoryEventStore>>) {
    let config = Config {
        number_of_shards: 10,
        ..Config::default()
    };
    let (state, processor) =
        api::create_state(InMemoryEventStore::new(), InMemoryReportStore::new(), &config);
    let app = api::create_app(state, get_metrics_handle());
    (app, processor)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).unwrap())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn update_item(
    app: &Router,
    cart: &str,
    product: &str,
    quantity: i32,
) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        &format!("/cart/{cart}"),
        Some(json!({ "productId": product, "quantity": quantity })),
    )
    .await
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = setup();

    let (status, json) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_update_item_and_get_cart() {
    let (app, _) = setup();

    let (status, json) = update_item(&app, "c1", "p1", 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "confirmed");

    update_item(&app, "c1", "p2", 1).await;
    update_item(&app, "c1", "p1", 5).await;

    let (status, cart) = send(&app, "GET", "/cart/c1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["id"], "c1");
    assert_eq!(cart["checkedOut"], false);
    assert_eq!(
        cart["items"],
        json!([
            { "productId": "p1", "quantity": 5 },
            { "productId": "p2", "quantity": 1 }
        ])
    );
}

#[tokio::test]
async fn test_unknown_cart_is_empty() {
    let (app, _) = setup();

    let (status, cart) = send(&app, "GET", "/cart/nobody", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"], json!([]));
    assert_eq!(cart["checkedOut"], false);
}

#[tokio::test]
async fn test_rejections_return_reason() {
    let (app, _) = setup();

    let (status, json) = update_item(&app, "c1", "p1", -1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Quantity must be greater than zero");

    let (status, json) = update_item(&app, "c1", "p1", 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Cannot delete item that is not already in cart");

    let (status, json) = send(&app, "POST", "/cart/c1/checkout", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Cannot checkout empty cart");
}

#[tokio::test]
async fn test_checkout_then_updates_rejected() {
    let (app, _) = setup();

    update_item(&app, "c2", "p1", 1).await;
    let (status, _) = send(&app, "POST", "/cart/c2/checkout", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = update_item(&app, "c2", "p2", 1).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Can't update item on already checked out shopping cart"
    );

    let (status, json) = send(&app, "POST", "/cart/c2/checkout", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        json["error"],
        "Can't checkout on already checked out shopping cart"
    );

    let (_, cart) = send(&app, "GET", "/cart/c2", None).await;
    assert_eq!(cart["checkedOut"], true);
}

#[tokio::test]
async fn test_report_not_found_until_projected() {
    let (app, processor) = setup();

    let (status, json) = send(&app, "GET", "/cart/c3/report", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        json["error"],
        "Couldn't find a shopping cart report for 'c3'"
    );

    update_item(&app, "c3", "p1", 1).await;
    send(&app, "POST", "/cart/c3/checkout", None).await;

    let (status, _) = send(&app, "GET", "/cart/c3/report", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let processed = processor.run_catch_up().await.unwrap();
    assert_eq!(processed, 2);

    let (status, report) = send(&app, "GET", "/cart/c3/report", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["id"], "c3");
    assert!(report["creationDate"].is_string());
    assert!(report["checkoutDate"].is_string());
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let (app, _) = setup();

    let (status, json) = send(
        &app,
        "POST",
        "/cart/c4",
        Some(json!({ "productId": "p1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().is_some_and(|m| m.contains("quantity")));

    let (status, _) = send(
        &app,
        "POST",
        "/cart/c4",
        Some(json!({ "productId": "p1", "quantity": "two" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, cart) = send(&app, "GET", "/cart/c4", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"], json!([]));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = setup();

    update_item(&app, "c5", "p1", 1).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("cart_commands_total"));
}
