mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use common::{at, regex_env};
use serde_json::{json, Value};
use tally_server::router;
use tower::ServiceExt;

async fn send(app: axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let env = regex_env().await;
    let req = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(router(env.state.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn notification_is_created_then_reported_duplicate() {
    let env = regex_env().await;
    let payload = json!({
        "channel": "SMS",
        "messageId": "http-1",
        "sender": "+919800000001",
        "body": "INR 250.00 spent towards Swiggy",
        "receivedAt": "2024-01-09T18:30:00"
    });

    let (status, body) = send(
        router(env.state.clone()),
        post_json("/api/notifications", payload.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "recorded");
    assert_eq!(body["expense"]["merchant"], "Swiggy");

    let (status, body) = send(
        router(env.state.clone()),
        post_json("/api/notifications", payload),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "duplicate");
    assert_eq!(body["notification"]["messageId"], "http-1");
}

#[tokio::test]
async fn unknown_sender_is_forbidden() {
    let env = regex_env().await;
    let payload = json!({
        "channel": "Email",
        "messageId": "http-2",
        "sender": "nobody@example.com",
        "subject": "INR 10.00 spent",
        "body": "hello"
    });
    let (status, body) = send(router(env.state.clone()), post_json("/api/notifications", payload)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("nobody@example.com"));
}

#[tokio::test]
async fn blank_body_is_bad_request() {
    let env = regex_env().await;
    let payload = json!({
        "channel": "SMS",
        "messageId": "http-3",
        "sender": "+919800000001",
        "body": "   "
    });
    let (status, _) = send(router(env.state.clone()), post_json("/api/notifications", payload)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn paying_unknown_bill_is_not_found() {
    let env = regex_env().await;
    let req = Request::post("/api/bills/999/pay").body(Body::empty()).unwrap();
    let (status, _) = send(router(env.state.clone()), req).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn paying_future_bill_is_conflict() {
    let env = regex_env().await;
    let bill = env.add_bill("Netflix", 999, at(2999, 1, 1, 0, 0)).await;
    let req = Request::post(format!("/api/bills/{}/pay", bill.id.0))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(env.state.clone()), req).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["due"], "2999-01-01");
}

#[tokio::test]
async fn paying_due_bill_returns_advanced_bill() {
    let env = regex_env().await;
    let bill = env.add_bill("Gym", 1500, at(2020, 1, 15, 0, 0)).await;
    let req = Request::post(format!("/api/bills/{}/pay", bill.id.0))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(router(env.state.clone()), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["createdExpense"], true);
    assert_eq!(body["expense"]["source"], "Bill Auto-Pay");
}
