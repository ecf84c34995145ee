//! HTTP層の通し試験

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use std::sync::Arc;
use toolset::diagnostics::{Envelope, RequestContext};
use toolset::dispatch::Operation;
use tower::ServiceExt;

/// 情報を1件出してから失敗する処理
struct FailsAfterProgress;

#[async_trait]
impl Operation for FailsAfterProgress {
    async fn call(&self, ctx: &mut RequestContext, _params: Value) -> anyhow::Result<()> {
        ctx.show_info("Loading report", Some("Report"));
        Err(anyhow::anyhow!("upstream unavailable").context("report failed"))
    }
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(request).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn failing_operation_returns_500_with_both_entries() {
    let env = crate::support::create_env().await;
    let mut registry = env.builtin_registry();
    registry.register("report/build", Arc::new(FailsAfterProgress));
    let app = toolset::api::create_app(env.state(registry));

    let (status, body) = send(
        app,
        Request::builder()
            .method("POST")
            .uri("/apis/report/build")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let envelope: Envelope = serde_json::from_value(body.clone()).unwrap();
    assert!(!envelope.status);
    assert_eq!(envelope.output.len(), 2);
    assert_eq!(envelope.output[0].title, "Report");
    assert_eq!(envelope.output[0].content, "Loading report");
    assert_eq!(envelope.output[1].title, "report/build");
    assert_eq!(envelope.error, "report failed: upstream unavailable");

    // ワイヤ形式のキー名
    assert_eq!(body["output"][0]["Title"], "Report");
    assert_eq!(body["output"][0]["Content"], "Loading report");
    assert!(body.get("execution_logs").is_none());
}

#[tokio::test]
async fn actor_header_is_recorded_and_queryable() {
    let env = crate::support::create_env().await;
    let app = toolset::api::create_app(env.state(env.builtin_registry()));

    let (status, body) = send(
        app.clone(),
        Request::builder()
            .method("POST")
            .uri("/apis/db/sql_query")
            .header("content-type", "application/json")
            .header("X-Actor", "carol")
            .body(Body::from(r#"{"sql": "SELECT COUNT(*) AS n FROM items"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["execution_logs"][0]["user"], "carol");
    assert_eq!(body["execution_logs"][0]["result"]["data"][0]["n"], 3);

    let (status, body) = send(
        app,
        Request::builder()
            .uri("/api/audit-logs?user=carol")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["command"], "SELECT COUNT(*) AS n FROM items");
}

#[tokio::test]
async fn missing_actor_defaults_to_system() {
    let env = crate::support::create_env().await;
    let app = toolset::api::create_app(env.state(env.builtin_registry()));

    let (_, body) = send(
        app,
        Request::builder()
            .method("POST")
            .uri("/apis/db/sql_query")
            .body(Body::from(r#"{"sql": "SELECT 1 AS one"}"#))
            .unwrap(),
    )
    .await;
    assert_eq!(body["execution_logs"][0]["user"], "system");
}
