mod common;

use cfg_evals::server;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn start() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = Arc::new(common::mock_state());
    tokio::spawn(server::serve(listener, state));
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_health_over_tcp_with_cors() {
    let base = start().await;
    let resp = reqwest::get(format!("{}/health", base)).await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(
        resp.headers().get("access-control-allow-origin").unwrap(),
        "*"
    );
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body, serde_json::json!({"status": "ok"}));
}

#[tokio::test]
async fn test_nl_query_over_tcp() {
    let base = start().await;
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/nl-query", base))
        .json(&serde_json::json!({"question": "Count all users"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["rows"], serde_json::json!([{"count": 3}]));

    let resp = client
        .post(format!("{}/nl-query", base))
        .json(&serde_json::json!({"question": "Hi"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 422);
}

#[tokio::test]
async fn test_preflight_is_answered() {
    let base = start().await;
    let resp = reqwest::Client::new()
        .request(reqwest::Method::OPTIONS, format!("{}/nl-query", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 204);
    assert!(resp.headers().contains_key("access-control-allow-methods"));
}
