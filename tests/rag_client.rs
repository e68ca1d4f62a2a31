//! RAG client integration tests with a mock HTTP endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use mithr::config::RagConfig;
use mithr::rag::RagClient;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(uri: &str, timeout_secs: u64) -> RagClient {
    RagClient::new(&RagConfig {
        endpoint: format!("{uri}/query"),
        timeout_secs,
        ..RagConfig::default()
    })
}

async fn mock_query_response(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn normalizes_each_known_answer_field() {
    for key in ["response", "answer", "result", "text"] {
        let server = mock_query_response(json!({ key: "the answer" })).await;
        let client = client_for(&server.uri(), 2);
        assert_eq!(
            client.query("question?", None).await,
            "the answer",
            "key: {key}"
        );
    }
}

#[tokio::test]
async fn normalizes_plain_string_body() {
    let server = mock_query_response(json!("bare answer")).await;
    let client = client_for(&server.uri(), 2);
    assert_eq!(client.query("question?", None).await, "bare answer");
}

#[tokio::test]
async fn strips_reasoning_markup() {
    let server =
        mock_query_response(json!({ "answer": "<think>internal notes</think>Visible answer" }))
            .await;
    let client = client_for(&server.uri(), 2);
    assert_eq!(client.query("question?", None).await, "Visible answer");
}

#[tokio::test]
async fn non_2xx_returns_keyword_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;
    let client = client_for(&server.uri(), 2);

    let answer = client.query("What are the tuition fees?", None).await;
    assert!(answer.contains("finance office"));

    let answer = client.query("anything else", None).await;
    assert!(answer.contains("try asking again later"));
}

#[tokio::test]
async fn unreachable_endpoint_falls_back_within_timeout() {
    // Nothing listens on port 1.
    let client = client_for("http://127.0.0.1:1", 2);

    let started = Instant::now();
    let answer = client.query("hello?", None).await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(answer.contains("cannot connect"));
}

#[tokio::test]
async fn slow_endpoint_times_out_with_timeout_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "too late" }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    let client = client_for(&server.uri(), 1);

    let started = Instant::now();
    let answer = client.query("question?", None).await;
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(answer.contains("taking too long"));
}

#[tokio::test]
async fn session_context_is_replayed_on_later_queries() {
    let server = mock_query_response(json!({ "answer": "ok" })).await;
    let client = client_for(&server.uri(), 2);

    client.query("first question", Some("session-1")).await;
    client.query("second question", Some("session-1")).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(first.get("conversation_history").is_none());
    assert_eq!(first["query"], "first question");
    assert_eq!(first["question"], "first question");
    assert_eq!(first["session_id"], "session-1");

    let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
    let history = second["conversation_history"].as_array().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["question"], "first question");
    assert_eq!(history[0]["response"], "ok");
}

#[tokio::test]
async fn stateless_queries_carry_no_context() {
    let server = mock_query_response(json!({ "answer": "ok" })).await;
    let client = client_for(&server.uri(), 2);

    client.query("one", None).await;
    client.query("two", None).await;

    let requests = server.received_requests().await.unwrap();
    for request in requests {
        let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
        assert!(body.get("conversation_history").is_none());
    }
}

#[tokio::test]
async fn health_check_reflects_endpoint_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let client = client_for(&server.uri(), 2);
    assert!(client.health_check().await);

    let down = client_for("http://127.0.0.1:1", 2);
    assert!(!down.health_check().await);
}
