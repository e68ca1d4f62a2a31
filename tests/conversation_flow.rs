//! State-machine integration tests against a mock RAG endpoint.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use mithr::config::RagConfig;
use mithr::rag::RagClient;
use mithr::session::{NodeId, SessionState, Speaker};
use mithr::workflow::WorkflowExecutor;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn executor_for(uri: &str) -> WorkflowExecutor {
    let config = RagConfig {
        endpoint: format!("{uri}/query"),
        timeout_secs: 2,
        ..RagConfig::default()
    };
    WorkflowExecutor::new(Arc::new(RagClient::new(&config)))
}

async fn mock_rag(answer: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "answer": answer })))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn full_conversation_happy_path() {
    let rag = mock_rag("Tuition is 9,250 per year.").await;
    let exec = executor_for(&rag.uri());

    // Session init: name prompt, initial node.
    let state = exec
        .execute(NodeId::CollectName, &SessionState::new(), None)
        .await;
    assert_eq!(state.current_node, NodeId::CollectName);
    assert!(state.next_question.contains("What's your name?"));

    // Provide a name: transition + personalized greeting in the same turn.
    let state = exec.run_turn(&state, Some("Alice")).await;
    assert_eq!(state.current_node, NodeId::UniversityChat);
    assert_eq!(state.name.as_deref(), Some("Alice"));
    assert!(state.next_question.contains("Hi Alice!"));

    // Ask a question: RAG answer lands in state, node unchanged.
    let state = exec.run_turn(&state, Some("What are the tuition fees?")).await;
    assert_eq!(state.current_node, NodeId::UniversityChat);
    assert_eq!(state.next_question, "Tuition is 9,250 per year.");
    assert!(!state.conversation_ended);

    // Say goodbye: terminal node, farewell with the name, ended flag.
    let state = exec.run_turn(&state, Some("thank you, bye")).await;
    assert_eq!(state.current_node, NodeId::Goodbye);
    assert!(state.conversation_ended);
    assert!(state.next_question.contains("Alice"));
}

#[tokio::test]
async fn history_preserves_insertion_order() {
    let rag = mock_rag("An answer.").await;
    let exec = executor_for(&rag.uri());

    let state = exec
        .execute(NodeId::CollectName, &SessionState::new(), None)
        .await;
    let state = exec.run_turn(&state, Some("Alice")).await;
    let state = exec.run_turn(&state, Some("Tell me about courses")).await;

    let speakers: Vec<Speaker> = state.history.iter().map(|h| h.speaker).collect();
    assert_eq!(
        speakers,
        vec![
            Speaker::Assistant, // name prompt
            Speaker::User,      // "Alice"
            Speaker::Assistant, // greeting
            Speaker::User,      // question
            Speaker::Assistant, // RAG answer
        ]
    );
    assert_eq!(state.history[3].text, "Tell me about courses");
    assert_eq!(state.history[4].text, "An answer.");
}

#[tokio::test]
async fn goodbye_keywords_work_in_any_case() {
    for keyword in ["bye", "THANKS", "Quit"] {
        let rag = mock_rag("unused").await;
        let exec = executor_for(&rag.uri());

        let mut state = SessionState::new();
        state.name = Some("Sam".to_owned());
        state.current_node = NodeId::UniversityChat;

        let state = exec.run_turn(&state, Some(keyword)).await;
        assert_eq!(state.current_node, NodeId::Goodbye, "keyword: {keyword}");
        assert!(state.conversation_ended, "keyword: {keyword}");
    }
}

#[tokio::test]
async fn goodbye_turn_sends_no_rag_request() {
    let rag = mock_rag("unused").await;
    let exec = executor_for(&rag.uri());

    let mut state = SessionState::new();
    state.name = Some("Sam".to_owned());
    state.current_node = NodeId::UniversityChat;
    exec.run_turn(&state, Some("thanks, goodbye")).await;

    let requests = rag.received_requests().await.unwrap();
    assert!(requests.is_empty());
}

#[tokio::test]
async fn rag_error_keeps_node_for_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let exec = executor_for(&server.uri());

    let mut state = SessionState::new();
    state.name = Some("Sam".to_owned());
    state.current_node = NodeId::UniversityChat;

    let state = exec.run_turn(&state, Some("What are the tuition fees?")).await;
    assert_eq!(state.current_node, NodeId::UniversityChat);
    assert!(!state.conversation_ended);
    // The fee question gets the finance-office fallback.
    assert!(state.next_question.contains("finance office"));
}

#[tokio::test]
async fn short_name_increments_retry_until_a_real_name_arrives() {
    let rag = mock_rag("unused").await;
    let exec = executor_for(&rag.uri());

    let state = exec
        .execute(NodeId::CollectName, &SessionState::new(), None)
        .await;
    let state = exec.run_turn(&state, Some("a")).await;
    assert_eq!(state.current_node, NodeId::CollectName);
    assert_eq!(state.retry_count, 1);

    let state = exec.run_turn(&state, Some("x")).await;
    assert_eq!(state.retry_count, 2);

    // A usable name transitions and resets the counter.
    let state = exec.run_turn(&state, Some("ab")).await;
    assert_eq!(state.current_node, NodeId::UniversityChat);
    assert_eq!(state.retry_count, 0);
}
