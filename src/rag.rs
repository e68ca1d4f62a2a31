//! HTTP client for the university RAG endpoint.
//!
//! The client wraps a single remote operation (answer a natural-language
//! question) and never lets a transport failure escape its boundary: every
//! failure category (connectivity, timeout, bad status, unparseable body)
//! maps to a fixed human-readable fallback string so the conversation can
//! continue and the user can retry.

use crate::config::RagConfig;
use chrono::Utc;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info};

/// Fallback when the endpoint cannot be reached at all.
const CONNECT_FALLBACK: &str = "I'm sorry, I cannot connect to the university information system \
     right now. Please check if the system is running and try again.";

/// Fallback when the endpoint does not answer within the timeout.
const TIMEOUT_FALLBACK: &str = "The university information system is taking too long to respond. \
     Please try asking a simpler question or try again later.";

/// One past question/answer pair, replayed to the endpoint as context.
#[derive(Debug, Clone)]
struct Exchange {
    question: String,
    response: String,
    timestamp: String,
}

/// Client for the university RAG (retrieval-augmented generation) endpoint.
pub struct RagClient {
    endpoint: String,
    client: reqwest::Client,
    health_timeout: Duration,
    strip_reasoning: bool,
    max_context_exchanges: usize,
    session_context: Mutex<HashMap<String, Vec<Exchange>>>,
}

impl RagClient {
    /// Build a client from configuration.
    ///
    /// The underlying HTTP client carries the configured request timeout.
    #[must_use]
    pub fn new(config: &RagConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("University-Assistant/1.0")
            .build()
            .unwrap_or_default();

        info!("RAG client initialized with endpoint: {}", config.endpoint);

        Self {
            endpoint: config.endpoint.clone(),
            client,
            health_timeout: Duration::from_secs(config.health_timeout_secs),
            strip_reasoning: config.strip_reasoning,
            max_context_exchanges: config.max_context_exchanges,
            session_context: Mutex::new(HashMap::new()),
        }
    }

    /// The configured query endpoint URL.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the RAG endpoint a question.
    ///
    /// Always returns a user-facing string: the normalized answer on
    /// success, a fixed fallback describing the failure category otherwise.
    pub async fn query(&self, question: &str, session_id: Option<&str>) -> String {
        let mut payload = json!({
            // Some RAG deployments read `question` instead of `query`.
            "query": question,
            "question": question,
            "session_id": session_id,
            "timestamp": Utc::now().to_rfc3339(),
        });

        if let Some(id) = session_id {
            let history = self.context_for(id);
            if !history.is_empty() {
                payload["conversation_history"] = Value::Array(history);
            }
        }

        info!("sending query to RAG: {}", truncate(question, 100));

        let response = match self.client.post(&self.endpoint).json(&payload).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                error!("RAG endpoint timeout");
                return TIMEOUT_FALLBACK.to_owned();
            }
            Err(e) if e.is_connect() => {
                error!("cannot connect to RAG endpoint: {e}");
                return CONNECT_FALLBACK.to_owned();
            }
            Err(e) => {
                error!("RAG query failed: {e}");
                return keyword_fallback(question).to_owned();
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                "RAG endpoint returned status {status}: {}",
                truncate(&body, 200)
            );
            return keyword_fallback(question).to_owned();
        }

        let data: Value = match response.json().await {
            Ok(data) => data,
            Err(e) => {
                error!("RAG response was not JSON: {e}");
                return keyword_fallback(question).to_owned();
            }
        };

        let mut answer = normalize_answer(&data);
        if self.strip_reasoning {
            answer = strip_reasoning_blocks(&answer);
        }

        if let Some(id) = session_id {
            self.record_exchange(id, question, &answer);
        }

        info!("RAG response received: {}", truncate(&answer, 100));
        answer
    }

    /// Probe `{endpoint}/health`.
    pub async fn health_check(&self) -> bool {
        let url = format!("{}/health", self.endpoint);
        match self
            .client
            .get(&url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Drop the context buffer for one session.
    pub fn clear_session_context(&self, session_id: &str) {
        let mut contexts = self.lock_context();
        if contexts.remove(session_id).is_some() {
            info!("cleared RAG context for session: {session_id}");
        }
    }

    fn context_for(&self, session_id: &str) -> Vec<Value> {
        let contexts = self.lock_context();
        contexts
            .get(session_id)
            .map(|exchanges| {
                exchanges
                    .iter()
                    .map(|e| {
                        json!({
                            "question": &e.question,
                            "response": &e.response,
                            "timestamp": &e.timestamp,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn record_exchange(&self, session_id: &str, question: &str, response: &str) {
        let mut contexts = self.lock_context();
        let exchanges = contexts.entry(session_id.to_owned()).or_default();
        exchanges.push(Exchange {
            question: question.to_owned(),
            response: response.to_owned(),
            timestamp: Utc::now().to_rfc3339(),
        });
        // Keep only the most recent exchanges to bound memory.
        if exchanges.len() > self.max_context_exchanges {
            let excess = exchanges.len() - self.max_context_exchanges;
            exchanges.drain(..excess);
        }
    }

    fn lock_context(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<Exchange>>> {
        self.session_context
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

/// Pull a single answer string out of a heterogeneous response body.
///
/// Object bodies are searched under `response`, `answer`, `result`, and
/// `text` in that order; non-string hits and non-object bodies are
/// stringified whole.
fn normalize_answer(data: &Value) -> String {
    if let Some(map) = data.as_object() {
        for key in ["response", "answer", "result", "text"] {
            match map.get(key) {
                Some(Value::String(s)) if !s.is_empty() => return s.clone(),
                Some(Value::Null) | None => {}
                Some(other) => return other.to_string(),
            }
        }
        return data.to_string();
    }
    match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Strip `<think>...</think>` blocks from an answer.
fn strip_reasoning_blocks(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut remaining = text;
    while let Some(start) = remaining.find("<think>") {
        result.push_str(&remaining[..start]);
        if let Some(end) = remaining[start..].find("</think>") {
            remaining = &remaining[start + end + "</think>".len()..];
        } else {
            // Unclosed <think> — discard the rest
            return result.trim().to_owned();
        }
    }
    result.push_str(remaining);
    result.trim().to_owned()
}

/// Category-specific fallback answers when the RAG system is unavailable.
fn keyword_fallback(question: &str) -> &'static str {
    let q = question.to_lowercase();

    if contains_any(&q, &["admission", "apply", "application"]) {
        "For admission information, please visit the admissions office or check the university \
         website. I'm currently unable to access the detailed admission database."
    } else if contains_any(&q, &["course", "subject", "curriculum"]) {
        "For course information, please contact the academic office or your department advisor. \
         I'm having trouble accessing the course catalog right now."
    } else if contains_any(&q, &["fee", "payment", "cost", "tuition"]) {
        "For fee and payment information, please contact the finance office or check your \
         student portal. I cannot access fee details at the moment."
    } else if contains_any(&q, &["library", "book", "resource"]) {
        "For library resources, please visit the university library or use the online catalog. \
         I'm currently unable to access library information."
    } else {
        "I'm sorry, I'm having trouble accessing the university information system right now. \
         Please try asking again later, or contact the relevant university office directly for \
         assistance."
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn normalize_prefers_response_key() {
        let data = json!({"response": "from response", "answer": "from answer"});
        assert_eq!(normalize_answer(&data), "from response");
    }

    #[test]
    fn normalize_falls_through_alternative_keys() {
        assert_eq!(normalize_answer(&json!({"answer": "a"})), "a");
        assert_eq!(normalize_answer(&json!({"result": "r"})), "r");
        assert_eq!(normalize_answer(&json!({"text": "t"})), "t");
    }

    #[test]
    fn normalize_stringifies_non_string_hits() {
        let data = json!({"answer": {"nested": true}});
        assert_eq!(normalize_answer(&data), "{\"nested\":true}");
    }

    #[test]
    fn normalize_handles_plain_string_body() {
        assert_eq!(normalize_answer(&json!("plain")), "plain");
    }

    #[test]
    fn normalize_stringifies_unknown_shapes() {
        let data = json!({"unexpected": 1});
        assert_eq!(normalize_answer(&data), "{\"unexpected\":1}");
    }

    #[test]
    fn strip_reasoning_removes_blocks() {
        assert_eq!(
            strip_reasoning_blocks("Hello <think>chain of thought</think>World"),
            "Hello World"
        );
        assert_eq!(
            strip_reasoning_blocks("A<think>1</think>B<think>2</think>C"),
            "ABC"
        );
    }

    #[test]
    fn strip_reasoning_discards_unclosed_block() {
        assert_eq!(strip_reasoning_blocks("Answer <think>never ends"), "Answer");
    }

    #[test]
    fn strip_reasoning_no_blocks_is_identity() {
        assert_eq!(strip_reasoning_blocks("Just an answer"), "Just an answer");
    }

    #[test]
    fn keyword_fallback_categories() {
        assert!(keyword_fallback("How do I apply?").contains("admissions office"));
        assert!(keyword_fallback("Which courses exist?").contains("academic office"));
        assert!(keyword_fallback("What are the tuition fees?").contains("finance office"));
        assert!(keyword_fallback("Where is the library?").contains("university library"));
        assert!(keyword_fallback("What's the weather?").contains("try asking again later"));
    }

    #[test]
    fn context_buffer_is_capped() {
        let client = RagClient::new(&RagConfig {
            max_context_exchanges: 3,
            ..RagConfig::default()
        });
        for i in 0..10 {
            client.record_exchange("s1", &format!("q{i}"), "a");
        }
        let history = client.context_for("s1");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0]["question"], "q7");
        assert_eq!(history[2]["question"], "q9");
    }

    #[test]
    fn clear_session_context_drops_buffer() {
        let client = RagClient::new(&RagConfig::default());
        client.record_exchange("s1", "q", "a");
        client.clear_session_context("s1");
        assert!(client.context_for("s1").is_empty());
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 4), "héll");
        assert_eq!(truncate("ab", 100), "ab");
    }
}
