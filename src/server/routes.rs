//! Session, chat, and health route handlers.

use crate::server::{ApiError, AppState};
use crate::session::{NodeId, SessionState};
use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

/// `{session_id, state}` envelope returned by session and chat endpoints.
#[derive(Debug, Serialize)]
pub struct SessionEnvelope {
    pub session_id: String,
    pub state: SessionState,
}

/// Chat request body. `message` is accepted as an alias for `user_input`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(alias = "message")]
    pub user_input: String,
}

/// `GET /` — API status.
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "University Assistant API is running."
    }))
}

/// `GET /health` — liveness of self and the attached collaborators.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let rag_healthy = state.rag.health_check().await;
    Json(json!({
        "status": "healthy",
        "rag_system": if rag_healthy { "connected" } else { "disconnected" },
        "rag_endpoint": state.rag.endpoint(),
        "tts_available": state.tts.available(),
        "stt_available": state.stt.available(),
        "a2f_available": true,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

/// `GET /rag/health` — RAG system health.
pub async fn rag_health(State(state): State<AppState>) -> Json<Value> {
    let healthy = state.rag.health_check().await;
    Json(json!({
        "rag_healthy": healthy,
        "endpoint": state.rag.endpoint(),
        "status": if healthy { "connected" } else { "disconnected" },
    }))
}

/// `POST /session/init` — create a session.
///
/// Runs the name-collection entry so the greeting is part of the reply.
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionEnvelope>, ApiError> {
    let initial = state
        .executor
        .execute(NodeId::CollectName, &SessionState::new(), None)
        .await;
    let session_id = state.store.create(initial);

    match state.store.get(&session_id) {
        Some(stored) => Ok(Json(SessionEnvelope {
            session_id,
            state: stored,
        })),
        None => Err(ApiError::internal("session vanished during creation")),
    }
}

/// `POST /chat` — one conversation turn.
///
/// With a session id the turn runs through the workflow and the updated
/// state is persisted (or, when the conversation ended and the
/// delete-on-goodbye policy is on, the session is removed). Without one the
/// message goes straight to the RAG endpoint and only `{response}` comes
/// back.
pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let Some(session_id) = request.session_id else {
        info!("stateless chat: '{}'", request.user_input);
        let response = state.rag.query(&request.user_input, None).await;
        return Ok(Json(json!({ "response": response })).into_response());
    };

    let session = state
        .store
        .get(&session_id)
        .ok_or_else(|| ApiError::not_found(format!("Session {session_id} not found")))?;

    let updated = state
        .executor
        .run_turn(&session, Some(&request.user_input))
        .await;

    if updated.conversation_ended && state.config.session.delete_on_goodbye {
        state.store.delete(&session_id);
        state.rag.clear_session_context(&session_id);
    } else {
        state.store.update(&session_id, updated.clone());
    }

    Ok(Json(SessionEnvelope {
        session_id,
        state: updated,
    })
    .into_response())
}

/// `DELETE /session/{session_id}` — end a session.
pub async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.store.delete(&session_id) {
        state.rag.clear_session_context(&session_id);
        Ok(Json(json!({
            "message": format!("Session {session_id} cleared")
        })))
    } else {
        Err(ApiError::not_found(format!(
            "Session {session_id} not found"
        )))
    }
}

/// `GET /sessions` — enumerate session ids.
pub async fn list_sessions(State(state): State<AppState>) -> Json<Value> {
    let sessions = state.store.session_ids();
    Json(json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

/// `GET /sessions/stats` — session statistics.
pub async fn session_stats(State(state): State<AppState>) -> Json<Value> {
    let all = state.store.list_all();
    let active = all.values().filter(|s| !s.conversation_ended).count();
    let count_at = |node: NodeId| all.values().filter(|s| s.current_node == node).count();
    let by_node: Value = json!({
        "collect_name": count_at(NodeId::CollectName),
        "university_chat": count_at(NodeId::UniversityChat),
        "goodbye": count_at(NodeId::Goodbye),
    });

    Json(json!({
        "total_sessions": all.len(),
        "active_sessions": active,
        "sessions_by_node": by_node,
        "rag_system_healthy": state.rag.health_check().await,
    }))
}
