//! HTTP API layer.
//!
//! ## Endpoints
//!
//! - `POST /session/init` — create a session, returns the greeting state
//! - `POST /chat` — one conversation turn (stateless RAG when no session id)
//! - `DELETE /session/{id}` — end a session
//! - `GET /sessions`, `GET /sessions/stats` — enumerate sessions
//! - `GET /health`, `GET /rag/health` — liveness of self and the RAG system
//! - `/a2f/*` — speech and facial-animation sub-API

pub mod a2f;
pub mod api_error;
pub mod routes;

pub use api_error::ApiError;

use crate::config::{AssistantConfig, ServerConfig};
use crate::error::{AssistantError, Result};
use crate::rag::RagClient;
use crate::session::SessionStore;
use crate::speech::{ElevenLabsTts, WhisperStt};
use crate::workflow::WorkflowExecutor;
use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AssistantConfig>,
    pub store: Arc<SessionStore>,
    pub executor: Arc<WorkflowExecutor>,
    pub rag: Arc<RagClient>,
    pub tts: Arc<ElevenLabsTts>,
    pub stt: Arc<WhisperStt>,
}

impl AppState {
    /// Wire up all components from configuration.
    #[must_use]
    pub fn new(config: AssistantConfig) -> Self {
        let rag = Arc::new(RagClient::new(&config.rag));
        Self {
            store: Arc::new(SessionStore::new()),
            executor: Arc::new(WorkflowExecutor::new(Arc::clone(&rag))),
            tts: Arc::new(ElevenLabsTts::new(&config.tts)),
            stt: Arc::new(WhisperStt::new(&config.stt)),
            rag,
            config: Arc::new(config),
        }
    }
}

/// Build the full application router.
#[must_use]
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server);
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/rag/health", get(routes::rag_health))
        .route("/session/init", post(routes::create_session))
        .route("/session/{session_id}", delete(routes::end_session))
        .route("/sessions", get(routes::list_sessions))
        .route("/sessions/stats", get(routes::session_stats))
        .route("/chat", post(routes::chat))
        .nest("/a2f", a2f::router())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
    }
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// The assistant HTTP server.
///
/// Binds to `{host}:{port}` (port `0` auto-assigns) and serves in a
/// background tokio task until dropped or shut down.
pub struct ApiServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ApiServer {
    /// Start the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(state: AppState) -> Result<Self> {
        let bind_addr = format!(
            "{}:{}",
            state.config.server.host, state.config.server.port
        );
        let app = router(state);

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| AssistantError::Server(format!("bind to {bind_addr} failed: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AssistantError::Server(format!("failed to get local addr: {e}")))?;

        info!("assistant API listening on http://{addr}");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("assistant API server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// Returns the address the server is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Returns the port the server is listening on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Abort the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for ApiServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
