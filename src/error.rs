//! Error types for the assistant backend.

/// Top-level error type for the assistant service.
///
/// Session-not-found and RAG failures never appear here: the store reports
/// absence as a distinct outcome and the RAG client degrades to fallback
/// strings at its own boundary.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    /// Text-to-speech synthesis error.
    #[error("TTS error: {0}")]
    Tts(String),

    /// Speech-to-text transcription error.
    #[error("STT error: {0}")]
    Stt(String),

    /// Audio decode/encode error.
    #[error("audio error: {0}")]
    Audio(String),

    /// Facial animation generation or packaging error.
    #[error("animation error: {0}")]
    Animation(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// HTTP server error.
    #[error("server error: {0}")]
    Server(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AssistantError>;
