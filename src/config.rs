//! Configuration types for the assistant backend.
//!
//! Configuration is layered: built-in defaults, then an optional TOML file,
//! then environment variables (endpoint URLs and API keys). A missing API
//! key degrades the corresponding feature to "unavailable" rather than
//! failing startup.

use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration for the assistant service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// RAG endpoint settings.
    pub rag: RagConfig,
    /// ElevenLabs text-to-speech settings.
    pub tts: TtsConfig,
    /// Whisper speech-to-text settings.
    pub stt: SttConfig,
    /// Synthetic facial animation settings.
    pub animation: AnimationConfig,
    /// Session lifecycle policy.
    pub session: SessionConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port (0 = auto-assign).
    pub port: u16,
    /// Allowed CORS origins. Empty means allow any origin.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 8002,
            allowed_origins: Vec::new(),
        }
    }
}

/// RAG endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Query endpoint URL.
    pub endpoint: String,
    /// Query timeout in seconds.
    pub timeout_secs: u64,
    /// Health-check timeout in seconds.
    pub health_timeout_secs: u64,
    /// Strip `<think>...</think>` reasoning markup from answers.
    pub strip_reasoning: bool,
    /// Maximum past exchanges sent back as conversation history.
    pub max_context_exchanges: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8000/query".to_owned(),
            timeout_secs: 15,
            health_timeout_secs: 5,
            strip_reasoning: true,
            max_context_exchanges: 10,
        }
    }
}

/// ElevenLabs voice settings sent with every synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        // Stable, slightly expressive delivery for educational content.
        Self {
            stability: 0.75,
            similarity_boost: 0.85,
            style: 0.2,
            use_speaker_boost: true,
        }
    }
}

/// ElevenLabs text-to-speech configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// API key. `None` leaves TTS unavailable.
    pub api_key: Option<String>,
    /// Provider base URL (overridable for tests).
    pub base_url: String,
    /// Default voice.
    pub voice_id: String,
    /// Synthesis model.
    pub model_id: String,
    /// Encoded output format.
    pub output_format: String,
    /// Voice settings.
    pub voice_settings: VoiceSettings,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.elevenlabs.io".to_owned(),
            voice_id: "JBFqnCBsd6RMkjVDRZzb".to_owned(),
            model_id: "eleven_multilingual_v2".to_owned(),
            output_format: "mp3_44100_128".to_owned(),
            voice_settings: VoiceSettings::default(),
            timeout_secs: 60,
        }
    }
}

/// Whisper speech-to-text configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Transcription endpoint base URL. `None` leaves STT unavailable.
    pub endpoint: Option<String>,
    /// Model name requested from the endpoint.
    pub model: String,
    /// Transcription language.
    pub language: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "base".to_owned(),
            language: "en".to_owned(),
            timeout_secs: 60,
        }
    }
}

/// Synthetic facial animation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Frames per second.
    pub fps: u32,
    /// Uniform noise amplitude applied to mouth controls.
    pub noise: f32,
    /// Blink period in frames.
    pub blink_period_frames: u32,
    /// Blink duration in frames.
    pub blink_frames: u32,
    /// NVIDIA A2F function id (forwarded when a real pipeline is attached).
    pub a2f_function_id: String,
    /// NVIDIA A2F gRPC URI.
    pub a2f_uri: String,
    /// NVIDIA API key. Reported in status; the synthetic generator does not
    /// need it.
    pub nvidia_api_key: Option<String>,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            noise: 0.02,
            blink_period_frames: 100,
            blink_frames: 4,
            a2f_function_id: "0961a6da-fb9e-4f2e-8491-247e5fd7bf8d".to_owned(),
            a2f_uri: "grpc.nvcf.nvidia.com:443".to_owned(),
            nvidia_api_key: None,
        }
    }
}

/// Session lifecycle policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Delete a session from the store once it reaches the goodbye node.
    /// With this off, ended sessions remain visible for inspection.
    pub delete_on_goodbye: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            delete_on_goodbye: true,
        }
    }
}

impl AssistantConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AssistantError::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        toml::from_str(&raw).map_err(|e| {
            AssistantError::Config(format!("invalid config {}: {e}", path.display()))
        })
    }

    /// Overlay environment variables onto this configuration.
    ///
    /// Recognised variables: `UNIVERSITY_RAG_ENDPOINT`, `ELEVENLABS_API_KEY`,
    /// `WHISPER_STT_ENDPOINT`, `NVIDIA_API_KEY`, `MITHR_HOST`, `MITHR_PORT`.
    pub fn apply_env(&mut self) {
        if let Some(endpoint) = env_nonempty("UNIVERSITY_RAG_ENDPOINT") {
            self.rag.endpoint = endpoint;
        }
        if let Some(key) = env_nonempty("ELEVENLABS_API_KEY") {
            self.tts.api_key = Some(key);
        }
        if let Some(endpoint) = env_nonempty("WHISPER_STT_ENDPOINT") {
            self.stt.endpoint = Some(endpoint);
        }
        if let Some(key) = env_nonempty("NVIDIA_API_KEY") {
            self.animation.nvidia_api_key = Some(key);
        }
        if let Some(host) = env_nonempty("MITHR_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_nonempty("MITHR_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
    }

    /// Build the effective configuration: defaults, optional TOML file
    /// (`MITHR_CONFIG`), then environment overlay.
    ///
    /// # Errors
    ///
    /// Returns an error only for an unreadable or invalid config file; a
    /// missing `MITHR_CONFIG` variable means defaults.
    pub fn from_env() -> Result<Self> {
        let mut config = match env_nonempty("MITHR_CONFIG") {
            Some(path) => Self::load(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }
}

fn env_nonempty(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}
