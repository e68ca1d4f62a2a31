//! Speech-to-text through a Whisper-compatible transcription endpoint.
//!
//! The model itself (faster-whisper or compatible) runs behind an
//! OpenAI-style `POST /v1/audio/transcriptions` endpoint; this adapter only
//! uploads prepared WAV audio and reads back the transcript.

use crate::config::SttConfig;
use crate::error::{AssistantError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

/// A finished transcription.
#[derive(Debug, Clone)]
pub struct Transcription {
    pub text: String,
    pub language: String,
    pub confidence: f32,
}

/// Response body of the transcription endpoint (`verbose_json` format).
#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    language_probability: Option<f32>,
}

/// Whisper transcription adapter.
pub struct WhisperStt {
    client: reqwest::Client,
    config: SttConfig,
}

impl WhisperStt {
    #[must_use]
    pub fn new(config: &SttConfig) -> Self {
        match &config.endpoint {
            Some(endpoint) => info!("Whisper STT initialized (endpoint: {endpoint})"),
            None => warn!("WHISPER_STT_ENDPOINT not found, STT unavailable"),
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            client,
            config: config.clone(),
        }
    }

    /// Whether a transcription endpoint is configured.
    #[must_use]
    pub fn available(&self) -> bool {
        self.config.endpoint.is_some()
    }

    /// Transcribe 16 kHz mono WAV audio.
    ///
    /// # Errors
    ///
    /// Returns an error when no endpoint is configured or the endpoint
    /// rejects the upload.
    pub async fn transcribe(&self, wav: Vec<u8>) -> Result<Transcription> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .ok_or_else(|| AssistantError::Stt("Whisper endpoint not configured".to_owned()))?;

        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .map_err(|e| AssistantError::Stt(format!("invalid upload part: {e}")))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("language", self.config.language.clone())
            .text("response_format", "verbose_json");

        let url = format!(
            "{}/v1/audio/transcriptions",
            endpoint.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AssistantError::Stt(format!("transcription request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AssistantError::Stt(format!(
                "transcription endpoint returned {status}: {detail}"
            )));
        }

        let body: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| AssistantError::Stt(format!("invalid transcription response: {e}")))?;

        let text = body.text.trim().to_owned();
        info!("STT result: \"{text}\"");

        Ok(Transcription {
            text,
            language: body.language.unwrap_or_else(|| self.config.language.clone()),
            confidence: body.language_probability.unwrap_or(0.0),
        })
    }
}
