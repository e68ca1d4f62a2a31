//! Text-to-speech through the ElevenLabs HTTP API.

use crate::config::TtsConfig;
use crate::error::{AssistantError, Result};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// ElevenLabs text-to-speech adapter.
///
/// Construction never fails: without an API key the adapter simply reports
/// itself unavailable and every synthesis attempt errors.
pub struct ElevenLabsTts {
    client: reqwest::Client,
    config: TtsConfig,
}

impl ElevenLabsTts {
    #[must_use]
    pub fn new(config: &TtsConfig) -> Self {
        if config.api_key.is_none() {
            warn!("ELEVENLABS_API_KEY not found, TTS unavailable");
        } else {
            info!("ElevenLabs TTS initialized (voice: {})", config.voice_id);
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

    /// Whether an API key is configured.
    #[must_use]
    pub fn available(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// The configured default voice.
    #[must_use]
    pub fn default_voice(&self) -> &str {
        &self.config.voice_id
    }

    /// Synthesize speech, returning encoded audio bytes (MP3 by default).
    ///
    /// # Errors
    ///
    /// Returns an error when no API key is configured, the provider rejects
    /// the request, or the returned audio is empty.
    pub async fn synthesize(&self, text: &str, voice_id: Option<&str>) -> Result<Vec<u8>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AssistantError::Tts("ElevenLabs API key not configured".to_owned()))?;
        let voice = voice_id.unwrap_or(&self.config.voice_id);

        info!("generating TTS with voice_id: {voice}");

        let url = format!(
            "{}/v1/text-to-speech/{voice}/stream",
            self.config.base_url.trim_end_matches('/')
        );
        let body = json!({
            "text": text,
            "model_id": &self.config.model_id,
            "voice_settings": &self.config.voice_settings,
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .query(&[("output_format", self.config.output_format.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistantError::Tts(format!("ElevenLabs request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(AssistantError::Tts(format!(
                "ElevenLabs returned {status}: {detail}"
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| AssistantError::Tts(format!("failed to read audio stream: {e}")))?;

        if audio.is_empty() {
            return Err(AssistantError::Tts(
                "generated audio file is empty".to_owned(),
            ));
        }

        info!("TTS generated {} bytes of audio", audio.len());
        Ok(audio.to_vec())
    }
}
