//! Speech and facial-animation sub-API (`/a2f/*`).
//!
//! Every endpoint wraps a third-party call (ElevenLabs TTS, Whisper STT)
//! and returns either a binary file (audio/zip) or a JSON animation
//! package. Provider failures surface as 503 with a descriptive `detail`;
//! they never crash the process. The real NVIDIA Audio2Face pipeline is an
//! external collaborator; animation frames come from the synthetic
//! generator in [`crate::animation`].

use crate::animation::{build_web_package, build_zip_package, generate_face_animation};
use crate::server::{ApiError, AppState};
use crate::speech::audio;
use axum::Json;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

/// Detail string when TTS is not configured.
const TTS_UNAVAILABLE: &str =
    "TTS not available - ElevenLabs not configured. Check ELEVENLABS_API_KEY.";

/// Detail string when STT is not configured.
const STT_UNAVAILABLE: &str =
    "STT not available - Whisper not configured. Set WHISPER_STT_ENDPOINT.";

/// Detail string when TTS is needed for an animation request.
const TTS_UNAVAILABLE_FOR_A2F: &str = "TTS not available for A2F - ElevenLabs not configured";

/// `POST /a2f/tts-only` request body.
#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub voice_id: Option<String>,
}

/// `POST /a2f/stt` request body: base64-encoded audio.
#[derive(Debug, Deserialize)]
pub struct SttRequest {
    pub audio_data: String,
}

/// Animation request body. The A2F routing fields are accepted for
/// compatibility with clients of the real pipeline; the synthetic generator
/// does not use them.
#[derive(Debug, Deserialize)]
pub struct A2fRequest {
    pub text: String,
    #[serde(default)]
    pub function_id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub config_file: Option<String>,
}

/// Build the `/a2f` sub-router.
pub fn router() -> axum::Router<AppState> {
    axum::Router::new()
        .route("/status", get(status))
        .route("/health", get(health))
        .route("/tts-only", post(tts_only))
        .route("/stt", post(stt))
        .route("/web-animation", post(web_animation))
        .route("/text2animation", post(text_to_animation))
}

/// `GET /a2f/status` — availability flags.
pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "tts_available": state.tts.available(),
        "stt_available": state.stt.available(),
        "a2f_available": true,
        "elevenlabs_configured": state.tts.available(),
        "nvidia_key_present": state.config.animation.nvidia_api_key.is_some(),
    }))
}

/// `GET /a2f/health` — detailed sub-API health.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "tts_ready": state.tts.available(),
        "stt_ready": state.stt.available(),
        "a2f_ready": true,
        "web_animation_ready": true,
        "services": {
            "elevenlabs": if state.tts.available() { "configured" } else { "not configured" },
            "whisper": if state.stt.available() { "configured" } else { "not configured" },
            "a2f": "available (synthetic)",
        },
    }))
}

/// `POST /a2f/tts-only` — synthesize speech, return the MP3.
pub async fn tts_only(
    State(state): State<AppState>,
    Json(request): Json<TtsRequest>,
) -> Result<Response, ApiError> {
    info!("TTS request ({} chars)", request.text.len());

    if !state.tts.available() {
        return Err(ApiError::service_unavailable(TTS_UNAVAILABLE));
    }

    let audio = state
        .tts
        .synthesize(&request.text, request.voice_id.as_deref())
        .await
        .map_err(|e| {
            error!("TTS error: {e}");
            ApiError::service_unavailable(format!("TTS failed: {e}"))
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"university_assistant_voice.mp3\"",
            ),
        ],
        audio,
    )
        .into_response())
}

/// `POST /a2f/stt` — transcribe base64 audio.
pub async fn stt(
    State(state): State<AppState>,
    Json(request): Json<SttRequest>,
) -> Result<Json<Value>, ApiError> {
    info!("STT request received");

    if !state.stt.available() {
        return Err(ApiError::service_unavailable(STT_UNAVAILABLE));
    }

    let audio_bytes = BASE64
        .decode(request.audio_data.trim())
        .map_err(|_| ApiError::bad_request("Invalid base64 audio data."))?;
    info!("decoded {} bytes of audio data", audio_bytes.len());

    // Whisper wants 16 kHz mono WAV regardless of what the browser sent.
    let wav = audio::convert_to_wav(&audio_bytes, audio::STT_SAMPLE_RATE).map_err(|e| {
        error!("audio conversion failed: {e}");
        ApiError::bad_request("Failed to process audio format.")
    })?;

    let transcription = state.stt.transcribe(wav).await.map_err(|e| {
        error!("STT error: {e}");
        ApiError::service_unavailable(format!("STT failed: {e}"))
    })?;

    Ok(Json(json!({
        "text": transcription.text,
        "language": transcription.language,
        "confidence": transcription.confidence,
    })))
}

/// Synthesize the animation audio track and measure its duration.
///
/// Falls back to a text-length estimate when the audio cannot be decoded.
async fn animation_audio(state: &AppState, text: &str) -> Result<(Vec<u8>, f32), ApiError> {
    let audio_mp3 = state.tts.synthesize(text, None).await.map_err(|e| {
        error!("animation TTS error: {e}");
        ApiError::service_unavailable(format!("TTS failed: {e}"))
    })?;

    let duration = match audio::duration_secs(&audio_mp3) {
        Ok(duration) => duration,
        Err(e) => {
            warn!("could not measure audio duration ({e}), falling back to estimation");
            audio::estimate_speech_duration(text)
        }
    };

    Ok((audio_mp3, duration))
}

/// `POST /a2f/web-animation` — JSON animation package with embedded audio.
pub async fn web_animation(
    State(state): State<AppState>,
    Json(request): Json<A2fRequest>,
) -> Result<Response, ApiError> {
    info!("web animation request ({} chars)", request.text.len());

    if !state.tts.available() {
        return Err(ApiError::service_unavailable(TTS_UNAVAILABLE_FOR_A2F));
    }

    let (audio_mp3, duration) = animation_audio(&state, &request.text).await?;
    let frames = generate_face_animation(&request.text, duration, &state.config.animation);
    info!("web animation generated: {} frames", frames.len());

    let package = build_web_package(
        &request.text,
        state.tts.default_voice(),
        &audio_mp3,
        duration,
        state.config.animation.fps,
        frames,
    );
    Ok(Json(package).into_response())
}

/// `POST /a2f/text2animation` — zip archive with animation tracks + audio.
pub async fn text_to_animation(
    State(state): State<AppState>,
    Json(request): Json<A2fRequest>,
) -> Result<Response, ApiError> {
    info!("A2F request ({} chars)", request.text.len());
    if let Some(function_id) = &request.function_id {
        info!("A2F function id requested: {function_id}");
    }

    if !state.tts.available() {
        return Err(ApiError::service_unavailable(TTS_UNAVAILABLE_FOR_A2F));
    }

    let (audio_mp3, duration) = animation_audio(&state, &request.text).await?;
    let frames = generate_face_animation(&request.text, duration, &state.config.animation);

    let archive = build_zip_package(&audio_mp3, &frames).map_err(|e| {
        error!("A2F packaging error: {e}");
        ApiError::internal(format!("A2F failed: {e}"))
    })?;
    info!("A2F animation package created: {} bytes", archive.len());

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"university_animation.zip\"",
            ),
        ],
        archive,
    )
        .into_response())
}
