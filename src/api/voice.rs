//! Direct access to the recognition and synthesis adapters

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiJson, ApiState};
use crate::voice::{AudioFormat, Played};

/// Response header carrying a non-fatal problem with synthesized audio
pub const WARNING_HEADER: &str = "x-voxchat-warning";

/// Voice routes, nested under `/api/voice`
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/transcribe", post(transcribe))
        .route("/synthesize", post(synthesize))
        .route("/capabilities", get(capabilities))
        .with_state(state)
}

/// Voice capabilities response
#[derive(Debug, Serialize)]
pub struct VoiceCapabilities {
    pub stt_available: bool,
    pub tts_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stt_provider: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_voice: Option<String>,
}

async fn capabilities(State(state): State<Arc<ApiState>>) -> Json<VoiceCapabilities> {
    let transcription = state.orchestrator.transcription();
    let synthesis = state.orchestrator.synthesis();

    Json(VoiceCapabilities {
        stt_available: transcription.is_some(),
        tts_available: synthesis.is_some(),
        stt_provider: transcription.map(crate::voice::TranscriptionAdapter::provider_name),
        tts_voice: synthesis.map(|s| s.voice().to_string()),
    })
}

/// Transcription response
#[derive(Debug, Serialize)]
pub struct TranscribeResponse {
    pub text: String,
    pub warnings: Vec<String>,
}

/// Transcribe a clip (WAV, `WebM`, Ogg, MP3 or FLAC)
async fn transcribe(
    State(state): State<Arc<ApiState>>,
    body: Bytes,
) -> Result<Json<TranscribeResponse>, ApiError> {
    let transcription = state
        .orchestrator
        .transcription()
        .ok_or(ApiError::NotConfigured("STT not configured"))?;

    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty audio data".to_string()));
    }

    let result = transcription.transcribe(&body).await;
    let warnings = result.cleanup.iter().map(ToString::to_string).collect();
    let text = result.text.map_err(ApiError::Recognition)?;

    Ok(Json(TranscribeResponse { text, warnings }))
}

/// Synthesis request
#[derive(Debug, Deserialize)]
pub struct SynthesizeRequest {
    pub text: String,
}

/// Synthesize text; answers with the raw audio
async fn synthesize(
    State(state): State<Arc<ApiState>>,
    ApiJson(request): ApiJson<SynthesizeRequest>,
) -> Result<Response, ApiError> {
    let synthesis = state
        .orchestrator
        .synthesis()
        .ok_or(ApiError::NotConfigured("TTS not configured"))?;

    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Empty text".to_string()));
    }

    let artifact = synthesis.synthesize(&request.text).await?;
    let format = artifact.format();

    audio_response(format, artifact.into_bytes())
}

/// Raw audio body; a cleanup failure travels in [`WARNING_HEADER`]
fn audio_response(format: AudioFormat, played: Played<Vec<u8>>) -> Result<Response, ApiError> {
    let warning = played.cleanup.map(|cleanup| {
        tracing::warn!(warning = %cleanup, "synthesized audio left on disk");
        HeaderValue::from_str(&cleanup.to_string())
            .unwrap_or_else(|_| HeaderValue::from_static("failed to remove temporary audio file"))
    });
    let audio = played.outcome?;

    let mut response =
        (StatusCode::OK, [(header::CONTENT_TYPE, format.mime_type())], audio).into_response();
    if let Some(warning) = warning {
        response.headers_mut().insert(WARNING_HEADER, warning);
    }

    Ok(response)
}
