//! Conversation session endpoints

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiError, ApiJson, ApiState, SessionId};
use crate::conversation::{Message, TurnOutcome};
use crate::session::SharedConversation;

/// Session routes, nested under `/api/sessions`
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", post(create_session))
        .route("/{id}", get(get_session).delete(delete_session))
        .route("/{id}/text", post(submit_text))
        .route("/{id}/audio", post(submit_audio))
        .with_state(state)
}

/// Session snapshot
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub messages: Vec<Message>,
}

/// Typed turn input
#[derive(Debug, Deserialize)]
pub struct TextTurnRequest {
    pub text: String,
}

/// Synthesized reply encoded for JSON
#[derive(Debug, Serialize)]
pub struct AudioPayload {
    pub format: String,
    pub mime_type: &'static str,
    /// Base64 (standard alphabet) audio bytes
    pub data: String,
}

/// Render instruction for one completed turn
#[derive(Debug, Serialize)]
pub struct TurnResponse {
    /// The user message followed by the assistant reply
    pub messages: Vec<Message>,
    pub audio: Option<AudioPayload>,
    pub warnings: Vec<String>,
    pub recognition_error: Option<String>,
}

impl From<TurnOutcome> for TurnResponse {
    fn from(outcome: TurnOutcome) -> Self {
        let mut warnings = outcome.warnings;

        let audio = outcome.audio.and_then(|artifact| {
            let format = artifact.format();
            let played = artifact.into_bytes();
            if let Some(cleanup) = played.cleanup {
                warnings.push(cleanup.to_string());
            }
            match played.outcome {
                Ok(bytes) => Some(AudioPayload {
                    format: format.to_string(),
                    mime_type: format.mime_type(),
                    data: base64::engine::general_purpose::STANDARD.encode(bytes),
                }),
                Err(e) => {
                    warnings.push(format!("failed to read synthesized audio: {e}"));
                    None
                }
            }
        });

        Self {
            messages: vec![outcome.user, outcome.assistant],
            audio,
            warnings,
            recognition_error: outcome.recognition_error.map(|e| e.to_string()),
        }
    }
}

async fn create_session(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<SessionResponse>) {
    let (session_id, conversation) = state.sessions.create().await;
    let messages = conversation.lock().await.messages().to_vec();

    tracing::info!(session = %session_id, "session started");
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id,
            messages,
        }),
    )
}

async fn get_session(
    State(state): State<Arc<ApiState>>,
    SessionId(id): SessionId,
) -> Result<Json<SessionResponse>, ApiError> {
    let conversation = lookup(&state, id).await?;
    let messages = conversation.lock().await.messages().to_vec();

    Ok(Json(SessionResponse {
        session_id: id,
        messages,
    }))
}

async fn delete_session(
    State(state): State<Arc<ApiState>>,
    SessionId(id): SessionId,
) -> Result<StatusCode, ApiError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::SessionNotFound(id))
    }
}

async fn submit_text(
    State(state): State<Arc<ApiState>>,
    SessionId(id): SessionId,
    ApiJson(request): ApiJson<TextTurnRequest>,
) -> Result<Json<TurnResponse>, ApiError> {
    if request.text.trim().is_empty() {
        return Err(ApiError::BadRequest("Empty text".to_string()));
    }

    let conversation = lookup(&state, id).await?;
    let orchestrator = Arc::clone(&state.orchestrator);

    // Spawned so a client disconnect cannot abandon a turn half-applied
    let turn = tokio::spawn(async move {
        let mut conversation = conversation.lock_owned().await;
        orchestrator
            .submit_text(&mut conversation, request.text)
            .await
            .map(TurnResponse::from)
    });

    let response = turn.await.map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(response))
}

async fn submit_audio(
    State(state): State<Arc<ApiState>>,
    SessionId(id): SessionId,
    body: Bytes,
) -> Result<Json<TurnResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("Empty audio data".to_string()));
    }
    if state.orchestrator.transcription().is_none() {
        return Err(ApiError::NotConfigured("speech recognition is disabled"));
    }

    let conversation = lookup(&state, id).await?;
    let orchestrator = Arc::clone(&state.orchestrator);

    let turn = tokio::spawn(async move {
        let mut conversation = conversation.lock_owned().await;
        orchestrator
            .submit_audio(&mut conversation, &body)
            .await
            .map(TurnResponse::from)
    });

    let response = turn.await.map_err(|e| ApiError::Internal(e.to_string()))??;
    Ok(Json(response))
}

async fn lookup(state: &ApiState, id: Uuid) -> Result<SharedConversation, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or(ApiError::SessionNotFound(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, Role};
    use crate::voice::{AudioArtifact, AudioFormat};

    fn outcome_with(audio: Option<AudioArtifact>) -> TurnOutcome {
        let mut conversation = Conversation::new("Hi!");
        let user = conversation.push(Role::User, "What is 2+2?").clone();
        let assistant = conversation.push(Role::Assistant, "4").clone();

        TurnOutcome {
            user,
            assistant,
            audio,
            warnings: Vec::new(),
            recognition_error: None,
        }
    }

    #[test]
    fn audio_is_base64_encoded() {
        let artifact = AudioArtifact::store(b"ID3", AudioFormat::Mp3).unwrap();

        let response = TurnResponse::from(outcome_with(Some(artifact)));

        let audio = response.audio.unwrap();
        assert_eq!(audio.format, "mp3");
        assert_eq!(audio.mime_type, "audio/mpeg");
        assert_eq!(audio.data, "SUQz");
        assert!(response.warnings.is_empty());
    }

    #[test]
    fn undeletable_audio_becomes_warning() {
        let artifact = AudioArtifact::store(b"ID3", AudioFormat::Mp3).unwrap();
        let path = artifact.path().to_path_buf();
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("pinned"), b"x").unwrap();

        let response = TurnResponse::from(outcome_with(Some(artifact)));

        assert!(response.audio.is_none());
        assert_eq!(response.messages.len(), 2);
        assert!(
            response
                .warnings
                .iter()
                .any(|w| w.contains("failed to remove temporary audio file"))
        );

        std::fs::remove_dir_all(&path).unwrap();
    }
}
