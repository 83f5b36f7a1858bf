//! API error responses

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use uuid::Uuid;

use crate::voice::RecognitionError;

/// Errors surfaced to HTTP clients as `{error: {code, message}}`
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    SessionNotFound(Uuid),
    NotConfigured(&'static str),
    ChatFailed(String),
    Recognition(RecognitionError),
    SynthesisFailed(String),
    Internal(String),
}

impl From<crate::Error> for ApiError {
    fn from(err: crate::Error) -> Self {
        match err {
            crate::Error::Config(_) => Self::NotConfigured("voice is disabled"),
            crate::Error::Tts(msg) => Self::SynthesisFailed(msg),
            crate::Error::Chat(msg) => Self::ChatFailed(msg),
            crate::Error::Http(e) => Self::ChatFailed(e.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn parts(self) -> (StatusCode, &'static str, String) {
        match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::SessionNotFound(id) => (
                StatusCode::NOT_FOUND,
                "session_not_found",
                format!("session {id} not found"),
            ),
            Self::NotConfigured(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "not_configured",
                msg.to_string(),
            ),
            Self::ChatFailed(msg) => (StatusCode::BAD_GATEWAY, "chat_failed", msg),
            Self::Recognition(e) => {
                let status = match &e {
                    RecognitionError::NoSpeech | RecognitionError::Undecodable(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    RecognitionError::Scratch(_) => StatusCode::INTERNAL_SERVER_ERROR,
                    _ => StatusCode::BAD_GATEWAY,
                };
                (status, e.code(), e.to_string())
            }
            Self::SynthesisFailed(msg) => (StatusCode::BAD_GATEWAY, "synthesis_failed", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = self.parts();
        if status.is_server_error() {
            tracing::warn!(status = %status, code, message = %message, "request failed");
        }

        (status, Json(ErrorResponse { error: ErrorBody { code, message } })).into_response()
    }
}
