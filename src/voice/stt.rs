//! Speech-to-text (STT) providers

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use super::AudioFormat;
use crate::config::{SttConfig, SttProvider};
use crate::{Error, Result};

/// Why a clip produced no text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecognitionError {
    /// The clip was silent or the provider heard nothing
    #[error("no speech recognized")]
    NoSpeech,

    /// The clip is not in a decodable container
    #[error("undecodable audio: {0}")]
    Undecodable(String),

    /// The provider could not be reached
    #[error("recognition provider unreachable: {0}")]
    Unreachable(String),

    /// The provider answered with a non-success status
    #[error("recognition provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The provider answered with something that isn't a transcript
    #[error("malformed recognition response: {0}")]
    Malformed(String),

    /// The clip could not be staged in a temporary file
    #[error("failed to stage audio clip: {0}")]
    Scratch(String),
}

impl RecognitionError {
    /// Stable machine-readable code for API responses
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NoSpeech => "no_speech",
            Self::Undecodable(_) => "undecodable",
            Self::Unreachable(_) => "unreachable",
            Self::Rejected { .. } => "rejected",
            Self::Malformed(_) => "malformed",
            Self::Scratch(_) => "scratch",
        }
    }

    /// Whether trying the same clip again could succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unreachable(_) | Self::Scratch(_))
    }
}

/// Speech recognition backend
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Recognize speech in an encoded audio clip
    ///
    /// # Errors
    ///
    /// Returns the recognition failure cause
    async fn transcribe(
        &self,
        audio: &[u8],
        format: AudioFormat,
    ) -> std::result::Result<String, RecognitionError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Response from Whisper-compatible transcription APIs
#[derive(serde::Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from Deepgram transcription API
#[derive(serde::Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(serde::Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(serde::Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(serde::Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

/// Transcribes speech to text over HTTP
pub struct SpeechToText {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
    language: Option<String>,
    provider: SttProvider,
}

impl SpeechToText {
    /// Create a Whisper-compatible client
    ///
    /// The API key is optional so that local whisper servers work.
    #[must_use]
    pub fn new_whisper(base_url: String, api_key: Option<SecretString>, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            language: None,
            provider: SttProvider::Whisper,
        }
    }

    /// Create a Deepgram client
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_deepgram(base_url: String, api_key: Option<SecretString>, model: String) -> Result<Self> {
        if api_key.is_none() {
            return Err(Error::Config("Deepgram API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            language: None,
            provider: SttProvider::Deepgram,
        })
    }

    /// Build from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the provider requires a key that is missing
    pub fn from_config(config: &SttConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_owned()));

        let stt = match config.provider {
            SttProvider::Whisper => {
                Self::new_whisper(config.base_url.clone(), api_key, config.model.clone())
            }
            SttProvider::Deepgram => {
                Self::new_deepgram(config.base_url.clone(), api_key, config.model.clone())?
            }
        };

        Ok(stt.with_language(config.language.clone()))
    }

    /// Set a language hint
    #[must_use]
    pub fn with_language(mut self, language: Option<String>) -> Self {
        self.language = language;
        self
    }

    /// Transcribe using a Whisper-compatible endpoint
    async fn transcribe_whisper(
        &self,
        audio: &[u8],
        format: AudioFormat,
    ) -> std::result::Result<String, RecognitionError> {
        tracing::debug!(audio_bytes = audio.len(), %format, "starting Whisper transcription");

        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(format!("audio.{}", format.extension()))
            .mime_str(format.mime_type())
            .map_err(|e| RecognitionError::Undecodable(e.to_string()))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());
        if let Some(lang) = &self.language {
            form = form.text("language", lang.clone());
        }

        let mut request = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .multipart(form);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "Whisper request failed");
            RecognitionError::Unreachable(e.to_string())
        })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(RecognitionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let result: WhisperResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse response");
            RecognitionError::Malformed(e.to_string())
        })?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }

    /// Transcribe using Deepgram
    async fn transcribe_deepgram(
        &self,
        audio: &[u8],
        format: AudioFormat,
    ) -> std::result::Result<String, RecognitionError> {
        tracing::debug!(audio_bytes = audio.len(), %format, "starting Deepgram transcription");

        let mut url = format!(
            "{}/listen?model={}&punctuate=true",
            self.base_url, self.model
        );
        if let Some(lang) = &self.language {
            url.push_str("&language=");
            url.push_str(lang);
        }

        let key = self
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().to_string())
            .unwrap_or_default();

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {key}"))
            .header("Content-Type", format.mime_type())
            .body(audio.to_vec())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Deepgram request failed");
                RecognitionError::Unreachable(e.to_string())
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Deepgram API error");
            return Err(RecognitionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let result: DeepgramResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse Deepgram response");
            RecognitionError::Malformed(e.to_string())
        })?;

        let transcript = result
            .results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.clone())
            .unwrap_or_default();

        tracing::info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

#[async_trait]
impl Transcriber for SpeechToText {
    async fn transcribe(
        &self,
        audio: &[u8],
        format: AudioFormat,
    ) -> std::result::Result<String, RecognitionError> {
        match self.provider {
            SttProvider::Whisper => self.transcribe_whisper(audio, format).await,
            SttProvider::Deepgram => self.transcribe_deepgram(audio, format).await,
        }
    }

    fn name(&self) -> &'static str {
        match self.provider {
            SttProvider::Whisper => "whisper",
            SttProvider::Deepgram => "deepgram",
        }
    }
}
