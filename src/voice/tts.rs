//! Text-to-speech (TTS) providers

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{TtsConfig, TtsProvider};
use crate::{Error, Result};

/// Speech synthesis backend
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Render text as encoded audio (MP3 unless the provider says otherwise)
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Voice identifier in use
    fn voice(&self) -> &str;
}

/// Synthesizes speech from text over HTTP
pub struct TextToSpeech {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    voice: String,
    speed: f32,
    model: String,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create an `OpenAI`-compatible speech client
    ///
    /// The API key is optional so that local speech servers work.
    #[must_use]
    pub fn new_openai(
        base_url: String,
        api_key: Option<SecretString>,
        model: String,
        voice: String,
        speed: f32,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            voice,
            speed,
            model,
            provider: TtsProvider::OpenAi,
        }
    }

    /// Create an `ElevenLabs` client
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_elevenlabs(
        base_url: String,
        api_key: Option<SecretString>,
        model: String,
        voice_id: String,
    ) -> Result<Self> {
        if api_key.is_none() {
            return Err(Error::Config(
                "ElevenLabs API key required for TTS".to_string(),
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            voice: voice_id,
            speed: 1.0, // ElevenLabs doesn't use speed in the same way
            model,
            provider: TtsProvider::ElevenLabs,
        })
    }

    /// Build from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the provider requires a key that is missing
    pub fn from_config(config: &TtsConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_owned()));

        match config.provider {
            TtsProvider::OpenAi => Ok(Self::new_openai(
                config.base_url.clone(),
                api_key,
                config.model.clone(),
                config.voice.clone(),
                config.speed,
            )),
            TtsProvider::ElevenLabs => Self::new_elevenlabs(
                config.base_url.clone(),
                api_key,
                config.model.clone(),
                config.voice.clone(),
            ),
        }
    }

    /// Synthesize using an `OpenAI`-compatible speech endpoint
    async fn synthesize_openai(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
            response_format: &'a str,
        }

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
            response_format: "mp3",
        };

        let mut builder = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key.expose_secret());
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    /// Synthesize using `ElevenLabs` TTS
    async fn synthesize_elevenlabs(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
        }

        let url = format!("{}/text-to-speech/{}", self.base_url, self.voice);

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
        };

        let key = self
            .api_key
            .as_ref()
            .map(|k| k.expose_secret().to_string())
            .unwrap_or_default();

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", key)
            .header("Accept", "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("ElevenLabs TTS error {status}: {body}")));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl Synthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(chars = text.len(), voice = %self.voice, "synthesizing speech");
        match self.provider {
            TtsProvider::OpenAi => self.synthesize_openai(text).await,
            TtsProvider::ElevenLabs => self.synthesize_elevenlabs(text).await,
        }
    }

    fn voice(&self) -> &str {
        &self.voice
    }
}
