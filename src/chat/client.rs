//! HTTP chat completion client (Ollama and `OpenAI`-compatible)

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::{ChatCompleter, ChatMessage, build_messages};
use crate::config::{ChatConfig, ChatProvider};
use crate::{Error, Result};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Ollama `/api/chat` response
#[derive(Deserialize)]
struct OllamaResponse {
    message: ChatMessage,
}

/// `OpenAI` `/chat/completions` response
#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: ChatMessage,
}

/// Chat backend reached over HTTP
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    provider: ChatProvider,
}

impl ChatClient {
    /// Client for a local or remote Ollama server
    #[must_use]
    pub fn new_ollama(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
            api_key: None,
            provider: ChatProvider::Ollama,
        }
    }

    /// Client for an `OpenAI`-compatible server
    #[must_use]
    pub fn new_openai(base_url: String, model: String, api_key: Option<SecretString>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
            api_key,
            provider: ChatProvider::OpenAi,
        }
    }

    #[must_use]
    pub fn from_config(config: &ChatConfig) -> Self {
        match config.provider {
            ChatProvider::Ollama => Self::new_ollama(config.base_url.clone(), config.model.clone()),
            ChatProvider::OpenAi => Self::new_openai(
                config.base_url.clone(),
                config.model.clone(),
                config
                    .api_key
                    .as_ref()
                    .map(|k| SecretString::from(k.expose_secret().to_owned())),
            ),
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key.expose_secret()),
            None => request,
        }
    }

    async fn complete_ollama(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: Some(false),
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %self.base_url, "Ollama request failed");
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Ollama API error");
            return Err(Error::Chat(format!("Ollama error {status}: {body}")));
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| Error::Chat(format!("malformed Ollama response: {e}")))?;

        Ok(parsed.message.content)
    }

    async fn complete_openai(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: None,
        };

        let response = self
            .authorize(
                self.client
                    .post(format!("{}/chat/completions", self.base_url)),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %self.base_url, "chat completion request failed");
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat completion API error");
            return Err(Error::Chat(format!("chat completion error {status}: {body}")));
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| Error::Chat(format!("malformed chat completion response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| Error::Chat("chat completion returned no choices".to_string()))
    }
}

#[async_trait]
impl ChatCompleter for ChatClient {
    async fn complete(&self, utterance: &str, context: &str) -> Result<String> {
        let messages = build_messages(utterance, context);
        tracing::debug!(
            model = %self.model,
            context_chars = context.len(),
            "requesting chat completion"
        );

        let reply = match self.provider {
            ChatProvider::Ollama => self.complete_ollama(&messages).await?,
            ChatProvider::OpenAi => self.complete_openai(&messages).await?,
        };

        tracing::debug!(reply_chars = reply.len(), "chat completion received");
        Ok(reply)
    }

    async fn probe(&self) -> Result<()> {
        let url = match self.provider {
            ChatProvider::Ollama => format!("{}/api/tags", self.base_url),
            ChatProvider::OpenAi => format!("{}/models", self.base_url),
        };

        let response = self.authorize(self.client.get(&url)).send().await?;
        if !response.status().is_success() {
            return Err(Error::Chat(format!(
                "chat backend not ready: {}",
                response.status()
            )));
        }

        Ok(())
    }

    fn model(&self) -> &str {
        &self.model
    }
}
