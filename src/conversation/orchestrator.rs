//! Turn loop: transcription, completion, synthesis

use std::sync::Arc;

use super::{Conversation, Message, Role, serialize_context};
use crate::chat::{ChatClient, ChatCompleter};
use crate::config::{Config, ConversationConfig};
use crate::voice::{
    AudioArtifact, RecognitionError, SpeechSynthesisAdapter, SpeechToText, TextToSpeech,
    TranscriptionAdapter,
};
use crate::{Error, Result};

/// What the shell should render after a turn
#[derive(Debug)]
pub struct TurnOutcome {
    /// The appended user message
    pub user: Message,
    /// The appended assistant message
    pub assistant: Message,
    /// Spoken reply, absent when synthesis is off or failed
    pub audio: Option<AudioArtifact>,
    /// Non-fatal problems hit during the turn
    pub warnings: Vec<String>,
    /// Why the clip was not recognized, for audio turns
    pub recognition_error: Option<RecognitionError>,
}

/// Sequences the adapters for one turn of a [`Conversation`]
///
/// Stateless across sessions; the caller owns each conversation and must
/// not run two turns on the same one concurrently.
pub struct Orchestrator {
    chat: Arc<dyn ChatCompleter>,
    transcription: Option<TranscriptionAdapter>,
    synthesis: Option<SpeechSynthesisAdapter>,
    settings: ConversationConfig,
}

impl Orchestrator {
    /// Text-only orchestrator
    #[must_use]
    pub fn new(chat: Arc<dyn ChatCompleter>, settings: ConversationConfig) -> Self {
        Self {
            chat,
            transcription: None,
            synthesis: None,
            settings,
        }
    }

    #[must_use]
    pub fn with_transcription(mut self, transcription: TranscriptionAdapter) -> Self {
        self.transcription = Some(transcription);
        self
    }

    #[must_use]
    pub fn with_synthesis(mut self, synthesis: SpeechSynthesisAdapter) -> Self {
        self.synthesis = Some(synthesis);
        self
    }

    /// Wire up the HTTP adapters described by `config`
    ///
    /// # Errors
    ///
    /// Returns error if a voice provider is misconfigured
    pub fn from_config(config: &Config) -> Result<Self> {
        let chat = ChatClient::from_config(&config.chat);
        tracing::info!(
            provider = ?config.chat.provider,
            model = %config.chat.model,
            url = %config.chat.base_url,
            "chat backend configured"
        );

        let mut orchestrator = Self::new(Arc::new(chat), config.conversation.clone());

        if config.voice.enabled {
            let stt = SpeechToText::from_config(&config.stt)?;
            orchestrator = orchestrator.with_transcription(
                TranscriptionAdapter::new(Arc::new(stt))
                    .with_silence_threshold(config.stt.silence_threshold),
            );

            let tts = TextToSpeech::from_config(&config.tts)?;
            orchestrator = orchestrator.with_synthesis(SpeechSynthesisAdapter::new(Arc::new(tts)));

            tracing::info!(
                stt = ?config.stt.provider,
                tts = ?config.tts.provider,
                voice = %config.tts.voice,
                "voice enabled"
            );
        } else {
            tracing::info!("voice disabled");
        }

        Ok(orchestrator)
    }

    #[must_use]
    pub fn chat(&self) -> &Arc<dyn ChatCompleter> {
        &self.chat
    }

    #[must_use]
    pub const fn transcription(&self) -> Option<&TranscriptionAdapter> {
        self.transcription.as_ref()
    }

    #[must_use]
    pub const fn synthesis(&self) -> Option<&SpeechSynthesisAdapter> {
        self.synthesis.as_ref()
    }

    #[must_use]
    pub const fn settings(&self) -> &ConversationConfig {
        &self.settings
    }

    /// Start a conversation with the configured greeting
    #[must_use]
    pub fn start_conversation(&self) -> Conversation {
        Conversation::new(self.settings.greeting.clone())
    }

    /// Run one turn for typed input
    ///
    /// # Errors
    ///
    /// Returns error if the chat backend fails; the conversation is left as
    /// it was before the call
    pub async fn submit_text(
        &self,
        conversation: &mut Conversation,
        utterance: String,
    ) -> Result<TurnOutcome> {
        self.run_turn(conversation, utterance, Vec::new(), None).await
    }

    /// Run one turn for a recorded clip
    ///
    /// Unrecognized clips become the fallback sentence.
    ///
    /// # Errors
    ///
    /// Returns error if recognition is not configured or the chat backend
    /// fails
    pub async fn submit_audio(
        &self,
        conversation: &mut Conversation,
        clip: &[u8],
    ) -> Result<TurnOutcome> {
        let transcription = self
            .transcription
            .as_ref()
            .ok_or_else(|| Error::Config("speech recognition is disabled".to_string()))?;

        let result = transcription.transcribe(clip).await;

        let mut warnings = Vec::new();
        if let Some(cleanup) = result.cleanup {
            warnings.push(cleanup.to_string());
        }

        let (utterance, recognition_error) = match result.text {
            Ok(text) => (text, None),
            Err(e) => {
                tracing::info!(
                    session = %conversation.id(),
                    reason = e.code(),
                    "using fallback utterance"
                );
                (self.settings.fallback.clone(), Some(e))
            }
        };

        self.run_turn(conversation, utterance, warnings, recognition_error)
            .await
    }

    async fn run_turn(
        &self,
        conversation: &mut Conversation,
        utterance: String,
        mut warnings: Vec<String>,
        recognition_error: Option<RecognitionError>,
    ) -> Result<TurnOutcome> {
        let checkpoint = conversation.len();
        let user = conversation.push(Role::User, utterance).clone();

        let context = if self.settings.include_current_turn {
            conversation.context()
        } else {
            serialize_context(&conversation.messages()[..checkpoint])
        };

        let reply = match self.chat.complete(user.content(), &context).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(session = %conversation.id(), error = %e, "chat completion failed");
                conversation.rollback(checkpoint);
                return Err(e);
            }
        };

        let assistant = conversation.push(Role::Assistant, reply).clone();
        tracing::info!(
            session = %conversation.id(),
            messages = conversation.len(),
            "turn complete"
        );

        let audio = match &self.synthesis {
            Some(synthesis) => match synthesis.synthesize(assistant.content()).await {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    tracing::warn!(session = %conversation.id(), error = %e, "speech synthesis failed");
                    warnings.push(format!("speech synthesis failed: {e}"));
                    None
                }
            },
            None => None,
        };

        Ok(TurnOutcome {
            user,
            assistant,
            audio,
            warnings,
            recognition_error,
        })
    }
}
