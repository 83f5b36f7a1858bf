//! Terminal chat shell
//!
//! Typed lines are sent as text turns. An empty line records a clip from
//! the microphone when recognition is enabled. `/quit` ends the session.

use std::io::Write;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::conversation::{Conversation, Orchestrator, TurnOutcome};
use crate::voice::{AudioArtifact, AudioCapture, AudioPlayback};
use crate::{Error, Result};

/// Interactive single-session chat on stdin/stdout
pub struct ChatShell {
    orchestrator: Orchestrator,
    speak: bool,
    record_for: Duration,
}

impl ChatShell {
    #[must_use]
    pub const fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            speak: false,
            record_for: Duration::from_secs(5),
        }
    }

    /// Play synthesized replies on the default output device
    #[must_use]
    pub const fn speak(mut self, speak: bool) -> Self {
        self.speak = speak;
        self
    }

    /// Length of microphone recordings
    #[must_use]
    pub const fn record_for(mut self, duration: Duration) -> Self {
        self.record_for = duration;
        self
    }

    /// Run until EOF or `/quit`
    ///
    /// # Errors
    ///
    /// Returns error if stdin cannot be read
    pub async fn run(self) -> Result<()> {
        let mut conversation = self.orchestrator.start_conversation();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        for message in conversation.messages() {
            println!("{}> {}", message.role(), message.content());
        }

        loop {
            print!("user> ");
            std::io::stdout().flush()?;

            let Some(line) = lines.next_line().await? else {
                println!();
                break;
            };

            let input = line.trim();
            if matches!(input, "/quit" | "/exit") {
                break;
            }

            let turn = if input.is_empty() {
                if self.orchestrator.transcription().is_none() {
                    println!("(speech recognition is disabled; type a message)");
                    continue;
                }
                self.voice_turn(&mut conversation).await
            } else {
                self.orchestrator
                    .submit_text(&mut conversation, line.clone())
                    .await
            };

            match turn {
                Ok(outcome) => self.render(outcome).await,
                Err(e) => {
                    tracing::debug!(error = %e, "turn failed");
                    println!("error: {e}");
                }
            }
        }

        tracing::info!(
            session = %conversation.id(),
            messages = conversation.len(),
            "chat session ended"
        );
        Ok(())
    }

    async fn voice_turn(&self, conversation: &mut Conversation) -> Result<TurnOutcome> {
        println!("(listening for {}s...)", self.record_for.as_secs());

        let duration = self.record_for;
        let clip = tokio::task::spawn_blocking(move || {
            let mut capture = AudioCapture::new()?;
            capture.record_for(duration)
        })
        .await
        .map_err(|e| Error::Audio(e.to_string()))??;

        let outcome = self.orchestrator.submit_audio(conversation, &clip).await?;
        println!("(heard) {}", outcome.user.content());
        if let Some(reason) = &outcome.recognition_error {
            tracing::debug!(reason = %reason, "recognition failed");
            if reason.is_transient() {
                println!("(speech service unavailable: {reason}; press Enter to record again)");
            }
        }
        Ok(outcome)
    }

    async fn render(&self, outcome: TurnOutcome) {
        println!("{}> {}", outcome.assistant.role(), outcome.assistant.content());

        for warning in &outcome.warnings {
            println!("warning: {warning}");
        }

        if let Some(artifact) = outcome.audio {
            if self.speak {
                if let Err(e) = play(artifact).await {
                    println!("warning: {e}");
                }
            }
        }
    }
}

/// Play an artifact off the async runtime; the file is removed either way
async fn play(artifact: AudioArtifact) -> Result<()> {
    let played = tokio::task::spawn_blocking(move || {
        artifact.play_with(|bytes, format| AudioPlayback::new()?.play(bytes, format))
    })
    .await
    .map_err(|e| Error::Audio(e.to_string()))?;

    if let Some(cleanup) = played.cleanup {
        println!("warning: {cleanup}");
    }
    played.outcome
}
