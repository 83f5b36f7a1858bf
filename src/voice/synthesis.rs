//! Speech synthesis adapter: provider audio into a playable artifact

use std::sync::Arc;

use super::{AudioArtifact, AudioFormat, Synthesizer};
use crate::Result;

/// Renders reply text into an [`AudioArtifact`]
///
/// Blocks until the provider has returned the whole clip.
#[derive(Clone)]
pub struct SpeechSynthesisAdapter {
    provider: Arc<dyn Synthesizer>,
}

impl SpeechSynthesisAdapter {
    #[must_use]
    pub fn new(provider: Arc<dyn Synthesizer>) -> Self {
        Self { provider }
    }

    /// Voice used by the provider
    #[must_use]
    pub fn voice(&self) -> &str {
        self.provider.voice()
    }

    /// Synthesize `text` into a temporary audio file
    ///
    /// # Errors
    ///
    /// Returns error if the provider fails or the file cannot be written
    pub async fn synthesize(&self, text: &str) -> Result<AudioArtifact> {
        let audio = self.provider.synthesize(text).await?;
        let format = AudioFormat::sniff(&audio).unwrap_or(AudioFormat::Mp3);

        let artifact = AudioArtifact::store(&audio, format)?;
        tracing::debug!(
            bytes = audio.len(),
            %format,
            path = %artifact.path().display(),
            "speech artifact written"
        );

        Ok(artifact)
    }
}
