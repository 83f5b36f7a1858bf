//! Shared test utilities
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use voxchat::api::ApiState;
use voxchat::config::ConversationConfig;
use voxchat::voice::{
    AudioFormat, RecognitionError, SAMPLE_RATE, SpeechSynthesisAdapter, Synthesizer, Transcriber,
    TranscriptionAdapter, samples_to_wav,
};
use voxchat::{ChatCompleter, Error, Orchestrator, Result};

/// Chat backend that answers every request with the same reply
pub struct StubChat {
    reply: Option<String>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl StubChat {
    pub fn answering(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ChatCompleter for StubChat {
    async fn complete(&self, utterance: &str, context: &str) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((utterance.to_string(), context.to_string()));
        self.reply
            .clone()
            .ok_or_else(|| Error::Chat("backend unavailable".to_string()))
    }

    async fn probe(&self) -> Result<()> {
        if self.reply.is_some() {
            Ok(())
        } else {
            Err(Error::Chat("backend unavailable".to_string()))
        }
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

/// Recognizer with a canned answer
pub struct StubTranscriber(pub std::result::Result<String, RecognitionError>);

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(
        &self,
        _audio: &[u8],
        _format: AudioFormat,
    ) -> std::result::Result<String, RecognitionError> {
        self.0.clone()
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Synthesizer returning a fixed MP3-tagged payload
pub struct StubSynthesizer {
    pub fail: bool,
    pub calls: Mutex<Vec<String>>,
}

impl StubSynthesizer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: false,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail: true,
            calls: Mutex::new(Vec::new()),
        })
    }
}

/// Bytes produced by [`StubSynthesizer`]
pub const STUB_AUDIO: &[u8] = b"ID3\x04\x00stub-mp3";

#[async_trait]
impl Synthesizer for StubSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Tts("synthesizer offline".to_string()));
        }
        Ok(STUB_AUDIO.to_vec())
    }

    fn voice(&self) -> &str {
        "stub-voice"
    }
}

/// Orchestrator with all three adapters stubbed
pub fn voice_orchestrator(
    chat: Arc<StubChat>,
    heard: std::result::Result<String, RecognitionError>,
    synth: Arc<StubSynthesizer>,
) -> Orchestrator {
    Orchestrator::new(chat, ConversationConfig::default())
        .with_transcription(
            TranscriptionAdapter::new(Arc::new(StubTranscriber(heard)))
                .with_silence_threshold(0.001),
        )
        .with_synthesis(SpeechSynthesisAdapter::new(synth))
}

/// Router over a fresh session store
pub fn test_app(orchestrator: Orchestrator) -> axum::Router {
    voxchat::api::app(Arc::new(ApiState::new(orchestrator)), None)
}

/// Generate sine wave samples
pub fn sine_samples(frequency: f32, duration_secs: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

/// Half a second of 440Hz tone as WAV
pub fn tone_wav() -> Vec<u8> {
    samples_to_wav(&sine_samples(440.0, 0.5, 0.3), SAMPLE_RATE).unwrap()
}

/// Half a second of silence as WAV
pub fn silence_wav() -> Vec<u8> {
    samples_to_wav(&vec![0.0; (SAMPLE_RATE / 2) as usize], SAMPLE_RATE).unwrap()
}
