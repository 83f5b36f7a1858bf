//! Voice processing
//!
//! Recognition and synthesis adapters over HTTP providers, scoped
//! temporary audio files, plus local microphone capture and playback for
//! the terminal shell.

mod artifact;
mod capture;
mod format;
mod playback;
mod stt;
mod synthesis;
mod transcription;
mod tts;

pub use artifact::{AudioArtifact, CleanupWarning, Played};
#[cfg(test)]
pub(crate) use artifact::staged_copies;
pub use capture::{AudioCapture, SAMPLE_RATE, samples_to_wav};
pub use format::AudioFormat;
pub use playback::{AudioPlayback, Pcm};
pub use stt::{RecognitionError, SpeechToText, Transcriber};
pub use synthesis::SpeechSynthesisAdapter;
pub use transcription::{Transcription, TranscriptionAdapter, wav_rms};
pub use tts::{Synthesizer, TextToSpeech};
