//! Transcription adapter: stages a clip, screens it, and asks the provider

use std::path::Path;
use std::sync::Arc;

use super::artifact::{CleanupWarning, ScratchFile};
use super::{AudioFormat, RecognitionError, Transcriber};

/// Outcome of transcribing one clip
#[derive(Debug)]
pub struct Transcription {
    /// Recognized text, or why there is none
    pub text: Result<String, RecognitionError>,
    /// Set when the staged clip could not be deleted
    pub cleanup: Option<CleanupWarning>,
}

/// Turns recorded clips into text through a [`Transcriber`]
///
/// The clip lives in a scratch file for the duration of the call and is
/// removed on every exit path.
#[derive(Clone)]
pub struct TranscriptionAdapter {
    provider: Arc<dyn Transcriber>,
    silence_threshold: f32,
}

impl TranscriptionAdapter {
    #[must_use]
    pub fn new(provider: Arc<dyn Transcriber>) -> Self {
        Self {
            provider,
            silence_threshold: 0.0,
        }
    }

    /// RMS level under which WAV clips are rejected as silence
    #[must_use]
    pub const fn with_silence_threshold(mut self, threshold: f32) -> Self {
        self.silence_threshold = threshold;
        self
    }

    /// Underlying provider name
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Transcribe a clip
    pub async fn transcribe(&self, clip: &[u8]) -> Transcription {
        let Some(format) = AudioFormat::sniff(clip) else {
            return Transcription {
                text: Err(RecognitionError::Undecodable(
                    "unrecognized audio container".to_string(),
                )),
                cleanup: None,
            };
        };

        let scratch = match ScratchFile::write(clip, format) {
            Ok(scratch) => scratch,
            Err(e) => {
                return Transcription {
                    text: Err(RecognitionError::Scratch(e.to_string())),
                    cleanup: None,
                };
            }
        };

        let text = self.recognize(scratch.path(), format).await;
        let cleanup = scratch.release();

        match &text {
            Ok(t) => tracing::debug!(provider = self.provider.name(), chars = t.len(), "clip transcribed"),
            Err(e) => tracing::warn!(provider = self.provider.name(), error = %e, "clip not recognized"),
        }

        Transcription { text, cleanup }
    }

    async fn recognize(
        &self,
        path: &Path,
        format: AudioFormat,
    ) -> Result<String, RecognitionError> {
        if format == AudioFormat::Wav {
            let level = wav_rms(path)?;
            tracing::debug!(rms = level, threshold = self.silence_threshold, "screened WAV clip");
            if level <= self.silence_threshold {
                return Err(RecognitionError::NoSpeech);
            }
        }

        let audio = tokio::fs::read(path)
            .await
            .map_err(|e| RecognitionError::Scratch(e.to_string()))?;

        let text = self.provider.transcribe(&audio, format).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(RecognitionError::NoSpeech);
        }

        Ok(text.to_string())
    }
}

/// Root-mean-square level of a WAV file, normalized to [0, 1]
///
/// An empty file has level 0.
///
/// # Errors
///
/// Returns [`RecognitionError::Undecodable`] if the file is not valid WAV
pub fn wav_rms(path: &Path) -> Result<f32, RecognitionError> {
    let undecodable = |e: hound::Error| RecognitionError::Undecodable(e.to_string());

    let mut reader = hound::WavReader::open(path).map_err(undecodable)?;
    let spec = reader.spec();

    let mut sum_squares = 0.0_f64;
    let mut count = 0_u64;

    match spec.sample_format {
        hound::SampleFormat::Float => {
            for sample in reader.samples::<f32>() {
                let s = f64::from(sample.map_err(undecodable)?);
                sum_squares += s * s;
                count += 1;
            }
        }
        hound::SampleFormat::Int => {
            let scale = f64::from(1_u32 << (spec.bits_per_sample.clamp(1, 32) - 1));
            for sample in reader.samples::<i32>() {
                let s = f64::from(sample.map_err(undecodable)?) / scale;
                sum_squares += s * s;
                count += 1;
            }
        }
    }

    if count == 0 {
        return Ok(0.0);
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    let rms = (sum_squares / count as f64).sqrt() as f32;
    Ok(rms)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use std::path::PathBuf;

    use super::*;
    use crate::voice::{samples_to_wav, staged_copies};

    struct FixedTranscriber {
        reply: Result<String, RecognitionError>,
        calls: Mutex<Vec<AudioFormat>>,
    }

    impl FixedTranscriber {
        fn new(reply: Result<String, RecognitionError>) -> Arc<Self> {
            Arc::new(Self {
                reply,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(
            &self,
            _audio: &[u8],
            format: AudioFormat,
        ) -> Result<String, RecognitionError> {
            self.calls.lock().unwrap().push(format);
            self.reply.clone()
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    /// Notes which scratch files hold the clip while the provider runs
    struct StagingSpy {
        reply: Result<String, RecognitionError>,
        seen: Mutex<Vec<PathBuf>>,
    }

    #[async_trait]
    impl Transcriber for StagingSpy {
        async fn transcribe(
            &self,
            audio: &[u8],
            _format: AudioFormat,
        ) -> Result<String, RecognitionError> {
            self.seen.lock().unwrap().extend(staged_copies(audio));
            self.reply.clone()
        }

        fn name(&self) -> &'static str {
            "spy"
        }
    }

    fn tone_at(amplitude: f32) -> Vec<u8> {
        let samples: Vec<f32> = (0..1600)
            .map(|i| amplitude * (i as f32 * 0.2).sin())
            .collect();
        samples_to_wav(&samples, 16000).unwrap()
    }

    fn tone() -> Vec<u8> {
        tone_at(0.3)
    }

    async fn staged_paths_after(reply: Result<String, RecognitionError>, clip: &[u8]) -> Vec<PathBuf> {
        let spy = Arc::new(StagingSpy {
            reply,
            seen: Mutex::new(Vec::new()),
        });
        let adapter = TranscriptionAdapter::new(spy.clone());

        let result = adapter.transcribe(clip).await;
        assert!(result.cleanup.is_none());

        spy.seen.lock().unwrap().clone()
    }

    fn silence() -> Vec<u8> {
        samples_to_wav(&vec![0.0; 1600], 16000).unwrap()
    }

    #[tokio::test]
    async fn returns_trimmed_text() {
        let provider = FixedTranscriber::new(Ok("  hello there \n".to_string()));
        let adapter = TranscriptionAdapter::new(provider.clone()).with_silence_threshold(0.001);

        let result = adapter.transcribe(&tone()).await;

        assert_eq!(result.text.unwrap(), "hello there");
        assert!(result.cleanup.is_none());
        assert_eq!(*provider.calls.lock().unwrap(), vec![AudioFormat::Wav]);
    }

    #[tokio::test]
    async fn silent_wav_skips_provider() {
        let provider = FixedTranscriber::new(Ok("should not be used".to_string()));
        let adapter = TranscriptionAdapter::new(provider.clone()).with_silence_threshold(0.001);

        let result = adapter.transcribe(&silence()).await;

        assert_eq!(result.text, Err(RecognitionError::NoSpeech));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_provider_text_is_no_speech() {
        let adapter = TranscriptionAdapter::new(FixedTranscriber::new(Ok("   ".to_string())));
        let result = adapter.transcribe(&tone()).await;
        assert_eq!(result.text, Err(RecognitionError::NoSpeech));
    }

    #[tokio::test]
    async fn provider_failure_is_preserved() {
        let adapter = TranscriptionAdapter::new(FixedTranscriber::new(Err(
            RecognitionError::Unreachable("connection refused".to_string()),
        )));

        let result = adapter.transcribe(&tone()).await;
        assert!(matches!(result.text, Err(RecognitionError::Unreachable(_))));
    }

    #[tokio::test]
    async fn unknown_container_is_undecodable() {
        let provider = FixedTranscriber::new(Ok("x".to_string()));
        let adapter = TranscriptionAdapter::new(provider.clone());

        let result = adapter.transcribe(b"definitely not audio").await;

        assert!(matches!(result.text, Err(RecognitionError::Undecodable(_))));
        assert!(provider.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_wav_containers_go_straight_to_provider() {
        let provider = FixedTranscriber::new(Ok("bonjour".to_string()));
        let adapter = TranscriptionAdapter::new(provider.clone()).with_silence_threshold(0.5);

        let webm = [0x1A, 0x45, 0xDF, 0xA3, 0x01, 0x02, 0x03];
        let result = adapter.transcribe(&webm).await;

        assert_eq!(result.text.unwrap(), "bonjour");
        assert_eq!(*provider.calls.lock().unwrap(), vec![AudioFormat::Webm]);
    }

    #[tokio::test]
    async fn truncated_wav_is_undecodable() {
        let adapter = TranscriptionAdapter::new(FixedTranscriber::new(Ok("x".to_string())));
        let result = adapter.transcribe(b"RIFF\x24\0\0\0WAVE").await;
        assert!(matches!(result.text, Err(RecognitionError::Undecodable(_))));
    }

    #[tokio::test]
    async fn scratch_clip_removed_after_success() {
        let clip = tone_at(0.41);
        let seen = staged_paths_after(Ok("hello".to_string()), &clip).await;

        assert_eq!(seen.len(), 1);
        assert!(seen.iter().all(|path| !path.exists()));
    }

    #[tokio::test]
    async fn scratch_clip_removed_after_provider_error() {
        let clip = tone_at(0.43);
        let seen = staged_paths_after(
            Err(RecognitionError::Rejected {
                status: 401,
                body: "invalid key".to_string(),
            }),
            &clip,
        )
        .await;

        assert_eq!(seen.len(), 1);
        assert!(seen.iter().all(|path| !path.exists()));
    }

    #[test]
    fn rms_of_tone_and_silence() {
        let dir = tempfile::tempdir().unwrap();

        let loud = dir.path().join("tone.wav");
        std::fs::write(&loud, tone()).unwrap();
        assert!(wav_rms(&loud).unwrap() > 0.1);

        let quiet = dir.path().join("silence.wav");
        std::fs::write(&quiet, silence()).unwrap();
        assert!(wav_rms(&quiet).unwrap() < 1e-6);
    }
}
