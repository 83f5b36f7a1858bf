use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voxchat::api::ApiServerBuilder;
use voxchat::voice::{
    AudioCapture, AudioPlayback, Pcm, SpeechSynthesisAdapter, SpeechToText, TextToSpeech,
    TranscriptionAdapter,
};
use voxchat::{ChatShell, Config, Orchestrator};

/// voxchat - talk to a local language model by text or voice
#[derive(Parser)]
#[command(name = "voxchat", version, about)]
struct Cli {
    /// Configuration file (defaults to ~/.config/voxchat/config.toml)
    #[arg(short, long, env = "VOXCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(long, env = "VOXCHAT_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable speech recognition and synthesis
    #[arg(long, env = "VOXCHAT_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        /// Directory with a web UI to serve
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
    /// Chat in the terminal
    Chat {
        /// Play replies through the speakers
        #[arg(long)]
        speak: bool,
        /// Seconds to record when an empty line is entered
        #[arg(long, default_value = "5")]
        record_secs: u64,
    },
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
    /// Transcribe an audio file
    TestStt {
        /// Audio file (WAV, MP3, Ogg, WebM or FLAC)
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info,voxchat=info",
        1 => "info,voxchat=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Some(Command::TestMic { duration }) => return test_mic(duration).await,
        Some(Command::TestSpeaker) => return test_speaker().await,
        Some(Command::TestTts { text }) => {
            let config = Config::load(config_path, false)?;
            return test_tts(&config, &text).await;
        }
        Some(Command::TestStt { file }) => {
            let config = Config::load(config_path, false)?;
            return test_stt(&config, &file).await;
        }
        Some(Command::Chat { speak, record_secs }) => {
            let config = Config::load(config_path, cli.disable_voice)?;
            tracing::debug!(?config, "loaded configuration");

            let orchestrator = Orchestrator::from_config(&config)?;
            ChatShell::new(orchestrator)
                .speak(speak)
                .record_for(Duration::from_secs(record_secs))
                .run()
                .await?;
            return Ok(());
        }
        Some(Command::Serve { static_dir }) => {
            return serve(cli.port, config_path, cli.disable_voice, static_dir).await;
        }
        None => {}
    }

    serve(cli.port, config_path, cli.disable_voice, None).await
}

async fn serve(
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
    disable_voice: bool,
    static_dir: Option<PathBuf>,
) -> anyhow::Result<()> {
    let config = Config::load(config_path, disable_voice)?;
    tracing::debug!(?config, "loaded configuration");

    let port = port.unwrap_or(config.server.port);
    let static_dir = static_dir.or_else(|| config.server.static_dir.clone());

    tracing::info!(
        host = %config.server.host,
        port,
        model = %config.chat.model,
        voice = config.voice.enabled,
        "starting voxchat"
    );

    let orchestrator = Orchestrator::from_config(&config)?;

    ApiServerBuilder::new(orchestrator)
        .host(config.server.host.clone())
        .port(port)
        .static_dir(static_dir)
        .build()
        .run()
        .await?;

    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let levels = tokio::task::spawn_blocking(move || -> voxchat::Result<Vec<(f32, f32)>> {
        let mut capture = AudioCapture::new()?;
        capture.start()?;

        let mut levels = Vec::new();
        for _ in 0..duration {
            std::thread::sleep(Duration::from_secs(1));
            let samples = capture.take_buffer();
            let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);
            levels.push((calculate_rms(&samples), peak));
        }

        capture.stop();
        Ok(levels)
    })
    .await??;

    println!("Sample rate: {} Hz", voxchat::voice::SAMPLE_RATE);
    println!("---");
    for (i, (energy, peak)) in levels.into_iter().enumerate() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
    }

    println!("\n---");
    println!("If RMS moved, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());

    let pcm = Pcm {
        samples,
        sample_rate,
    };
    tokio::task::spawn_blocking(move || AudioPlayback::new()?.play_pcm(&pcm)).await??;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Synthesize and play a sentence
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let synthesis = SpeechSynthesisAdapter::new(Arc::new(TextToSpeech::from_config(&config.tts)?));

    println!("Synthesizing speech with voice {}...", synthesis.voice());
    let artifact = synthesis.synthesize(text).await?;
    println!(
        "Got {} audio at {}",
        artifact.format(),
        artifact.path().display()
    );

    println!("Playing audio...");
    let played = tokio::task::spawn_blocking(move || {
        artifact.play_with(|bytes, format| AudioPlayback::new()?.play(bytes, format))
    })
    .await?;

    if let Some(cleanup) = played.cleanup {
        println!("warning: {cleanup}");
    }
    played.outcome?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

/// Transcribe a file through the configured recognizer
async fn test_stt(config: &Config, file: &std::path::Path) -> anyhow::Result<()> {
    let clip = tokio::fs::read(file).await?;
    println!("Transcribing {} ({} bytes)...\n", file.display(), clip.len());

    let transcription = TranscriptionAdapter::new(Arc::new(SpeechToText::from_config(&config.stt)?))
        .with_silence_threshold(config.stt.silence_threshold);

    let result = transcription.transcribe(&clip).await;
    if let Some(cleanup) = result.cleanup {
        println!("warning: {cleanup}");
    }

    match result.text {
        Ok(text) => println!("Transcript: {text}"),
        Err(e) => println!("Not recognized ({}): {e}", e.code()),
    }

    Ok(())
}
