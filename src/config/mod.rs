//! Configuration management for voxchat
//!
//! Values resolve with priority env > TOML file > built-in defaults.

pub mod file;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;

use crate::conversation::{DEFAULT_FALLBACK, DEFAULT_GREETING};
use crate::{Error, Result};

use self::file::ConfigFile;

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default chat model
pub const DEFAULT_MODEL: &str = "llama3.1:8b";

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8501;

/// voxchat configuration
#[derive(Debug)]
pub struct Config {
    /// Chat completion backend
    pub chat: ChatConfig,

    /// Speech recognition
    pub stt: SttConfig,

    /// Speech synthesis
    pub tts: TtsConfig,

    /// Conversation behaviour
    pub conversation: ConversationConfig,

    /// HTTP server
    pub server: ServerConfig,

    /// Voice input/output
    pub voice: VoiceConfig,
}

/// Chat backend flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatProvider {
    /// Ollama native `/api/chat`
    Ollama,
    /// Any OpenAI-compatible `/chat/completions` endpoint
    OpenAi,
}

impl ChatProvider {
    const fn default_base_url(self) -> &'static str {
        match self {
            Self::Ollama => DEFAULT_OLLAMA_URL,
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }
}

impl FromStr for ChatProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(Error::Config(format!("unknown chat provider: {other}"))),
        }
    }
}

/// Speech recognition flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttProvider {
    /// OpenAI Whisper API or a compatible local server
    Whisper,
    Deepgram,
}

impl SttProvider {
    const fn default_base_url(self) -> &'static str {
        match self {
            Self::Whisper => "https://api.openai.com/v1",
            Self::Deepgram => "https://api.deepgram.com/v1",
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::Whisper => "whisper-1",
            Self::Deepgram => "nova-2",
        }
    }

    const fn key_env(self) -> &'static str {
        match self {
            Self::Whisper => "OPENAI_API_KEY",
            Self::Deepgram => "DEEPGRAM_API_KEY",
        }
    }
}

impl FromStr for SttProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "whisper" | "openai" => Ok(Self::Whisper),
            "deepgram" => Ok(Self::Deepgram),
            other => Err(Error::Config(format!("unknown STT provider: {other}"))),
        }
    }
}

/// Speech synthesis flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProvider {
    /// OpenAI speech API or a compatible local server
    OpenAi,
    ElevenLabs,
}

impl TtsProvider {
    const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::ElevenLabs => "https://api.elevenlabs.io/v1",
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "tts-1",
            Self::ElevenLabs => "eleven_monolingual_v1",
        }
    }

    const fn default_voice(self) -> &'static str {
        match self {
            Self::OpenAi => "alloy",
            // "Rachel"
            Self::ElevenLabs => "21m00Tcm4TlvDq8ikWAM",
        }
    }

    const fn key_env(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::ElevenLabs => "ELEVENLABS_API_KEY",
        }
    }
}

impl FromStr for TtsProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "elevenlabs" => Ok(Self::ElevenLabs),
            other => Err(Error::Config(format!("unknown TTS provider: {other}"))),
        }
    }
}

/// Chat backend configuration
#[derive(Debug)]
pub struct ChatConfig {
    pub provider: ChatProvider,

    /// Base URL without trailing slash
    pub base_url: String,

    /// Model identifier sent with every request
    pub model: String,

    /// Bearer token (OpenAI-compatible backends only)
    pub api_key: Option<SecretString>,
}

/// Speech recognition configuration
#[derive(Debug)]
pub struct SttConfig {
    pub provider: SttProvider,
    pub base_url: String,
    pub model: String,

    /// Language hint (ISO 639-1)
    pub language: Option<String>,
    pub api_key: Option<SecretString>,

    /// RMS level below which a WAV clip is treated as silence (0 disables)
    pub silence_threshold: f32,
}

/// Speech synthesis configuration
#[derive(Debug)]
pub struct TtsConfig {
    pub provider: TtsProvider,
    pub base_url: String,
    pub model: String,
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: f32,
    pub api_key: Option<SecretString>,
}

/// Conversation behaviour
#[derive(Debug, Clone)]
pub struct ConversationConfig {
    /// Assistant greeting that opens every session
    pub greeting: String,

    /// Utterance substituted when speech is not recognized
    pub fallback: String,

    /// Serialize the utterance being answered into the context as well
    pub include_current_turn: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            fallback: DEFAULT_FALLBACK.to_string(),
            include_current_turn: true,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Path to static files directory (web UI)
    pub static_dir: Option<PathBuf>,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// Enable speech recognition and synthesis
    pub enabled: bool,
}

impl Config {
    /// Load configuration from the process environment and a config file
    ///
    /// With `path` set, that file must exist and parse. Without it the
    /// standard location is tried and silently skipped when absent.
    ///
    /// # Errors
    ///
    /// Returns error if an explicit config file is unreadable or any value is invalid
    pub fn load(path: Option<&Path>, disable_voice: bool) -> Result<Self> {
        let fc = match path {
            Some(path) => file::read_config_file(path)?,
            None => file::load_config_file(),
        };

        let mut config = Self::from_sources(fc, |key| std::env::var(key).ok())?;
        if disable_voice {
            config.voice.enabled = false;
        }
        Ok(config)
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns error if a provider name or numeric value is invalid
    #[allow(clippy::too_many_lines)]
    pub fn from_sources<F>(fc: ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = |value: Option<String>| value.filter(|k| !k.is_empty()).map(SecretString::from);

        // Chat (env > toml > default)
        let chat_provider = env("VOXCHAT_CHAT_PROVIDER")
            .or(fc.chat.provider)
            .map(|s| s.parse::<ChatProvider>())
            .transpose()?
            .unwrap_or(ChatProvider::Ollama);
        let chat_key = env("VOXCHAT_CHAT_API_KEY").or(fc.chat.api_key).or_else(|| {
            (chat_provider == ChatProvider::OpenAi)
                .then(|| env("OPENAI_API_KEY"))
                .flatten()
        });
        let chat = ChatConfig {
            provider: chat_provider,
            base_url: trim_url(
                env("VOXCHAT_CHAT_URL")
                    .or(fc.chat.base_url)
                    .unwrap_or_else(|| chat_provider.default_base_url().to_string()),
            ),
            model: env("VOXCHAT_CHAT_MODEL")
                .or(fc.chat.model)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_key: secret(chat_key),
        };

        // Speech recognition
        let stt_provider = env("VOXCHAT_STT_PROVIDER")
            .or(fc.stt.provider)
            .map(|s| s.parse::<SttProvider>())
            .transpose()?
            .unwrap_or(SttProvider::Whisper);
        let silence_threshold = match env("VOXCHAT_STT_SILENCE_THRESHOLD") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("invalid silence threshold: {raw}")))?,
            None => fc.stt.silence_threshold.unwrap_or(0.001),
        };
        let stt = SttConfig {
            provider: stt_provider,
            base_url: trim_url(
                env("VOXCHAT_STT_URL")
                    .or(fc.stt.base_url)
                    .unwrap_or_else(|| stt_provider.default_base_url().to_string()),
            ),
            model: env("VOXCHAT_STT_MODEL")
                .or(fc.stt.model)
                .unwrap_or_else(|| stt_provider.default_model().to_string()),
            language: env("VOXCHAT_STT_LANGUAGE").or(fc.stt.language),
            api_key: secret(
                env("VOXCHAT_STT_API_KEY")
                    .or(fc.stt.api_key)
                    .or_else(|| env(stt_provider.key_env())),
            ),
            silence_threshold,
        };

        // Speech synthesis
        let tts_provider = env("VOXCHAT_TTS_PROVIDER")
            .or(fc.tts.provider)
            .map(|s| s.parse::<TtsProvider>())
            .transpose()?
            .unwrap_or(TtsProvider::OpenAi);
        let speed = match env("VOXCHAT_TTS_SPEED") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("invalid TTS speed: {raw}")))?,
            None => fc.tts.speed.unwrap_or(1.0),
        };
        if !(0.25..=4.0).contains(&speed) {
            return Err(Error::Config(format!(
                "TTS speed must be between 0.25 and 4.0, got {speed}"
            )));
        }
        let tts = TtsConfig {
            provider: tts_provider,
            base_url: trim_url(
                env("VOXCHAT_TTS_URL")
                    .or(fc.tts.base_url)
                    .unwrap_or_else(|| tts_provider.default_base_url().to_string()),
            ),
            model: env("VOXCHAT_TTS_MODEL")
                .or(fc.tts.model)
                .unwrap_or_else(|| tts_provider.default_model().to_string()),
            voice: env("VOXCHAT_TTS_VOICE")
                .or(fc.tts.voice)
                .unwrap_or_else(|| tts_provider.default_voice().to_string()),
            speed,
            api_key: secret(
                env("VOXCHAT_TTS_API_KEY")
                    .or(fc.tts.api_key)
                    .or_else(|| env(tts_provider.key_env())),
            ),
        };

        let defaults = ConversationConfig::default();
        let conversation = ConversationConfig {
            greeting: env("VOXCHAT_GREETING")
                .or(fc.conversation.greeting)
                .unwrap_or(defaults.greeting),
            fallback: env("VOXCHAT_FALLBACK")
                .or(fc.conversation.fallback)
                .unwrap_or(defaults.fallback),
            include_current_turn: env("VOXCHAT_INCLUDE_CURRENT_TURN")
                .map(|v| parse_bool(&v))
                .or(fc.conversation.include_current_turn)
                .unwrap_or(defaults.include_current_turn),
        };

        let port = match env("VOXCHAT_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("invalid port: {raw}")))?,
            None => fc.server.port.unwrap_or(DEFAULT_PORT),
        };
        let server = ServerConfig {
            host: env("VOXCHAT_HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            static_dir: env("VOXCHAT_STATIC_DIR")
                .or(fc.server.static_dir)
                .map(PathBuf::from),
        };

        let voice = VoiceConfig {
            enabled: env("VOXCHAT_VOICE_ENABLED")
                .map(|v| parse_bool(&v))
                .or(fc.voice.enabled)
                .unwrap_or(true),
        };

        Ok(Self {
            chat,
            stt,
            tts,
            conversation,
            server,
            voice,
        })
    }
}

fn trim_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
