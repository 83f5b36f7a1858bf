//! TOML configuration file loading
//!
//! Supports `~/.config/voxchat/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Chat completion backend
    #[serde(default)]
    pub chat: ChatFileConfig,

    /// Speech recognition provider
    #[serde(default)]
    pub stt: SttFileConfig,

    /// Speech synthesis provider
    #[serde(default)]
    pub tts: TtsFileConfig,

    /// Conversation behaviour
    #[serde(default)]
    pub conversation: ConversationFileConfig,

    /// HTTP server
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Voice input/output toggle
    #[serde(default)]
    pub voice: VoiceFileConfig,
}

/// Chat backend configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChatFileConfig {
    /// "ollama" or "openai"
    pub provider: Option<String>,

    /// Backend base URL (e.g. `http://localhost:11434`)
    pub base_url: Option<String>,

    /// Model identifier (e.g. "llama3.1:8b")
    pub model: Option<String>,

    pub api_key: Option<String>,
}

/// Speech-to-text configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SttFileConfig {
    /// "whisper" or "deepgram"
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,

    /// Language hint (ISO 639-1, e.g. "en")
    pub language: Option<String>,
    pub api_key: Option<String>,

    /// RMS level below which a WAV clip counts as silence
    pub silence_threshold: Option<f32>,
}

/// Text-to-speech configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TtsFileConfig {
    /// "openai" or "elevenlabs"
    pub provider: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,

    /// Voice identifier (e.g. "alloy", or an `ElevenLabs` voice ID)
    pub voice: Option<String>,

    /// Speed multiplier (0.25 to 4.0)
    pub speed: Option<f32>,
    pub api_key: Option<String>,
}

/// Conversation configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationFileConfig {
    /// First assistant message of every session
    pub greeting: Option<String>,

    /// Utterance used when speech could not be recognized
    pub fallback: Option<String>,

    /// Include the utterance being answered in the serialized history
    pub include_current_turn: Option<bool>,
}

/// Server configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,

    /// Directory with web UI assets
    pub static_dir: Option<String>,
}

/// Voice toggle
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceFileConfig {
    pub enabled: Option<bool>,
}

/// Parse a config file from TOML text
///
/// # Errors
///
/// Returns error if the text is not valid TOML for this schema
pub fn parse_config_file(content: &str) -> Result<ConfigFile> {
    Ok(toml::from_str(content)?)
}

/// Load a config file from an explicit path
///
/// # Errors
///
/// Returns error if the file cannot be read or parsed
pub fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)?;
    let config = parse_config_file(&content)?;
    tracing::info!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    let Some(path) = config_file_path() else {
        return ConfigFile::default();
    };

    if !path.exists() {
        return ConfigFile::default();
    }

    match read_config_file(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/voxchat/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("voxchat").join("config.toml"))
}
