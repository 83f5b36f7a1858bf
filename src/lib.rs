//! voxchat - voice-enabled chat front-end for local language models
//!
//! Text or speech goes in, a reply from the chat backend (Ollama by
//! default) comes out as text and synthesized audio.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Shells                          │
//! │        HTTP API + web UI    │    terminal chat       │
//! └────────────────────┬────────────────────────────────┘
//!                      │ submit_text / submit_audio
//! ┌────────────────────▼────────────────────────────────┐
//! │                  Orchestrator                        │
//! │   Conversation history  │  context  │  rollback     │
//! └────────┬──────────────────┬──────────────────┬──────┘
//!          │                  │                  │
//! ┌────────▼───────┐ ┌────────▼───────┐ ┌────────▼───────┐
//! │  Transcription │ │      Chat      │ │   Synthesis    │
//! │ Whisper/Deepgr.│ │ Ollama/OpenAI  │ │OpenAI/ElevenLab│
//! └────────────────┘ └────────────────┘ └────────────────┘
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod session;
pub mod shell;
pub mod voice;

pub use chat::{ChatClient, ChatCompleter};
pub use config::Config;
pub use conversation::{Conversation, Message, Orchestrator, Role, TurnOutcome};
pub use error::{Error, Result};
pub use session::SessionStore;
pub use shell::ChatShell;
