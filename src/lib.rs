//! voxnote - Streaming speech-to-text for desktop note capture
//!
//! Local-first dictation with an optional cloud provider. The UI layer
//! embeds [`SttOrchestrator`] and drives it with start/feed/stop; text and
//! status come back on an event channel.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod cloud;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod worker;

// Core traits (capture → engine → text)
pub use engine::{Device, EngineLoader, SpeechEngine, Windowing};

// Orchestrator surface
pub use orchestrator::{SttDevice, SttEvent, SttOrchestrator};

// Error handling
pub use error::{Result, VoxnoteError};

// Config
pub use config::{Provider, SettingsStore, SttSettings};

// Cloud provider (for hosts that wire their own endpoint)
pub use cloud::{CloudTranscriptionClient, HttpEndpoint, TranscriptionEndpoint};
