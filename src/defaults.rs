//! Default constants shared across the engine.
//!
//! Centralized here so the orchestrator, worker, and cloud client agree on
//! the audio format and timing parameters without duplicating numbers.

use std::time::Duration;

/// Audio sample rate in Hz.
///
/// 16kHz mono is the standard input format for speech recognition models;
/// every sample buffer in this crate is assumed to be at this rate.
pub const SAMPLE_RATE: u32 = 16000;

/// Minimum number of pending samples before a transcription pass starts.
///
/// 3 seconds at 16kHz. Shorter windows waste inference startup cost on
/// fragments too small to produce stable text.
pub const MIN_PASS_SAMPLES: usize = 3 * SAMPLE_RATE as usize;

/// Inference window length in seconds, passed through to the engine.
pub const WINDOW_LENGTH_SECS: u32 = 30;

/// Inference window stride in seconds, passed through to the engine.
pub const WINDOW_STRIDE_SECS: u32 = 5;

/// How often the orchestrator's idle watcher wakes up.
pub const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Inactivity threshold after which a loaded model is unloaded.
pub const IDLE_UNLOAD_AFTER: Duration = Duration::from_secs(5 * 60);

/// Model identifier for the tiny tier.
pub const MODEL_TINY: &str = "whisper-tiny.en";

/// Model identifier for the small tier.
pub const MODEL_SMALL: &str = "whisper-small.en";

/// Model identifier for the large tier.
pub const MODEL_LARGE: &str = "whisper-large-v3";

/// Cloud transcription endpoint URL.
pub const CLOUD_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Model selection field sent with cloud uploads.
pub const CLOUD_MODEL: &str = "whisper-1";
