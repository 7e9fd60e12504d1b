//! Inference engine abstraction.
//!
//! The concrete acoustic model is an injected dependency behind two narrow
//! traits: [`EngineLoader`] resolves a model identifier to a runnable
//! [`SpeechEngine`] on a requested device, and the engine turns a sample
//! buffer into text. The worker never sees anything wider than this.

pub mod whisper;

use crate::defaults::{WINDOW_LENGTH_SECS, WINDOW_STRIDE_SECS};
use crate::error::{Result, VoxnoteError};
use serde::{Deserialize, Serialize};

/// Execution device requested for engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    /// GPU-accelerated execution.
    Accelerated,
    /// General-purpose CPU execution.
    Fallback,
}

/// Windowing parameters forwarded to the engine on every pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Windowing {
    pub window_length_secs: u32,
    pub stride_secs: u32,
}

impl Default for Windowing {
    fn default() -> Self {
        Self {
            window_length_secs: WINDOW_LENGTH_SECS,
            stride_secs: WINDOW_STRIDE_SECS,
        }
    }
}

/// Progress callback threaded through a load for UI feedback.
///
/// The payload is opaque to this crate; it is republished verbatim. It has
/// no effect on control flow.
pub type ProgressFn = dyn Fn(serde_json::Value) + Send + Sync;

/// A loaded transcription engine.
///
/// Implementations must be safe to call from the blocking thread pool.
/// Construction may fail; transcription may fail. Neither is fatal to the
/// session.
pub trait SpeechEngine: Send + Sync {
    /// Run inference over a 16kHz mono f32 sample buffer.
    fn transcribe(&self, samples: &[f32], windowing: Windowing) -> Result<String>;

    /// Identifier of the model this engine was built from.
    fn model_id(&self) -> &str;
}

/// Resolves a model identifier to a runnable engine on a given device.
pub trait EngineLoader: Send + Sync {
    fn load(
        &self,
        model_id: &str,
        device: Device,
        progress: &ProgressFn,
    ) -> Result<Box<dyn SpeechEngine>>;
}

/// Mock engine for testing.
#[derive(Debug, Clone)]
pub struct MockEngine {
    model_id: String,
    response: String,
    should_fail: bool,
    pass_delay: std::time::Duration,
    pass_lengths: std::sync::Arc<std::sync::Mutex<Vec<usize>>>,
}

impl MockEngine {
    pub fn new(model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            response: "mock transcription".to_string(),
            should_fail: false,
            pass_delay: std::time::Duration::ZERO,
            pass_lengths: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Configure the text returned from every pass.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure every pass to fail.
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Make every pass block for the given duration, so audio can pile up
    /// behind an in-flight pass.
    pub fn with_pass_delay(mut self, delay: std::time::Duration) -> Self {
        self.pass_delay = delay;
        self
    }

    /// Sample counts of every pass run so far, in order.
    pub fn pass_lengths(&self) -> Vec<usize> {
        self.pass_lengths.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl SpeechEngine for MockEngine {
    fn transcribe(&self, samples: &[f32], _windowing: Windowing) -> Result<String> {
        if !self.pass_delay.is_zero() {
            std::thread::sleep(self.pass_delay);
        }
        self.pass_lengths
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(samples.len());
        if self.should_fail {
            Err(VoxnoteError::Inference {
                message: "mock inference failure".to_string(),
            })
        } else {
            Ok(self.response.clone())
        }
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Mock loader for testing device fallback and debounce behavior.
pub struct MockLoader {
    fail_accelerated: bool,
    fail_fallback: bool,
    load_delay: std::time::Duration,
    pass_delay: std::time::Duration,
    response: String,
    engine_fails: bool,
    attempts: std::sync::Arc<std::sync::Mutex<Vec<(String, Device)>>>,
    engines: std::sync::Arc<std::sync::Mutex<Vec<MockEngine>>>,
}

impl MockLoader {
    pub fn new() -> Self {
        Self {
            fail_accelerated: false,
            fail_fallback: false,
            load_delay: std::time::Duration::ZERO,
            pass_delay: std::time::Duration::ZERO,
            response: "mock transcription".to_string(),
            engine_fails: false,
            attempts: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            engines: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    /// Make accelerated-device construction fail.
    pub fn with_accelerated_failure(mut self) -> Self {
        self.fail_accelerated = true;
        self
    }

    /// Make fallback-device construction fail too.
    pub fn with_fallback_failure(mut self) -> Self {
        self.fail_fallback = true;
        self
    }

    /// Make every construction block for the given duration.
    pub fn with_load_delay(mut self, delay: std::time::Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// Make every constructed engine block this long per pass.
    pub fn with_pass_delay(mut self, delay: std::time::Duration) -> Self {
        self.pass_delay = delay;
        self
    }

    /// Text every constructed engine returns.
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Make constructed engines fail on transcribe.
    pub fn with_engine_failure(mut self) -> Self {
        self.engine_fails = true;
        self
    }

    /// Every `(model_id, device)` construction attempt so far, in order.
    pub fn attempts(&self) -> Vec<(String, Device)> {
        self.attempts.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Handles to every engine handed out, for pass inspection.
    pub fn engines(&self) -> Vec<MockEngine> {
        self.engines.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

impl Default for MockLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineLoader for MockLoader {
    fn load(
        &self,
        model_id: &str,
        device: Device,
        progress: &ProgressFn,
    ) -> Result<Box<dyn SpeechEngine>> {
        self.attempts
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push((model_id.to_string(), device));

        if !self.load_delay.is_zero() {
            std::thread::sleep(self.load_delay);
        }

        let failed = match device {
            Device::Accelerated => self.fail_accelerated,
            Device::Fallback => self.fail_fallback,
        };
        if failed {
            return Err(VoxnoteError::ModelLoad {
                model: model_id.to_string(),
                message: format!("mock {device:?} construction failure"),
            });
        }

        progress(serde_json::json!({ "status": "done", "model": model_id }));

        let mut engine = MockEngine::new(model_id)
            .with_response(&self.response)
            .with_pass_delay(self.pass_delay);
        if self.engine_fails {
            engine = engine.with_failure();
        }
        self.engines
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(engine.clone());
        Ok(Box::new(engine))
    }
}
