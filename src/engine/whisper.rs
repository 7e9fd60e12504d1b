//! Whisper-backed [`SpeechEngine`] implementation.
//!
//! Requires the `whisper` feature and cmake. The accelerated device maps to
//! a GPU-enabled whisper context, the fallback device to a CPU-only one.

#[cfg(feature = "whisper")]
use crate::engine::{Device, EngineLoader, ProgressFn, SpeechEngine, Windowing};
#[cfg(feature = "whisper")]
use crate::error::{Result, VoxnoteError};
#[cfg(feature = "whisper")]
use crate::models;
#[cfg(feature = "whisper")]
use std::sync::{Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Loader that builds whisper contexts from the on-disk model cache.
#[cfg(feature = "whisper")]
#[derive(Debug, Default)]
pub struct WhisperLoader;

#[cfg(feature = "whisper")]
impl EngineLoader for WhisperLoader {
    fn load(
        &self,
        model_id: &str,
        device: Device,
        progress: &ProgressFn,
    ) -> Result<Box<dyn SpeechEngine>> {
        // Suppress whisper.cpp output on stderr (only once per process)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        let path = models::model_path(model_id).ok_or_else(|| VoxnoteError::ModelNotCached {
            model: model_id.to_string(),
        })?;
        if !path.exists() {
            return Err(VoxnoteError::ModelNotCached {
                model: model_id.to_string(),
            });
        }

        progress(serde_json::json!({ "status": "loading", "model": model_id }));

        let mut context_params = WhisperContextParameters::default();
        context_params.use_gpu(matches!(device, Device::Accelerated));
        let path_str = path.to_str().ok_or_else(|| VoxnoteError::ModelLoad {
            model: model_id.to_string(),
            message: "invalid UTF-8 in model path".to_string(),
        })?;
        let context = WhisperContext::new_with_params(path_str, context_params).map_err(|e| {
            VoxnoteError::ModelLoad {
                model: model_id.to_string(),
                message: e.to_string(),
            }
        })?;

        progress(serde_json::json!({ "status": "done", "model": model_id }));

        Ok(Box::new(WhisperEngine {
            context: Mutex::new(context),
            model_id: model_id.to_string(),
        }))
    }
}

/// A loaded whisper context. The context mutex makes `transcribe(&self)`
/// safe; the worker's single-flight guard means it is never contended.
#[cfg(feature = "whisper")]
pub struct WhisperEngine {
    context: Mutex<WhisperContext>,
    model_id: String,
}

#[cfg(feature = "whisper")]
impl SpeechEngine for WhisperEngine {
    fn transcribe(&self, samples: &[f32], windowing: Windowing) -> Result<String> {
        let context = self.context.lock().map_err(|e| VoxnoteError::Inference {
            message: format!("failed to acquire context lock: {e}"),
        })?;

        let mut state = context.create_state().map_err(|e| VoxnoteError::Inference {
            message: format!("failed to create whisper state: {e}"),
        })?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_audio_ctx(audio_ctx_for(windowing));
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state.full(params, samples).map_err(|e| VoxnoteError::Inference {
            message: format!("whisper inference failed: {e}"),
        })?;

        let mut text = String::new();
        for segment in state.as_iter() {
            text.push_str(&segment.to_string());
        }

        Ok(text.trim().to_string())
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Map the window length onto whisper's audio context size.
///
/// whisper.cpp encodes 30s of audio into 1500 encoder frames; shorter
/// windows can shrink the context proportionally to save compute.
#[cfg(feature = "whisper")]
fn audio_ctx_for(windowing: Windowing) -> i32 {
    let secs = windowing.window_length_secs.min(30);
    (secs as i32 * 1500) / 30
}

#[cfg(all(test, feature = "whisper"))]
mod tests {
    use super::*;

    #[test]
    fn audio_ctx_full_window() {
        assert_eq!(audio_ctx_for(Windowing::default()), 1500);
    }

    #[test]
    fn audio_ctx_clamps_oversized_window() {
        let w = Windowing {
            window_length_secs: 60,
            stride_secs: 5,
        };
        assert_eq!(audio_ctx_for(w), 1500);
    }

    #[test]
    fn loader_rejects_uncached_model() {
        let loader = WhisperLoader;
        let result = loader.load("no-such-model", Device::Fallback, &|_| {});
        assert!(matches!(result, Err(VoxnoteError::ModelNotCached { .. })));
    }
}
