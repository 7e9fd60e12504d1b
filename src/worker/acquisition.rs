//! Model acquisition state machine.
//!
//! Tracks which model the worker has loaded and enforces two invariants:
//! at most one load attempt in flight (duplicates are dropped, not queued),
//! and at most one engine alive — the previous handle is released before a
//! new load begins. Device fallback lives here too: accelerated first, one
//! retry on the general-purpose device.

use crate::engine::{Device, EngineLoader, ProgressFn, SpeechEngine};
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of a load request against the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadDecision {
    /// Requested model is already loaded; report ready from cache.
    AlreadyLoaded,
    /// A load is in flight; this request is dropped silently.
    Debounced,
    /// Caller should start a load for the requested model.
    StartLoad,
}

/// Per-worker model state.
#[derive(Default)]
pub struct ModelAcquisition {
    model_id: Option<String>,
    engine: Option<Arc<dyn SpeechEngine>>,
    loading: bool,
}

impl ModelAcquisition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what to do with a load request, mutating state accordingly.
    ///
    /// On `StartLoad` the previous engine has already been released and
    /// `loading` is set; the caller must eventually call [`complete`].
    ///
    /// [`complete`]: ModelAcquisition::complete
    pub fn request(&mut self, model_id: &str) -> LoadDecision {
        if self.loading {
            debug!(model = model_id, "load already in flight, request dropped");
            return LoadDecision::Debounced;
        }
        if self.engine.is_some() && self.model_id.as_deref() == Some(model_id) {
            return LoadDecision::AlreadyLoaded;
        }

        // Never run two engines concurrently: release the old handle before
        // the new load attempt starts, regardless of its outcome.
        self.engine = None;
        self.model_id = Some(model_id.to_string());
        self.loading = true;
        LoadDecision::StartLoad
    }

    /// Record the outcome of the load started by [`request`].
    ///
    /// On failure the model id is cleared so a retry of the same model is
    /// not short-circuited as a no-op.
    ///
    /// [`request`]: ModelAcquisition::request
    pub fn complete(
        &mut self,
        outcome: Result<(Device, Arc<dyn SpeechEngine>)>,
    ) -> Result<Device> {
        self.loading = false;
        match outcome {
            Ok((device, engine)) => {
                self.engine = Some(engine);
                Ok(device)
            }
            Err(e) => {
                self.model_id = None;
                Err(e)
            }
        }
    }

    /// Handle to the loaded engine, if any.
    pub fn engine(&self) -> Option<Arc<dyn SpeechEngine>> {
        self.engine.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn loaded_model(&self) -> Option<&str> {
        if self.engine.is_some() {
            self.model_id.as_deref()
        } else {
            None
        }
    }
}

/// Construct an engine, trying the accelerated device first.
///
/// Any accelerated-device failure triggers exactly one fallback-device
/// attempt; the error surfaced on total failure is the fallback's.
pub fn load_with_fallback(
    loader: &dyn EngineLoader,
    model_id: &str,
    progress: &ProgressFn,
) -> Result<(Device, Box<dyn SpeechEngine>)> {
    match loader.load(model_id, Device::Accelerated, progress) {
        Ok(engine) => Ok((Device::Accelerated, engine)),
        Err(e) => {
            warn!(
                model = model_id,
                error = %e,
                "accelerated load failed, retrying on fallback device"
            );
            let engine = loader.load(model_id, Device::Fallback, progress)?;
            Ok((Device::Fallback, engine))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{MockEngine, MockLoader};
    use crate::error::VoxnoteError;

    fn engine(id: &str) -> Arc<dyn SpeechEngine> {
        Arc::new(MockEngine::new(id))
    }

    #[test]
    fn first_request_starts_load() {
        let mut acq = ModelAcquisition::new();
        assert_eq!(acq.request("m1"), LoadDecision::StartLoad);
        assert!(acq.is_loading());
        assert!(acq.engine().is_none());
    }

    #[test]
    fn request_while_loading_is_debounced() {
        let mut acq = ModelAcquisition::new();
        assert_eq!(acq.request("m1"), LoadDecision::StartLoad);
        assert_eq!(acq.request("m1"), LoadDecision::Debounced);
        assert_eq!(acq.request("m2"), LoadDecision::Debounced);
    }

    #[test]
    fn same_model_after_success_is_cached() {
        let mut acq = ModelAcquisition::new();
        acq.request("m1");
        acq.complete(Ok((Device::Accelerated, engine("m1")))).unwrap();

        assert_eq!(acq.request("m1"), LoadDecision::AlreadyLoaded);
        assert_eq!(acq.loaded_model(), Some("m1"));
    }

    #[test]
    fn switching_models_drops_previous_engine_first() {
        let mut acq = ModelAcquisition::new();
        acq.request("m1");
        let old = engine("m1");
        acq.complete(Ok((Device::Accelerated, old.clone()))).unwrap();
        assert_eq!(Arc::strong_count(&old), 2);

        // The worker's handle is gone as soon as the new load is requested,
        // before any outcome is known.
        assert_eq!(acq.request("m2"), LoadDecision::StartLoad);
        assert_eq!(Arc::strong_count(&old), 1);
        assert!(acq.engine().is_none());
    }

    #[test]
    fn failed_load_resets_model_id_for_retry() {
        let mut acq = ModelAcquisition::new();
        acq.request("m1");
        let err = acq.complete(Err(VoxnoteError::ModelLoad {
            model: "m1".to_string(),
            message: "boom".to_string(),
        }));
        assert!(err.is_err());

        // Retry of the same model is a real load, not a cached no-op
        assert_eq!(acq.request("m1"), LoadDecision::StartLoad);
    }

    #[test]
    fn fallback_runs_after_accelerated_failure() {
        let loader = MockLoader::new().with_accelerated_failure();
        let (device, _engine) = load_with_fallback(&loader, "m1", &|_| {}).unwrap();
        assert_eq!(device, Device::Fallback);
        assert_eq!(
            loader.attempts(),
            vec![
                ("m1".to_string(), Device::Accelerated),
                ("m1".to_string(), Device::Fallback),
            ]
        );
    }

    #[test]
    fn accelerated_success_skips_fallback() {
        let loader = MockLoader::new();
        let (device, _engine) = load_with_fallback(&loader, "m1", &|_| {}).unwrap();
        assert_eq!(device, Device::Accelerated);
        assert_eq!(loader.attempts().len(), 1);
    }

    #[test]
    fn both_devices_failing_surfaces_fallback_error() {
        let loader = MockLoader::new()
            .with_accelerated_failure()
            .with_fallback_failure();
        let result = load_with_fallback(&loader, "m1", &|_| {});
        assert!(matches!(result, Err(VoxnoteError::ModelLoad { .. })));
        assert_eq!(loader.attempts().len(), 2);
    }
}
