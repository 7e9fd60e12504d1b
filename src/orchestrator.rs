//! Session orchestrator running in the host process.
//!
//! Owns the worker lifecycle (spawn, event routing, crash recovery, idle
//! unload), routes each call to the local worker or the cloud client based
//! on the provider setting read at call time, and republishes everything
//! the UI needs on a crossbeam channel.
//!
//! Must be constructed inside a tokio runtime; the idle watcher and the
//! worker event pump are spawned tasks.

use crate::cloud::{CloudTranscriptionClient, TranscriptionEndpoint};
use crate::config::{Provider, SettingsStore};
use crate::defaults::{IDLE_CHECK_INTERVAL, IDLE_UNLOAD_AFTER};
use crate::engine::EngineLoader;
use crate::error::{Result, VoxnoteError};
use crate::models;
use crate::worker::{self, DeviceKind, WorkerEvent, WorkerHandle, WorkerRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Execution path reported to the UI with a ready event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SttDevice {
    Accelerated,
    Fallback,
    Cached,
    Cloud,
}

impl From<DeviceKind> for SttDevice {
    fn from(device: DeviceKind) -> Self {
        match device {
            DeviceKind::Accelerated => SttDevice::Accelerated,
            DeviceKind::Fallback => SttDevice::Fallback,
            DeviceKind::Cached => SttDevice::Cached,
        }
    }
}

/// Events republished to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SttEvent {
    /// Transcription is ready to accept audio.
    Ready { device: SttDevice },
    /// Opaque model-load progress payload.
    Progress(serde_json::Value),
    /// A window of recognized text.
    Result { text: String },
    /// A user-visible failure; the session can be restarted.
    Error { message: String },
    /// The model was unloaded after sitting idle.
    ModelUnloaded,
}

struct LocalState {
    worker: Option<WorkerHandle>,
    /// Set when the worker reports ready; chunks are forwarded only then.
    engine_ready: bool,
    /// Bumped on every worker spawn. Each event pump remembers the value it
    /// was spawned under so a stale pump, observing its dead worker's
    /// channel close after a respawn, cannot tear down the replacement.
    generation: u64,
}

struct Inner {
    settings: Arc<dyn SettingsStore>,
    loader: Arc<dyn EngineLoader>,
    events: crossbeam_channel::Sender<SttEvent>,
    state: Mutex<LocalState>,
    cloud: Mutex<CloudTranscriptionClient>,
    /// Epoch milliseconds of the last inbound call or worker message.
    last_activity: AtomicU64,
}

/// Streaming speech-to-text orchestrator.
pub struct SttOrchestrator {
    inner: Arc<Inner>,
    idle_watcher: JoinHandle<()>,
}

impl SttOrchestrator {
    /// Create an orchestrator with the default idle policy (check every
    /// 60s, unload after 5 minutes of inactivity).
    pub fn new(
        settings: Arc<dyn SettingsStore>,
        loader: Arc<dyn EngineLoader>,
        endpoint: Arc<dyn TranscriptionEndpoint>,
        events: crossbeam_channel::Sender<SttEvent>,
    ) -> Self {
        Self::with_idle_policy(
            settings,
            loader,
            endpoint,
            events,
            IDLE_CHECK_INTERVAL,
            IDLE_UNLOAD_AFTER,
        )
    }

    /// Create an orchestrator with an explicit idle policy.
    pub fn with_idle_policy(
        settings: Arc<dyn SettingsStore>,
        loader: Arc<dyn EngineLoader>,
        endpoint: Arc<dyn TranscriptionEndpoint>,
        events: crossbeam_channel::Sender<SttEvent>,
        check_interval: Duration,
        unload_after: Duration,
    ) -> Self {
        let inner = Arc::new(Inner {
            settings,
            loader,
            events,
            state: Mutex::new(LocalState {
                worker: None,
                engine_ready: false,
                generation: 0,
            }),
            cloud: Mutex::new(CloudTranscriptionClient::new(endpoint)),
            last_activity: AtomicU64::new(now_millis()),
        });
        let idle_watcher = tokio::spawn(idle_watch(inner.clone(), check_interval, unload_after));
        Self {
            inner,
            idle_watcher,
        }
    }

    /// Begin (or resume) a session with the currently configured provider.
    ///
    /// Local: spawns the worker if needed and requests a load of the model
    /// backing the configured tier; readiness arrives as an event. Cloud:
    /// validates the credential and reports ready immediately, or reports
    /// a configuration error without touching the network.
    pub async fn start(&self) -> Result<()> {
        self.inner.touch();
        let settings = self.inner.settings.snapshot();
        match settings.provider {
            Provider::Local => {
                let mut state = self.inner.state.lock().await;
                if state.worker.as_ref().is_none_or(WorkerHandle::is_finished) {
                    debug!("spawning transcription worker");
                    let (handle, events) = worker::spawn(self.inner.loader.clone());
                    state.worker = Some(handle);
                    state.engine_ready = false;
                    state.generation += 1;
                    spawn_event_pump(self.inner.clone(), events, state.generation);
                }
                let model = models::resolve_tier(settings.model_tier).id;
                if let Some(handle) = &state.worker {
                    handle.send(WorkerRequest::Load {
                        model: model.to_string(),
                    })?;
                }
                Ok(())
            }
            Provider::Cloud => {
                if has_credential(settings.cloud_api_key.as_deref()) {
                    self.inner.emit(SttEvent::Ready {
                        device: SttDevice::Cloud,
                    });
                    Ok(())
                } else {
                    let err = VoxnoteError::MissingCredential;
                    self.inner.emit(SttEvent::Error {
                        message: err.to_string(),
                    });
                    Err(err)
                }
            }
        }
    }

    /// Route a chunk of 16kHz mono samples to the active provider.
    ///
    /// Local chunks are forwarded only once the worker has reported ready;
    /// earlier chunks are dropped. Cloud chunks are buffered unconditionally.
    pub async fn feed(&self, chunk: Vec<f32>) -> Result<()> {
        self.inner.touch();
        match self.inner.settings.snapshot().provider {
            Provider::Local => {
                let state = self.inner.state.lock().await;
                match &state.worker {
                    Some(handle) if state.engine_ready => {
                        handle.send(WorkerRequest::Audio { data: chunk })
                    }
                    _ => {
                        debug!(samples = chunk.len(), "dropping chunk, engine not ready");
                        Ok(())
                    }
                }
            }
            Provider::Cloud => {
                self.inner.cloud.lock().await.append_chunk(chunk);
                Ok(())
            }
        }
    }

    /// End the session.
    ///
    /// Local: asks the worker to flush its remainder; the final result (if
    /// any) arrives as an event and `Ok(None)` is returned. Cloud: encodes
    /// and submits the buffered audio synchronously and returns the text.
    pub async fn stop(&self) -> Result<Option<String>> {
        self.inner.touch();
        let settings = self.inner.settings.snapshot();
        match settings.provider {
            Provider::Local => {
                let state = self.inner.state.lock().await;
                if let Some(handle) = &state.worker {
                    handle.send(WorkerRequest::Stop)?;
                }
                Ok(None)
            }
            Provider::Cloud => {
                let key = settings.cloud_api_key.unwrap_or_default();
                let mut cloud = self.inner.cloud.lock().await;
                match cloud.finalize(&key).await {
                    Ok(Some(text)) => {
                        self.inner.emit(SttEvent::Result { text: text.clone() });
                        Ok(Some(text))
                    }
                    Ok(None) => Ok(None),
                    Err(e) => {
                        self.inner.emit(SttEvent::Error {
                            message: e.to_string(),
                        });
                        Err(e)
                    }
                }
            }
        }
    }

    /// Whether a model's artifacts are already cached on disk. Purely
    /// informational, no side effects.
    pub fn check_cache(&self, model_id: &str) -> bool {
        models::is_cached(model_id)
    }

    /// Whether a worker task is currently alive.
    pub async fn is_worker_alive(&self) -> bool {
        self.inner
            .state
            .lock()
            .await
            .worker
            .as_ref()
            .is_some_and(|w| !w.is_finished())
    }

    /// Tear everything down: idle watcher, worker, model.
    pub async fn shutdown(self) {
        self.idle_watcher.abort();
        let mut state = self.inner.state.lock().await;
        teardown(&mut state);
    }
}

impl Drop for SttOrchestrator {
    fn drop(&mut self) {
        // The watcher holds an Arc<Inner>; without this it would outlive us.
        self.idle_watcher.abort();
    }
}

impl Inner {
    fn touch(&self) {
        self.last_activity.store(now_millis(), Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last = self.last_activity.load(Ordering::Relaxed);
        Duration::from_millis(now_millis().saturating_sub(last))
    }

    fn emit(&self, event: SttEvent) {
        if self.events.send(event).is_err() {
            debug!("UI event channel disconnected");
        }
    }
}

fn has_credential(key: Option<&str>) -> bool {
    key.is_some_and(|k| !k.trim().is_empty())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Drop the worker handle and reset model state. The worker exits once its
/// request channel closes; an in-flight pass finishes on the blocking pool
/// and its result is discarded.
fn teardown(state: &mut LocalState) {
    state.engine_ready = false;
    if state.worker.take().is_some() {
        debug!("transcription worker torn down");
    }
}

/// Forward worker events to the UI channel and watch for unexpected death.
fn spawn_event_pump(
    inner: Arc<Inner>,
    mut events: tokio::sync::mpsc::UnboundedReceiver<WorkerEvent>,
    generation: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            inner.touch();
            match event {
                WorkerEvent::Ready { device } => {
                    inner.state.lock().await.engine_ready = true;
                    inner.emit(SttEvent::Ready {
                        device: device.into(),
                    });
                }
                WorkerEvent::Progress(payload) => inner.emit(SttEvent::Progress(payload)),
                WorkerEvent::Result(text) => inner.emit(SttEvent::Result { text }),
                WorkerEvent::Error(message) => inner.emit(SttEvent::Error { message }),
            }
        }

        // The event channel only closes when the worker task has ended. If
        // the handle from our own spawn is still registered, this was not a
        // deliberate teardown; reset so the next start() respawns from
        // scratch. A newer generation means start() already respawned and
        // the registered worker is not ours to touch.
        let mut state = inner.state.lock().await;
        if state.generation == generation && state.worker.is_some() {
            warn!("transcription worker exited unexpectedly");
            teardown(&mut state);
            inner.emit(SttEvent::Error {
                message: "transcription worker exited unexpectedly".to_string(),
            });
        }
    })
}

/// Periodic idle check, owned by the orchestrator for its whole lifetime.
async fn idle_watch(inner: Arc<Inner>, check_interval: Duration, unload_after: Duration) {
    let mut interval = tokio::time::interval(check_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    interval.tick().await; // first tick completes immediately
    loop {
        interval.tick().await;
        if inner.idle_for() < unload_after {
            continue;
        }
        let mut state = inner.state.lock().await;
        if state.worker.is_some() {
            info!(idle = ?inner.idle_for(), "unloading model after inactivity");
            teardown(&mut state);
            inner.emit(SttEvent::ModelUnloaded);
        }
    }
}
