//! Transcription worker actor.
//!
//! One tokio task per active local session. The worker owns the only engine
//! handle and is reachable solely through an unbounded message channel; it
//! replies on a second channel. No state is shared across the boundary.
//!
//! ```text
//! Orchestrator ──(load / audio / stop)──▶ Worker ──(ready / progress /
//!                                                   result / error)──▶ pump
//! ```
//!
//! Within the worker everything is cooperatively sequenced: at most one
//! model load and one inference pass run at any instant, each tracked as an
//! optional blocking-pool task polled from the select loop. `audio` messages
//! keep draining while a pass runs, accumulating into a fresh buffer.

pub mod acquisition;

use crate::audio::AudioAccumulator;
use crate::engine::{Device, EngineLoader, SpeechEngine, Windowing};
use crate::error::{Result, VoxnoteError};
use acquisition::{LoadDecision, ModelAcquisition};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Requests sent by the orchestrator to the worker. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WorkerRequest {
    /// Ensure the given model is loaded.
    Load { model: String },
    /// Append a chunk of 16kHz mono samples.
    Audio { data: Vec<f32> },
    /// Finalize the session: flush the remainder after any in-flight pass.
    Stop,
}

/// Execution device reported in a ready message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Accelerated,
    Fallback,
    /// Requested model was already loaded; no work was done.
    Cached,
}

impl From<Device> for DeviceKind {
    fn from(device: Device) -> Self {
        match device {
            Device::Accelerated => DeviceKind::Accelerated,
            Device::Fallback => DeviceKind::Fallback,
        }
    }
}

/// Events emitted by the worker. Zero or more per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum WorkerEvent {
    /// Model is loaded and accepting audio.
    Ready { device: DeviceKind },
    /// Opaque load-progress payload, republished verbatim to the UI.
    Progress(serde_json::Value),
    /// One transcribed window of text.
    Result(String),
    /// Anything that went wrong; the worker stays alive.
    Error(String),
}

/// Handle to a spawned worker.
///
/// Dropping the handle closes the request channel; the worker drains what it
/// has and exits. An in-flight pass still runs to completion on the blocking
/// pool (there is no cancellation), its result discarded.
pub struct WorkerHandle {
    tx: mpsc::UnboundedSender<WorkerRequest>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Send a request to the worker.
    pub fn send(&self, request: WorkerRequest) -> Result<()> {
        self.tx.send(request).map_err(|_| VoxnoteError::WorkerGone {
            message: "worker channel closed".to_string(),
        })
    }

    /// Whether the worker task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Kill the worker task without draining. Used to simulate an
    /// unexpected worker death; normal teardown drops the handle instead.
    #[cfg(test)]
    pub(crate) fn abort(&self) {
        self.join.abort();
    }
}

/// Spawn a worker task. Returns its handle and the event stream.
pub fn spawn(loader: Arc<dyn EngineLoader>) -> (WorkerHandle, mpsc::UnboundedReceiver<WorkerEvent>) {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let join = tokio::spawn(run(loader, req_rx, event_tx));
    (WorkerHandle { tx: req_tx, join }, event_rx)
}

type LoadTask = JoinHandle<Result<(Device, Box<dyn SpeechEngine>)>>;
type PassTask = JoinHandle<Result<String>>;

struct Worker {
    loader: Arc<dyn EngineLoader>,
    events: mpsc::UnboundedSender<WorkerEvent>,
    acquisition: ModelAcquisition,
    accumulator: AudioAccumulator,
    /// Set by `stop`; the next pass slot flushes the remainder.
    stopping: bool,
}

async fn run(
    loader: Arc<dyn EngineLoader>,
    mut requests: mpsc::UnboundedReceiver<WorkerRequest>,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut worker = Worker {
        loader,
        events,
        acquisition: ModelAcquisition::new(),
        accumulator: AudioAccumulator::new(),
        stopping: false,
    };
    let mut load: Option<LoadTask> = None;
    let mut pass: Option<PassTask> = None;

    loop {
        tokio::select! {
            outcome = poll_task(&mut load), if load.is_some() => {
                load = None;
                worker.on_load_done(outcome);
                if pass.is_none() {
                    pass = worker.next_pass();
                }
            }
            outcome = poll_task(&mut pass), if pass.is_some() => {
                pass = None;
                worker.on_pass_done(outcome);
                pass = worker.next_pass();
            }
            request = requests.recv() => match request {
                Some(WorkerRequest::Load { model }) => {
                    load = worker.on_load_request(&model).or(load);
                }
                Some(WorkerRequest::Audio { data }) => {
                    worker.accumulator.push(&data);
                    if pass.is_none() {
                        pass = worker.next_pass();
                    }
                }
                Some(WorkerRequest::Stop) => {
                    worker.on_stop(pass.is_some());
                    if pass.is_none() {
                        pass = worker.next_pass();
                    }
                }
                None => break,
            }
        }
    }

    debug!("transcription worker exiting");
}

/// Await an optional in-flight task. Only polled under a `Some` guard; the
/// pending branch exists so the select arm stays well-formed either way.
async fn poll_task<T>(slot: &mut Option<JoinHandle<T>>) -> std::result::Result<T, tokio::task::JoinError> {
    match slot.as_mut() {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

impl Worker {
    fn emit(&self, event: WorkerEvent) {
        // The receiver vanishing only means the orchestrator is tearing us
        // down; we exit on the closed request channel shortly after.
        let _ = self.events.send(event);
    }

    fn on_load_request(&mut self, model: &str) -> Option<LoadTask> {
        match self.acquisition.request(model) {
            LoadDecision::Debounced => None,
            LoadDecision::AlreadyLoaded => {
                self.emit(WorkerEvent::Ready {
                    device: DeviceKind::Cached,
                });
                None
            }
            LoadDecision::StartLoad => {
                let loader = self.loader.clone();
                let events = self.events.clone();
                let model = model.to_string();
                Some(tokio::task::spawn_blocking(move || {
                    let progress = move |payload: serde_json::Value| {
                        let _ = events.send(WorkerEvent::Progress(payload));
                    };
                    acquisition::load_with_fallback(loader.as_ref(), &model, &progress)
                }))
            }
        }
    }

    fn on_load_done(
        &mut self,
        outcome: std::result::Result<Result<(Device, Box<dyn SpeechEngine>)>, tokio::task::JoinError>,
    ) {
        let outcome = outcome.unwrap_or_else(|e| {
            Err(VoxnoteError::EngineInit {
                message: format!("load task panicked: {e}"),
            })
        });
        match self
            .acquisition
            .complete(outcome.map(|(device, engine)| (device, Arc::from(engine))))
        {
            Ok(device) => self.emit(WorkerEvent::Ready {
                device: device.into(),
            }),
            Err(e) => self.emit(WorkerEvent::Error(e.to_string())),
        }
    }

    fn on_stop(&mut self, pass_in_flight: bool) {
        if !pass_in_flight && !self.acquisition.is_loading() && self.acquisition.engine().is_none()
        {
            // Nothing can flush without an engine; drop what's buffered.
            if let Some(dropped) = self.accumulator.take_remainder() {
                debug!(samples = dropped.len(), "stop without engine, discarding buffer");
            }
            return;
        }
        self.stopping = true;
    }

    /// Start the next pass if one is due: the finalize flush when stopping,
    /// otherwise a threshold-sized drain. Returns `None` when there is no
    /// engine or nothing to take.
    fn next_pass(&mut self) -> Option<PassTask> {
        let engine = self.acquisition.engine()?;
        let samples = if self.stopping {
            self.stopping = false;
            self.accumulator.take_remainder()?
        } else {
            self.accumulator.take_ready()?
        };
        debug!(samples = samples.len(), "starting transcription pass");
        Some(tokio::task::spawn_blocking(move || {
            engine.transcribe(&samples, Windowing::default())
        }))
    }

    fn on_pass_done(
        &mut self,
        outcome: std::result::Result<Result<String>, tokio::task::JoinError>,
    ) {
        // Either way the taken buffer is gone; failed audio is never requeued.
        match outcome {
            Ok(Ok(text)) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    self.emit(WorkerEvent::Result(trimmed.to_string()));
                }
            }
            Ok(Err(e)) => {
                warn!(error = %e, "transcription pass failed");
                self.emit(WorkerEvent::Error(e.to_string()));
            }
            Err(e) => {
                warn!(error = %e, "transcription pass panicked");
                self.emit(WorkerEvent::Error(format!("transcription pass panicked: {e}")));
            }
        }
    }
}
