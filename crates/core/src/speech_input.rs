//! Speech-to-text port.
//!
//! A `SpeechRecognizer` is the platform side: once started it pushes
//! recognition events into the sink it was handed. `GuardedSpeechInput` wraps
//! it with the guarantees the orchestrator relies on:
//!
//! * starting while a capture is open fully stops the old one first, so two
//!   captures never overlap and the old callback is dropped;
//! * every capture is bounded by [`LISTEN_TIMEOUT`], after which the device is
//!   stopped and a synthetic [`InputError::Timeout`] is reported;
//! * a final result or an error ends the capture and cancels its timeout;
//! * `stop_listening` and `shutdown` drop the callback, so late device events
//!   go nowhere.

use crate::error::{InputError, PortError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const LISTEN_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub enum RecognizerEvent {
    Partial(String),
    Final(String),
    Error(InputError),
}

pub type RecognizerSink = mpsc::UnboundedSender<RecognizerEvent>;

pub trait SpeechRecognizer: Send + Sync {
    /// Opens the microphone and starts pushing events into `sink`.
    fn start(&self, sink: RecognizerSink) -> Result<(), PortError>;

    fn stop(&self) -> Result<(), PortError>;

    fn release(&self) {}
}

/// What the caller of `start_listening` gets told.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent {
    Result { text: String, is_final: bool },
    Error(InputError),
}

pub type OnHeard = Arc<dyn Fn(ListenerEvent) + Send + Sync>;

/// The speech input contract the orchestrator depends on.
pub trait SpeechInputPort: Send + Sync {
    fn start_listening(&self, on_event: OnHeard) -> Result<(), PortError>;
    fn stop_listening(&self) -> Result<(), PortError>;
    fn is_listening(&self) -> bool;
    fn shutdown(&self);
}

struct Capture {
    id: u64,
    on_event: OnHeard,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct InputState {
    next_id: u64,
    active: Option<Capture>,
    shut_down: bool,
}

type SharedState = Arc<Mutex<InputState>>;

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, InputState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Returns the callback of capture `id` while leaving it open.
fn callback_for(state: &SharedState, id: u64) -> Option<OnHeard> {
    lock(state)
        .active
        .as_ref()
        .filter(|capture| capture.id == id)
        .map(|capture| capture.on_event.clone())
}

/// Closes capture `id` and hands back its callback, if it is still current.
fn finish(state: &SharedState, id: u64) -> Option<OnHeard> {
    let mut state = lock(state);
    if state.active.as_ref().is_some_and(|capture| capture.id == id) {
        state.active.take().map(|capture| capture.on_event)
    } else {
        None
    }
}

pub struct GuardedSpeechInput {
    recognizer: Arc<dyn SpeechRecognizer>,
    state: SharedState,
}

impl GuardedSpeechInput {
    pub fn new(recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        Self {
            recognizer,
            state: Arc::new(Mutex::new(InputState::default())),
        }
    }

    fn close_active(&self, state: &mut InputState) -> Result<(), PortError> {
        match state.active.take() {
            Some(capture) => {
                capture.task.abort();
                tracing::debug!("Closing capture #{}", capture.id);
                self.recognizer.stop()
            }
            None => Ok(()),
        }
    }

    async fn watch_capture(
        id: u64,
        state: SharedState,
        recognizer: Arc<dyn SpeechRecognizer>,
        mut events: mpsc::UnboundedReceiver<RecognizerEvent>,
    ) {
        let deadline = tokio::time::sleep(LISTEN_TIMEOUT);
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                event = events.recv() => {
                    let (delivery, done) = match event {
                        Some(RecognizerEvent::Partial(text)) => (
                            callback_for(&state, id),
                            ListenerEvent::Result { text, is_final: false },
                        ),
                        Some(RecognizerEvent::Final(text)) => (
                            finish(&state, id),
                            ListenerEvent::Result { text, is_final: true },
                        ),
                        Some(RecognizerEvent::Error(error)) => {
                            (finish(&state, id), ListenerEvent::Error(error))
                        }
                        None => (
                            finish(&state, id),
                            ListenerEvent::Error(InputError::Device(
                                "recognizer closed the capture".to_string(),
                            )),
                        ),
                    };
                    let is_partial = matches!(done, ListenerEvent::Result { is_final: false, .. });
                    if let Some(on_event) = delivery {
                        on_event(done);
                    }
                    if !is_partial {
                        break;
                    }
                }
                _ = &mut deadline => {
                    if let Some(on_event) = finish(&state, id) {
                        tracing::warn!("Capture #{} timed out after {:?}", id, LISTEN_TIMEOUT);
                        if let Err(e) = recognizer.stop() {
                            tracing::warn!("Failed to stop recognizer after timeout: {}", e);
                        }
                        on_event(ListenerEvent::Error(InputError::Timeout));
                    }
                    break;
                }
            }
        }
    }
}

impl SpeechInputPort for GuardedSpeechInput {
    fn start_listening(&self, on_event: OnHeard) -> Result<(), PortError> {
        let mut state = lock(&self.state);
        if state.shut_down {
            return Err(PortError::ShutDown);
        }
        if let Err(e) = self.close_active(&mut state) {
            tracing::warn!("Failed to stop previous capture: {}", e);
        }

        state.next_id += 1;
        let id = state.next_id;
        let (sink, events) = mpsc::unbounded_channel();
        self.recognizer.start(sink)?;
        tracing::debug!("Started capture #{}", id);

        let task = tokio::spawn(Self::watch_capture(
            id,
            self.state.clone(),
            self.recognizer.clone(),
            events,
        ));
        state.active = Some(Capture { id, on_event, task });
        Ok(())
    }

    fn stop_listening(&self) -> Result<(), PortError> {
        let mut state = lock(&self.state);
        self.close_active(&mut state)
    }

    fn is_listening(&self) -> bool {
        lock(&self.state).active.is_some()
    }

    fn shutdown(&self) {
        let mut state = lock(&self.state);
        if state.shut_down {
            return;
        }
        if let Err(e) = self.close_active(&mut state) {
            tracing::warn!("Failed to stop recognizer during shutdown: {}", e);
        }
        state.shut_down = true;
        self.recognizer.release();
        tracing::info!("Speech input shut down.");
    }
}
