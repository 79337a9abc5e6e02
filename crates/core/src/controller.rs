//! The outward facade: starts interviews and owns the speech ports they share.

use crate::dialogue::DialogueService;
use crate::error::SessionError;
use crate::interview::SessionConfig;
use crate::orchestrator::{SessionHandle, SessionOrchestrator, Timings};
use crate::speech_input::{GuardedSpeechInput, SpeechInputPort, SpeechRecognizer};
use crate::speech_output::{SpeechOutputPort, SpeechSynthesizer, TaggedSpeechOutput};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

struct ActiveSession {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct ControllerState {
    active: Option<ActiveSession>,
    shut_down: bool,
}

pub struct InterviewController {
    dialogue: Arc<dyn DialogueService>,
    output: Arc<dyn SpeechOutputPort>,
    input: Arc<dyn SpeechInputPort>,
    timings: Timings,
    state: Mutex<ControllerState>,
}

impl InterviewController {
    /// Wraps raw speech devices in the guarded ports sessions expect.
    pub fn new(
        dialogue: Arc<dyn DialogueService>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        recognizer: Arc<dyn SpeechRecognizer>,
    ) -> Self {
        Self::with_ports(
            dialogue,
            Arc::new(TaggedSpeechOutput::new(synthesizer)),
            Arc::new(GuardedSpeechInput::new(recognizer)),
        )
    }

    pub fn with_ports(
        dialogue: Arc<dyn DialogueService>,
        output: Arc<dyn SpeechOutputPort>,
        input: Arc<dyn SpeechInputPort>,
    ) -> Self {
        Self {
            dialogue,
            output,
            input,
            timings: Timings::default(),
            state: Mutex::new(ControllerState::default()),
        }
    }

    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Starts a new interview. Any session that is still running is ended
    /// without a summary first.
    pub async fn start_interview(
        &self,
        config: SessionConfig,
    ) -> Result<SessionHandle, SessionError> {
        config.validate()?;
        let mut state = self.state.lock().await;
        if state.shut_down {
            return Err(SessionError::ShutDown);
        }
        if let Some(previous) = state.active.take() {
            tracing::info!("Replacing session {}", previous.handle.session_id());
            retire(previous).await;
        }

        let (orchestrator, handle) = SessionOrchestrator::new(
            config,
            self.dialogue.clone(),
            self.output.clone(),
            self.input.clone(),
            self.timings,
        );
        let task = tokio::spawn(orchestrator.run());
        state.active = Some(ActiveSession {
            handle: handle.clone(),
            task,
        });
        Ok(handle)
    }

    pub async fn active_session(&self) -> Option<SessionHandle> {
        self.state
            .lock()
            .await
            .active
            .as_ref()
            .map(|session| session.handle.clone())
    }

    /// Ends the active session and releases both speech ports. Later calls
    /// are no-ops.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        if let Some(session) = state.active.take() {
            retire(session).await;
        }
        self.output.shutdown();
        self.input.shutdown();
        tracing::info!("Interview controller shut down.");
    }
}

async fn retire(session: ActiveSession) {
    // Already-ended sessions ignore this.
    session.handle.end(false).await;
    session.handle.shutdown();
    if let Err(e) = session.task.await {
        tracing::warn!("Session task did not stop cleanly: {}", e);
    }
}
