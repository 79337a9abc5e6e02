//! The turn-taking state machine that drives one interview.
//!
//! A `SessionOrchestrator` runs as a single task that owns the session state.
//! Everything that can happen to a session, a caller command or a port or
//! dialogue completion, arrives as a `SessionEvent` on one channel and is
//! handled to completion before the next one is looked at. This is the only
//! place state is written.
//!
//! At any moment the orchestrator waits on at most one thing: an utterance, a
//! capture, a timer or a dialogue call. That wait is recorded as a `Pending`
//! step tagged with a ticket. Completions carry the ticket they were issued
//! with, and anything that does not match the current ticket is stale and is
//! dropped.

use crate::dialogue::DialogueService;
use crate::error::{InputError, PortError};
use crate::interview::{Question, Response, SessionConfig, Summary};
use crate::session_state::{SessionState, SessionStatus, StatePublisher};
use crate::speech_input::{ListenerEvent, OnHeard, SpeechInputPort};
use crate::speech_output::{OnSpoken, SpeechOutputPort};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Pause between the end of an utterance and opening the microphone, so the
/// speaker has released the audio device.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);
/// How long a recoverable input error stays on screen before listening again.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1500);

const HIGH_SCORE: u8 = 8;
const LOW_SCORE: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub settle_delay: Duration,
    pub retry_delay: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

pub(crate) enum SessionEvent {
    StartListening(oneshot::Sender<bool>),
    StopListening(oneshot::Sender<bool>),
    SubmitAnswer(String, oneshot::Sender<bool>),
    NextQuestion(oneshot::Sender<bool>),
    End(bool, oneshot::Sender<Option<Summary>>),
    Pause(oneshot::Sender<bool>),
    Resume(oneshot::Sender<bool>),
    Shutdown,
    Spoken {
        ticket: u64,
        outcome: Result<(), PortError>,
    },
    Heard {
        ticket: u64,
        event: ListenerEvent,
    },
    Elapsed {
        ticket: u64,
    },
    QuestionReady {
        ticket: u64,
        result: anyhow::Result<Question>,
    },
    Evaluated {
        ticket: u64,
        result: anyhow::Result<Response>,
    },
    Summarized {
        ticket: u64,
        result: anyhow::Result<Summary>,
    },
}

/// What the orchestrator is currently waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    FetchingQuestion,
    SpeakingQuestion,
    Settling,
    Listening,
    RetryBackoff,
    Evaluating,
    SpeakingFeedback,
    Summarizing,
}

impl Step {
    fn is_dialogue(&self) -> bool {
        matches!(
            self,
            Step::FetchingQuestion | Step::Evaluating | Step::Summarizing
        )
    }
}

type SummaryReply = oneshot::Sender<Option<Summary>>;

struct Pending {
    ticket: u64,
    step: Step,
    task: Option<JoinHandle<()>>,
}

pub struct SessionOrchestrator {
    dialogue: Arc<dyn DialogueService>,
    output: Arc<dyn SpeechOutputPort>,
    input: Arc<dyn SpeechInputPort>,
    timings: Timings,
    publisher: StatePublisher,
    events: mpsc::WeakUnboundedSender<SessionEvent>,
    inbox: mpsc::UnboundedReceiver<SessionEvent>,
    next_ticket: u64,
    pending: Option<Pending>,
    /// Caller of `end(true)` waiting for the summary call.
    summary_reply: Option<SummaryReply>,
    paused: bool,
    ended: bool,
}

impl SessionOrchestrator {
    /// Creates the orchestrator for one interview and the handle used to
    /// control and observe it. Nothing happens until [`run`](Self::run) is
    /// polled.
    pub fn new(
        config: SessionConfig,
        dialogue: Arc<dyn DialogueService>,
        output: Arc<dyn SpeechOutputPort>,
        input: Arc<dyn SpeechInputPort>,
        timings: Timings,
    ) -> (Self, SessionHandle) {
        let session_id = uuid::Uuid::new_v4().to_string();
        let publisher = StatePublisher::new(SessionState::new(session_id.clone(), config));
        let (commands, inbox) = mpsc::unbounded_channel();

        let handle = SessionHandle {
            session_id: session_id.into(),
            commands: commands.clone(),
            latest: publisher.watcher(),
            transitions: publisher.transitions(),
        };
        let orchestrator = Self {
            dialogue,
            output,
            input,
            timings,
            publisher,
            // Only handles keep the session alive.
            events: commands.downgrade(),
            inbox,
            next_ticket: 0,
            pending: None,
            summary_reply: None,
            paused: false,
            ended: false,
        };
        (orchestrator, handle)
    }

    /// Drives the session until it is shut down or every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(
            "Session {} started for topic '{}'",
            self.state().session_id,
            self.state().config.topic_id
        );
        self.initialize();

        while let Some(event) = self.inbox.recv().await {
            if !self.handle(event) {
                break;
            }
        }

        if let Some(pending) = self.pending.take() {
            if let Some(task) = pending.task {
                task.abort();
            }
        }
        tracing::info!("Session {} orchestrator stopped", self.state().session_id);
    }

    fn state(&self) -> Arc<SessionState> {
        self.publisher.snapshot()
    }

    fn handle(&mut self, event: SessionEvent) -> bool {
        match event {
            SessionEvent::StartListening(reply) => {
                let _ = reply.send(self.start_listening());
            }
            SessionEvent::StopListening(reply) => {
                let _ = reply.send(self.stop_listening());
            }
            SessionEvent::SubmitAnswer(text, reply) => {
                let _ = reply.send(self.submit_text_answer(text));
            }
            SessionEvent::NextQuestion(reply) => {
                let _ = reply.send(self.next_question());
            }
            SessionEvent::End(generate_summary, reply) => self.end(generate_summary, Some(reply)),
            SessionEvent::Pause(reply) => {
                let _ = reply.send(self.pause());
            }
            SessionEvent::Resume(reply) => {
                let _ = reply.send(self.resume());
            }
            SessionEvent::Shutdown => return false,
            SessionEvent::Spoken { ticket, outcome } => {
                if let Some(step) = self.take_pending(ticket) {
                    self.on_spoken(step, outcome);
                }
            }
            SessionEvent::Heard { ticket, event } => self.on_heard(ticket, event),
            SessionEvent::Elapsed { ticket } => {
                if let Some(step) = self.take_pending(ticket) {
                    self.on_elapsed(step);
                }
            }
            SessionEvent::QuestionReady { ticket, result } => {
                if self.take_pending(ticket).is_some() {
                    self.on_question(result);
                }
            }
            SessionEvent::Evaluated { ticket, result } => {
                if self.take_pending(ticket).is_some() {
                    self.on_evaluated(result);
                }
            }
            SessionEvent::Summarized { ticket, result } => {
                if self.take_pending(ticket).is_some() {
                    self.on_summarized(result);
                }
            }
        }
        true
    }

    // --- Session control ---

    /// Asks the dialogue service for the opening question.
    fn initialize(&mut self) {
        let config = self.state().config.clone();
        let dialogue = self.dialogue.clone();
        self.spawn_dialogue(Step::FetchingQuestion, move |ticket| async move {
            let result = dialogue
                .generate_initial_question(&config.topic_id, config.difficulty)
                .await;
            SessionEvent::QuestionReady { ticket, result }
        });
    }

    fn start_listening(&mut self) -> bool {
        if self.ended || self.state().current_question.is_none() || self.awaits(Step::Evaluating)
        {
            return false;
        }
        self.cancel_pending();
        self.paused = false;
        self.publisher.update(|s| {
            s.status = SessionStatus::Listening;
            s.error = None;
        });
        self.listen()
    }

    fn stop_listening(&mut self) -> bool {
        if self.awaits(Step::Listening) || self.awaits(Step::RetryBackoff) {
            self.drop_pending();
        }
        match self.input.stop_listening() {
            Ok(()) => true,
            Err(e) => {
                self.fail(format!("Failed to stop listening: {e}"));
                false
            }
        }
    }

    fn submit_text_answer(&mut self, text: String) -> bool {
        let state = self.state();
        let Some(question) = state.current_question.clone() else {
            return false;
        };
        if self.ended || self.awaits(Step::Evaluating) || text.trim().is_empty() {
            return false;
        }
        // A typed answer may arrive while the question is still being read out.
        self.cancel_pending();

        tracing::info!("Evaluating answer to question {}", question.id);
        self.publisher.update(|s| {
            s.status = SessionStatus::ProcessingResponse;
            s.error = None;
        });

        let dialogue = self.dialogue.clone();
        let history = state.responses.clone();
        let topic_id = state.config.topic_id.clone();
        self.spawn_dialogue(Step::Evaluating, move |ticket| async move {
            let result = dialogue
                .evaluate(&question, &text, &history, &topic_id)
                .await;
            SessionEvent::Evaluated { ticket, result }
        })
    }

    fn next_question(&mut self) -> bool {
        let state = self.state();
        let Some(response) = state.current_response.clone() else {
            return false;
        };
        let Some(next_id) = response.next_question_id.clone() else {
            return false;
        };
        if self.ended || self.awaits(Step::FetchingQuestion) {
            return false;
        }
        // Feedback may still be playing when the caller skips ahead.
        self.cancel_pending();

        tracing::info!("Fetching follow-up question {}", next_id);
        self.publisher
            .update(|s| s.status = SessionStatus::WaitingForQuestion);

        let dialogue = self.dialogue.clone();
        let history = state.responses.clone();
        let topic_id = state.config.topic_id.clone();
        let difficulty = state.difficulty;
        self.spawn_dialogue(Step::FetchingQuestion, move |ticket| async move {
            let result = dialogue
                .generate_follow_up_question(
                    &response.question_id,
                    &next_id,
                    &history,
                    &topic_id,
                    difficulty,
                )
                .await;
            SessionEvent::QuestionReady { ticket, result }
        })
    }

    /// Ends the session. The summary, if requested and not trivially empty,
    /// is produced by a dialogue call, and `reply` is answered when it lands.
    fn end(&mut self, generate_summary: bool, reply: Option<SummaryReply>) {
        if self.ended {
            tracing::debug!("Session already ended; ignoring end request");
            send_summary(reply, None);
            return;
        }
        self.ended = true;
        self.paused = false;
        self.drop_pending();

        // The session is over either way, so port failures are only logged.
        if let Err(e) = self.output.stop() {
            tracing::warn!("Failed to stop speech output while ending: {}", e);
        }
        if let Err(e) = self.input.stop_listening() {
            tracing::warn!("Failed to stop speech input while ending: {}", e);
        }

        let state = self.state();
        if !generate_summary {
            self.complete(None);
            tracing::info!("Session {} ended without summary", state.session_id);
            send_summary(reply, None);
            return;
        }
        self.summary_reply = reply;
        if state.responses.is_empty() {
            self.on_summarized(Ok(Summary::empty(&state.session_id, &state.config)));
            return;
        }

        tracing::info!("Requesting summary for session {}", state.session_id);
        let dialogue = self.dialogue.clone();
        let spawned = self.spawn_dialogue(Step::Summarizing, move |ticket| async move {
            let result = dialogue
                .generate_summary(&state.questions, &state.responses, &state.config)
                .await;
            SessionEvent::Summarized { ticket, result }
        });
        if !spawned {
            self.complete(None);
            send_summary(self.summary_reply.take(), None);
        }
    }

    fn pause(&mut self) -> bool {
        self.paused = true;
        // In-flight dialogue calls keep running; their results wait for resume.
        if self.pending.as_ref().is_some_and(|p| !p.step.is_dialogue()) {
            self.drop_pending();
        }
        let output = self.output.stop();
        let input = self.input.stop_listening();
        match (output, input) {
            (Ok(()), Ok(())) => {
                tracing::info!("Session paused");
                true
            }
            (output, input) => {
                tracing::warn!(
                    "Failed to pause cleanly (output: {:?}, input: {:?})",
                    output,
                    input
                );
                false
            }
        }
    }

    fn resume(&mut self) -> bool {
        if self.ended {
            return false;
        }
        self.paused = false;
        if self.pending.as_ref().is_some_and(|p| p.step.is_dialogue()) {
            return true;
        }
        self.cancel_pending();

        let state = self.state();
        if let Some(question) = &state.current_question {
            let text = question.text.clone();
            self.publisher.update(|s| {
                s.status = SessionStatus::PresentingQuestion;
                s.error = None;
            });
            self.speak(Step::SpeakingQuestion, text);
            true
        } else if let Some(response) = &state.current_response {
            let text = response.evaluation.feedback_summary.clone();
            self.publisher.update(|s| {
                s.status = SessionStatus::PresentingFeedback;
                s.error = None;
            });
            self.speak(Step::SpeakingFeedback, text);
            true
        } else {
            false
        }
    }

    // --- Continuations ---

    fn on_question(&mut self, result: anyhow::Result<Question>) {
        match result {
            Ok(question) => {
                tracing::info!("Presenting question {}: '{}'", question.id, question.text);
                let text = question.text.clone();
                self.publisher.update(|s| {
                    s.status = SessionStatus::PresentingQuestion;
                    s.current_question = Some(question);
                    s.current_response = None;
                    s.error = None;
                });
                self.speak(Step::SpeakingQuestion, text);
            }
            Err(e) => self.fail(format!("Failed to get question: {e:#}")),
        }
    }

    fn on_spoken(&mut self, step: Step, outcome: Result<(), PortError>) {
        if let Err(e) = outcome {
            self.fail(format!("Speech output failed: {e}"));
            return;
        }
        match step {
            Step::SpeakingQuestion => {
                if let Err(e) = self.input.stop_listening() {
                    tracing::warn!("Failed to stop lingering capture: {}", e);
                }
                self.start_timer(Step::Settling, self.timings.settle_delay);
            }
            Step::SpeakingFeedback => self.advance(),
            other => tracing::debug!("Unexpected speech completion while {:?}", other),
        }
    }

    fn on_elapsed(&mut self, step: Step) {
        match step {
            Step::Settling => {
                self.publisher.update(|s| s.status = SessionStatus::Listening);
                self.listen();
            }
            Step::RetryBackoff => {
                self.publisher.update(|s| s.error = None);
                self.listen();
            }
            other => tracing::debug!("Unexpected timer while {:?}", other),
        }
    }

    fn on_heard(&mut self, ticket: u64, event: ListenerEvent) {
        if !self
            .pending
            .as_ref()
            .is_some_and(|p| p.ticket == ticket && p.step == Step::Listening)
        {
            tracing::debug!("Ignoring stale input event #{}", ticket);
            return;
        }
        match event {
            ListenerEvent::Result {
                text,
                is_final: false,
            } => tracing::debug!("Partial transcript: '{}'", text),
            ListenerEvent::Result {
                text,
                is_final: true,
            } => {
                self.pending = None;
                if text.trim().is_empty() {
                    self.retry_listening(InputError::NoMatch);
                } else {
                    tracing::info!("Heard answer: '{}'", text);
                    self.submit_text_answer(text);
                }
            }
            ListenerEvent::Error(error) if error.is_recoverable() => {
                self.pending = None;
                self.retry_listening(error);
            }
            ListenerEvent::Error(error) => {
                self.pending = None;
                self.fail(error.to_string());
            }
        }
    }

    fn on_evaluated(&mut self, result: anyhow::Result<Response>) {
        let mut response = match result {
            Ok(response) => response,
            Err(e) => {
                self.fail(format!("Failed to evaluate answer: {e:#}"));
                return;
            }
        };
        let state = self.state();
        let Some(question) = state.current_question.clone() else {
            self.fail("Evaluation arrived without a current question".to_string());
            return;
        };

        response.evaluation.score = response.evaluation.score.clamp(1, 10);
        let budget = state.config.question_count as usize;
        if budget > 0 && state.responses.len() + 1 >= budget && response.next_question_id.is_some()
        {
            tracing::info!("Question budget of {} reached; ending after feedback", budget);
            response.next_question_id = None;
        }

        let mut difficulty = state.difficulty;
        if state.config.adaptive_feedback {
            if response.evaluation.score >= HIGH_SCORE {
                difficulty = difficulty.harder();
            } else if response.evaluation.score <= LOW_SCORE {
                difficulty = difficulty.easier();
            }
            if difficulty != state.difficulty {
                tracing::info!("Adjusting difficulty to {}", difficulty);
            }
        }

        tracing::info!(
            "Question {} scored {}/10",
            question.id,
            response.evaluation.score
        );
        let feedback = response.evaluation.feedback_summary.clone();
        self.publisher.update(|s| {
            s.questions.push(question);
            s.responses.push(response.clone());
            s.current_question = None;
            s.current_response = Some(response);
            s.status = SessionStatus::PresentingFeedback;
            s.difficulty = difficulty;
        });
        self.speak(Step::SpeakingFeedback, feedback);
    }

    fn on_summarized(&mut self, result: anyhow::Result<Summary>) {
        let session_id = self.state().session_id.clone();
        match result {
            Ok(mut summary) => {
                summary.session_id = session_id.clone();
                tracing::info!(
                    "Session {} completed with {} answered question(s), score {:.1}",
                    session_id,
                    summary.completed_questions_count,
                    summary.overall_score
                );
                self.complete(Some(summary.clone()));
                send_summary(self.summary_reply.take(), Some(summary));
            }
            Err(e) => {
                self.fail(format!("Failed to generate summary: {e:#}"));
                send_summary(self.summary_reply.take(), None);
            }
        }
    }

    /// Moves on once feedback has been spoken.
    fn advance(&mut self) {
        let has_next = self
            .state()
            .current_response
            .as_ref()
            .is_some_and(|r| r.next_question_id.is_some());
        if has_next {
            self.next_question();
        } else {
            self.end(true, None);
        }
    }

    // --- Port plumbing ---

    fn speak(&mut self, step: Step, text: String) {
        if self.paused {
            tracing::debug!("Paused; holding speech until resume");
            return;
        }
        let Some(events) = self.events.upgrade() else {
            return;
        };
        let ticket = self.issue_ticket();
        let on_complete: OnSpoken = Box::new(move |outcome| {
            let _ = events.send(SessionEvent::Spoken { ticket, outcome });
        });
        match self.output.speak(&text, on_complete) {
            Ok(()) => self.await_step(ticket, step, None),
            Err(e) => self.fail(format!("Failed to speak: {e}")),
        }
    }

    /// Arms the microphone for the current question.
    fn listen(&mut self) -> bool {
        if self.paused || self.state().current_question.is_none() {
            return false;
        }
        let Some(events) = self.events.upgrade() else {
            return false;
        };
        let ticket = self.issue_ticket();
        let on_event: OnHeard = Arc::new(move |event| {
            let _ = events.send(SessionEvent::Heard { ticket, event });
        });
        match self.input.start_listening(on_event) {
            Ok(()) => {
                self.await_step(ticket, Step::Listening, None);
                true
            }
            Err(e) => {
                self.fail(format!("Failed to start listening: {e}"));
                false
            }
        }
    }

    fn retry_listening(&mut self, error: InputError) {
        tracing::info!("Recoverable input error: {}; listening again", error);
        self.publisher.update(|s| s.error = Some(error.to_string()));
        self.start_timer(Step::RetryBackoff, self.timings.retry_delay);
    }

    fn start_timer(&mut self, step: Step, delay: Duration) {
        let Some(events) = self.events.upgrade() else {
            return;
        };
        let ticket = self.issue_ticket();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SessionEvent::Elapsed { ticket });
        });
        self.await_step(ticket, step, Some(task));
    }

    fn spawn_dialogue<F, Fut>(&mut self, step: Step, call: F) -> bool
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = SessionEvent> + Send + 'static,
    {
        let Some(events) = self.events.upgrade() else {
            return false;
        };
        let ticket = self.issue_ticket();
        let work = call(ticket);
        let task = tokio::spawn(async move {
            let _ = events.send(work.await);
        });
        self.await_step(ticket, step, Some(task));
        true
    }

    // --- Bookkeeping ---

    fn issue_ticket(&mut self) -> u64 {
        self.next_ticket += 1;
        self.next_ticket
    }

    fn await_step(&mut self, ticket: u64, step: Step, task: Option<JoinHandle<()>>) {
        self.pending = Some(Pending { ticket, step, task });
    }

    fn awaits(&self, step: Step) -> bool {
        self.pending.as_ref().is_some_and(|p| p.step == step)
    }

    fn take_pending(&mut self, ticket: u64) -> Option<Step> {
        if self.pending.as_ref().is_some_and(|p| p.ticket == ticket) {
            self.pending.take().map(|p| p.step)
        } else {
            tracing::debug!("Ignoring stale completion #{}", ticket);
            None
        }
    }

    /// Forgets the current wait without touching the ports.
    fn drop_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            if let Some(task) = pending.task {
                task.abort();
            }
        }
    }

    /// Abandons the current wait and silences the port behind it.
    fn cancel_pending(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if let Some(task) = pending.task {
            task.abort();
        }
        let stopped = match pending.step {
            Step::SpeakingQuestion | Step::SpeakingFeedback => self.output.stop(),
            Step::Listening => self.input.stop_listening(),
            _ => Ok(()),
        };
        if let Err(e) = stopped {
            tracing::warn!("Failed to stop port while cancelling {:?}: {}", pending.step, e);
        }
    }

    fn complete(&mut self, summary: Option<Summary>) {
        self.publisher.update(|s| {
            s.status = SessionStatus::Completed;
            s.current_question = None;
            s.current_response = None;
            s.error = None;
            s.summary = summary;
        });
    }

    fn fail(&mut self, message: String) {
        tracing::error!("Session {} failed: {}", self.state().session_id, message);
        self.cancel_pending();
        self.publisher.update(|s| {
            s.status = SessionStatus::Error;
            s.error = Some(message);
        });
    }
}

fn send_summary(reply: Option<SummaryReply>, summary: Option<Summary>) {
    if let Some(reply) = reply {
        let _ = reply.send(summary);
    }
}

/// Caller-facing control surface of one running session. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    session_id: Arc<str>,
    commands: mpsc::UnboundedSender<SessionEvent>,
    latest: watch::Receiver<Arc<SessionState>>,
    transitions: broadcast::Sender<Arc<SessionState>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// The most recently published snapshot.
    pub fn state(&self) -> Arc<SessionState> {
        self.latest.borrow().clone()
    }

    /// A receiver that always holds the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<SessionState>> {
        self.latest.clone()
    }

    /// Every snapshot published from now on, in order.
    pub fn transitions(&self) -> broadcast::Receiver<Arc<SessionState>> {
        self.transitions.subscribe()
    }

    /// Resolves with the first snapshot that satisfies `predicate`, or `None`
    /// if the session goes away first.
    pub async fn wait_until(
        &self,
        predicate: impl FnMut(&Arc<SessionState>) -> bool,
    ) -> Option<Arc<SessionState>> {
        let mut latest = self.latest.clone();
        let result = latest.wait_for(predicate).await;
        result.ok().map(|state| state.clone())
    }

    pub async fn start_listening(&self) -> bool {
        self.request(SessionEvent::StartListening)
            .await
            .unwrap_or(false)
    }

    pub async fn stop_listening(&self) -> bool {
        self.request(SessionEvent::StopListening)
            .await
            .unwrap_or(false)
    }

    pub async fn submit_text_answer(&self, text: impl Into<String>) -> bool {
        let text = text.into();
        self.request(|reply| SessionEvent::SubmitAnswer(text, reply))
            .await
            .unwrap_or(false)
    }

    pub async fn next_question(&self) -> bool {
        self.request(SessionEvent::NextQuestion)
            .await
            .unwrap_or(false)
    }

    /// Ends the session. Only the first call has any effect.
    pub async fn end(&self, generate_summary: bool) -> Option<Summary> {
        self.request(|reply| SessionEvent::End(generate_summary, reply))
            .await
            .flatten()
    }

    pub async fn pause(&self) -> bool {
        self.request(SessionEvent::Pause).await.unwrap_or(false)
    }

    pub async fn resume(&self) -> bool {
        self.request(SessionEvent::Resume).await.unwrap_or(false)
    }

    /// Stops the orchestrator task. The session is left as it is.
    pub(crate) fn shutdown(&self) {
        let _ = self.commands.send(SessionEvent::Shutdown);
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> SessionEvent,
    ) -> Option<T> {
        let (reply, response) = oneshot::channel();
        self.commands.send(make(reply)).ok()?;
        response.await.ok()
    }
}
