use crate::interview::{DifficultyLevel, Question, Response, SessionConfig, Summary};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Capacity of the transition fan-out. Slow observers that fall further
/// behind than this see `RecvError::Lagged`.
const TRANSITION_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Initializing,
    WaitingForQuestion,
    PresentingQuestion,
    Listening,
    ProcessingResponse,
    PresentingFeedback,
    Completed,
    Error,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed)
    }
}

/// One immutable snapshot of an interview. A new value is built for every
/// transition; readers never see a half-updated state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub session_id: String,
    pub config: SessionConfig,
    pub status: SessionStatus,
    /// Difficulty used for the next follow-up question.
    pub difficulty: DifficultyLevel,
    pub current_question: Option<Question>,
    pub current_response: Option<Response>,
    /// Questions that have been answered, in order.
    pub questions: Vec<Question>,
    pub responses: Vec<Response>,
    /// Last error message. Transient for recoverable input faults.
    pub error: Option<String>,
    pub summary: Option<Summary>,
}

impl SessionState {
    pub fn new(session_id: String, config: SessionConfig) -> Self {
        Self {
            session_id,
            difficulty: config.difficulty,
            config,
            status: SessionStatus::Initializing,
            current_question: None,
            current_response: None,
            questions: vec![],
            responses: vec![],
            error: None,
            summary: None,
        }
    }

    /// A snapshot never holds both a question and a response.
    pub fn is_consistent(&self) -> bool {
        !(self.current_question.is_some() && self.current_response.is_some())
    }
}

/// The single writer side of a session's snapshot stream.
pub(crate) struct StatePublisher {
    current: Arc<SessionState>,
    latest: watch::Sender<Arc<SessionState>>,
    transitions: broadcast::Sender<Arc<SessionState>>,
}

impl StatePublisher {
    pub(crate) fn new(initial: SessionState) -> Self {
        let current = Arc::new(initial);
        let (latest, _) = watch::channel(current.clone());
        let (transitions, _) = broadcast::channel(TRANSITION_CAPACITY);
        Self {
            current,
            latest,
            transitions,
        }
    }

    pub(crate) fn snapshot(&self) -> Arc<SessionState> {
        self.current.clone()
    }

    pub(crate) fn watcher(&self) -> watch::Receiver<Arc<SessionState>> {
        self.latest.subscribe()
    }

    pub(crate) fn transitions(&self) -> broadcast::Sender<Arc<SessionState>> {
        self.transitions.clone()
    }

    /// Builds the next snapshot from the current one and publishes it.
    pub(crate) fn update(&mut self, change: impl FnOnce(&mut SessionState)) {
        let mut next = (*self.current).clone();
        change(&mut next);
        debug_assert!(
            next.is_consistent(),
            "snapshot holds both a question and a response"
        );
        debug_assert_eq!(next.session_id, self.current.session_id);

        let next = Arc::new(next);
        self.current = next.clone();
        // No receivers is fine for both channels.
        self.latest.send_replace(next.clone());
        let _ = self.transitions.send(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::DifficultyLevel;

    fn publisher() -> StatePublisher {
        let config = SessionConfig::new("android", DifficultyLevel::Intermediate);
        StatePublisher::new(SessionState::new("session-1".to_string(), config))
    }

    #[test]
    fn test_new_state_starts_initializing() {
        let publisher = publisher();
        let state = publisher.snapshot();
        assert_eq!(state.status, SessionStatus::Initializing);
        assert_eq!(state.difficulty, DifficultyLevel::Intermediate);
        assert!(state.current_question.is_none());
        assert!(state.current_response.is_none());
        assert!(state.is_consistent());
    }

    #[tokio::test]
    async fn test_update_replaces_snapshot_for_all_readers() {
        let mut publisher = publisher();
        let watcher = publisher.watcher();
        let mut transitions = publisher.transitions().subscribe();
        let before = watcher.borrow().clone();

        publisher.update(|s| s.status = SessionStatus::WaitingForQuestion);
        publisher.update(|s| s.error = Some("boom".to_string()));

        // The old snapshot is untouched.
        assert_eq!(before.status, SessionStatus::Initializing);
        assert_eq!(watcher.borrow().status, SessionStatus::WaitingForQuestion);
        assert_eq!(watcher.borrow().error.as_deref(), Some("boom"));

        let first = transitions.recv().await.unwrap();
        let second = transitions.recv().await.unwrap();
        assert_eq!(first.status, SessionStatus::WaitingForQuestion);
        assert!(first.error.is_none());
        assert_eq!(second.error.as_deref(), Some("boom"));
        assert_eq!(first.session_id, second.session_id);
    }
}
