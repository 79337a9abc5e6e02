//! Text-to-speech port.
//!
//! `SpeechSynthesizer` is what a platform adapter implements: it renders one
//! utterance and resolves when the audio is done. `TaggedSpeechOutput` turns
//! that into the port the orchestrator drives. Every `speak` gets a fresh
//! utterance id, a new `speak` interrupts the one in flight instead of queuing
//! behind it, and `stop` throws pending completions away without running
//! them.

use crate::error::PortError;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Called exactly once when an utterance finishes, unless it was interrupted.
pub type OnSpoken = Box<dyn FnOnce(Result<(), PortError>) + Send + 'static>;

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speaks `text` and resolves once playback has finished.
    async fn speak(&self, text: &str) -> Result<(), PortError>;

    /// Cuts off whatever is currently playing.
    fn halt(&self) {}

    /// Releases the underlying engine.
    fn release(&self) {}
}

/// The speech output contract the orchestrator depends on.
pub trait SpeechOutputPort: Send + Sync {
    fn speak(&self, text: &str, on_complete: OnSpoken) -> Result<(), PortError>;
    fn stop(&self) -> Result<(), PortError>;
    fn is_speaking(&self) -> bool;
    fn shutdown(&self);
}

struct Utterance {
    id: u64,
    on_complete: Option<OnSpoken>,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct OutputState {
    next_id: u64,
    active: Option<Utterance>,
    shut_down: bool,
}

pub struct TaggedSpeechOutput {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    state: Arc<Mutex<OutputState>>,
}

impl TaggedSpeechOutput {
    pub fn new(synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        Self {
            synthesizer,
            state: Arc::new(Mutex::new(OutputState::default())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, OutputState> {
        // A poisoned lock only means a callback panicked; the state is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drops the active utterance, if any. Returns whether one was in flight.
    fn interrupt(state: &mut OutputState) -> bool {
        match state.active.take() {
            Some(utterance) => {
                utterance.task.abort();
                tracing::debug!("Interrupted utterance #{}", utterance.id);
                true
            }
            None => false,
        }
    }
}

impl SpeechOutputPort for TaggedSpeechOutput {
    fn speak(&self, text: &str, on_complete: OnSpoken) -> Result<(), PortError> {
        let mut state = self.lock();
        if state.shut_down {
            return Err(PortError::ShutDown);
        }
        if Self::interrupt(&mut state) {
            self.synthesizer.halt();
        }

        state.next_id += 1;
        let id = state.next_id;
        let synthesizer = self.synthesizer.clone();
        let shared = self.state.clone();
        let text = text.to_string();
        tracing::debug!("Speaking utterance #{}: '{}'", id, text);

        let task = tokio::spawn(async move {
            let outcome = synthesizer.speak(&text).await;
            // Only the utterance that is still current may complete.
            let on_complete = {
                let mut state = shared.lock().unwrap_or_else(|e| e.into_inner());
                match state.active.as_ref() {
                    Some(active) if active.id == id => {
                        state.active.take().and_then(|mut u| u.on_complete.take())
                    }
                    _ => None,
                }
            };
            match on_complete {
                Some(callback) => callback(outcome),
                None => tracing::debug!("Dropping stale completion for utterance #{}", id),
            }
        });

        state.active = Some(Utterance {
            id,
            on_complete: Some(on_complete),
            task,
        });
        Ok(())
    }

    fn stop(&self) -> Result<(), PortError> {
        let mut state = self.lock();
        if Self::interrupt(&mut state) {
            self.synthesizer.halt();
        }
        Ok(())
    }

    fn is_speaking(&self) -> bool {
        self.lock().active.is_some()
    }

    fn shutdown(&self) {
        let mut state = self.lock();
        if state.shut_down {
            return;
        }
        if Self::interrupt(&mut state) {
            self.synthesizer.halt();
        }
        state.shut_down = true;
        self.synthesizer.release();
        tracing::info!("Speech output shut down.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeSynthesizer;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn recorder() -> (
        impl Fn(&'static str) -> OnSpoken,
        mpsc::UnboundedReceiver<(&'static str, Result<(), PortError>)>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let make = move |label: &'static str| -> OnSpoken {
            let tx = tx.clone();
            Box::new(move |outcome| {
                let _ = tx.send((label, outcome));
            })
        };
        (make, rx)
    }

    #[tokio::test]
    async fn test_speak_reports_completion_once() {
        let synthesizer = Arc::new(FakeSynthesizer::new());
        let output = TaggedSpeechOutput::new(synthesizer.clone());
        let (callback, mut rx) = recorder();

        output.speak("Hello", callback("hello")).unwrap();
        let (label, outcome) = rx.recv().await.unwrap();

        assert_eq!(label, "hello");
        assert!(outcome.is_ok());
        assert!(!output.is_speaking());
        assert_eq!(synthesizer.spoken(), vec!["Hello".to_string()]);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_new_speak_interrupts_previous_utterance() {
        let synthesizer = Arc::new(FakeSynthesizer::gated());
        let output = TaggedSpeechOutput::new(synthesizer.clone());
        let (callback, mut rx) = recorder();

        output.speak("first", callback("first")).unwrap();
        output.speak("second", callback("second")).unwrap();
        assert!(output.is_speaking());
        assert_eq!(synthesizer.halts(), 1);

        // Let both utterances finish; only the current one may report.
        synthesizer.release_utterances(2);
        let (label, _) = rx.recv().await.unwrap();
        assert_eq!(label, "second");

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stop_discards_pending_completion() {
        let synthesizer = Arc::new(FakeSynthesizer::gated());
        let output = TaggedSpeechOutput::new(synthesizer.clone());
        let (callback, mut rx) = recorder();

        output.speak("Tell me about yourself", callback("intro")).unwrap();
        output.stop().unwrap();
        assert!(!output.is_speaking());

        synthesizer.release_utterances(1);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(rx.try_recv().is_err());

        // The port is immediately usable again.
        output.speak("Next", callback("next")).unwrap();
        synthesizer.release_utterances(1);
        let (label, _) = rx.recv().await.unwrap();
        assert_eq!(label, "next");
    }

    #[tokio::test]
    async fn test_device_failure_is_delivered() {
        let synthesizer = Arc::new(FakeSynthesizer::failing("engine crashed"));
        let output = TaggedSpeechOutput::new(synthesizer);
        let (callback, mut rx) = recorder();

        output.speak("Hello", callback("hello")).unwrap();
        let (_, outcome) = rx.recv().await.unwrap();
        assert_eq!(
            outcome,
            Err(PortError::Device("engine crashed".to_string()))
        );
    }

    #[tokio::test]
    async fn test_shutdown_rejects_further_speech() {
        let synthesizer = Arc::new(FakeSynthesizer::new());
        let output = TaggedSpeechOutput::new(synthesizer.clone());
        let (callback, _rx) = recorder();

        output.shutdown();
        output.shutdown();
        assert_eq!(synthesizer.releases(), 1);
        assert_eq!(
            output.speak("Hello", callback("hello")),
            Err(PortError::ShutDown)
        );
    }
}
