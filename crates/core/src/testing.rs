//! Fake speech devices shared by the unit tests.

use crate::error::{InputError, PortError};
use crate::speech_input::{RecognizerEvent, RecognizerSink, SpeechRecognizer};
use crate::speech_output::SpeechSynthesizer;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

pub(crate) struct FakeSynthesizer {
    spoken: Mutex<Vec<String>>,
    halts: AtomicUsize,
    releases: AtomicUsize,
    gate: Option<Semaphore>,
    failure: Option<String>,
    hang_from: Option<usize>,
}

impl FakeSynthesizer {
    /// Every utterance finishes immediately.
    pub(crate) fn new() -> Self {
        Self {
            spoken: Mutex::new(vec![]),
            halts: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            gate: None,
            failure: None,
            hang_from: None,
        }
    }

    /// Utterances finish only when the test releases them.
    pub(crate) fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::new()
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    /// The first `count` utterances finish immediately, later ones never do.
    pub(crate) fn hanging_after(count: usize) -> Self {
        Self {
            hang_from: Some(count),
            ..Self::new()
        }
    }

    pub(crate) fn release_utterances(&self, count: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(count);
        }
    }

    pub(crate) fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub(crate) fn halts(&self) -> usize {
        self.halts.load(Ordering::SeqCst)
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn speak(&self, text: &str) -> Result<(), PortError> {
        let index = {
            let mut spoken = self.spoken.lock().unwrap();
            spoken.push(text.to_string());
            spoken.len() - 1
        };
        if let Some(message) = &self.failure {
            return Err(PortError::Device(message.clone()));
        }
        if self.hang_from.is_some_and(|from| index >= from) {
            std::future::pending::<()>().await;
        }
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
        Ok(())
    }

    fn halt(&self) {
        self.halts.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// What the recognizer does for one capture.
#[derive(Debug, Clone)]
pub(crate) enum Heard {
    Final(&'static str),
    Partial(&'static str),
    Fault(InputError),
}

/// A recognizer that replays one scripted capture per `start` call. Once the
/// script runs out every capture stays silent.
pub(crate) struct ScriptedRecognizer {
    script: Mutex<VecDeque<Vec<Heard>>>,
    sink: Mutex<Option<RecognizerSink>>,
    starts: AtomicUsize,
    stops: AtomicUsize,
    releases: AtomicUsize,
    start_failure: Option<PortError>,
}

impl ScriptedRecognizer {
    pub(crate) fn new(script: Vec<Vec<Heard>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            sink: Mutex::new(None),
            starts: AtomicUsize::new(0),
            stops: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            start_failure: None,
        }
    }

    pub(crate) fn silent() -> Self {
        Self::new(vec![])
    }

    pub(crate) fn refusing(error: PortError) -> Self {
        Self {
            start_failure: Some(error),
            ..Self::silent()
        }
    }

    pub(crate) fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub(crate) fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub(crate) fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start(&self, sink: RecognizerSink) -> Result<(), PortError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.start_failure {
            return Err(error.clone());
        }
        let capture = self.script.lock().unwrap().pop_front().unwrap_or_default();
        for heard in capture {
            let event = match heard {
                Heard::Final(text) => RecognizerEvent::Final(text.to_string()),
                Heard::Partial(text) => RecognizerEvent::Partial(text.to_string()),
                Heard::Fault(error) => RecognizerEvent::Error(error),
            };
            let _ = sink.send(event);
        }
        // Keep the capture open until stopped, like a live microphone.
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    fn stop(&self) -> Result<(), PortError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.sink.lock().unwrap().take();
        Ok(())
    }

    fn release(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}
