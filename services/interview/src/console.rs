//! Terminal stand-ins for a speaker and a microphone.
//!
//! The interviewer "speaks" by printing to stdout and pausing for roughly as
//! long as the words would take to say. The candidate "speaks" by typing a
//! line while the session is listening.

use async_trait::async_trait;
use interview_core::speech_input::{RecognizerEvent, RecognizerSink, SpeechRecognizer};
use interview_core::speech_output::SpeechSynthesizer;
use interview_core::{InputError, PortError, SessionState, SessionStatus, Summary};
use std::fmt::Write as _;
use std::sync::Mutex;
use std::time::Duration;

pub struct ConsoleSynthesizer {
    pacing: Duration,
}

impl ConsoleSynthesizer {
    /// `pacing` is the time spent per word; zero prints instantly.
    pub fn new(pacing: Duration) -> Self {
        Self { pacing }
    }

    fn speaking_time(&self, text: &str) -> Duration {
        let words = text.split_whitespace().count() as u32;
        self.pacing * words
    }
}

#[async_trait]
impl SpeechSynthesizer for ConsoleSynthesizer {
    async fn speak(&self, text: &str) -> Result<(), PortError> {
        println!("\nInterviewer: {text}\n");
        tokio::time::sleep(self.speaking_time(text)).await;
        Ok(())
    }

    fn halt(&self) {
        tracing::debug!("Console speech interrupted");
    }
}

#[derive(Default)]
pub struct ConsoleRecognizer {
    sink: Mutex<Option<RecognizerSink>>,
}

impl ConsoleRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one typed line to the open capture. When nothing is listening
    /// the line is handed back so it can be submitted as a typed answer.
    pub fn offer(&self, line: &str) -> Option<String> {
        let line = line.trim();
        let sink = self.sink.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(sink) = sink else {
            return Some(line.to_string());
        };
        let event = if line.is_empty() {
            RecognizerEvent::Error(InputError::NoSpeech)
        } else {
            RecognizerEvent::Final(line.to_string())
        };
        match sink.send(event) {
            Ok(()) => None,
            Err(_) => Some(line.to_string()),
        }
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start(&self, sink: RecognizerSink) -> Result<(), PortError> {
        *self.sink.lock().unwrap_or_else(|e| e.into_inner()) = Some(sink);
        println!("(your turn: type your answer and press Enter)");
        Ok(())
    }

    fn stop(&self) -> Result<(), PortError> {
        self.sink.lock().unwrap_or_else(|e| e.into_inner()).take();
        Ok(())
    }
}

/// What a line typed during a session means.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Pause,
    Resume,
    /// Stop listening without answering.
    Skip,
    /// Open the microphone again, e.g. after a device error.
    Listen,
    Next,
    End,
    Unknown(String),
    Answer(String),
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        match trimmed {
            "/pause" => ConsoleCommand::Pause,
            "/resume" => ConsoleCommand::Resume,
            "/skip" => ConsoleCommand::Skip,
            "/listen" => ConsoleCommand::Listen,
            "/next" => ConsoleCommand::Next,
            "/end" | "/quit" => ConsoleCommand::End,
            other if other.starts_with('/') => ConsoleCommand::Unknown(other.to_string()),
            other => ConsoleCommand::Answer(other.to_string()),
        }
    }
}

/// One line describing a snapshot, or `None` if there is nothing to say.
pub fn describe(state: &SessionState) -> Option<String> {
    if let Some(error) = &state.error {
        return Some(match state.status {
            SessionStatus::Error => format!("Session stopped: {error} (type /listen to retry)"),
            _ => format!("{error}. Listening again..."),
        });
    }
    match state.status {
        SessionStatus::WaitingForQuestion => Some("Thinking of the next question...".to_string()),
        SessionStatus::ProcessingResponse => Some("Evaluating your answer...".to_string()),
        _ => None,
    }
}

pub fn render_summary(summary: &Summary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "===== Interview summary: {} =====", summary.topic_id);
    let _ = writeln!(
        out,
        "Answered: {}    Overall score: {:.1}/10",
        summary.completed_questions_count, summary.overall_score
    );
    if !summary.overview.is_empty() {
        let _ = writeln!(out, "\n{}", summary.overview);
    }
    for (title, items) in [
        ("Strengths", &summary.strengths),
        ("To improve", &summary.improvements),
        ("Recommendations", &summary.recommendations),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(out, "\n{title}:");
        for item in items {
            let _ = writeln!(out, "  - {item}");
        }
    }
    out
}
