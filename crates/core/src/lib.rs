//! Core of the mock-interview coach.
//!
//! An interview is a loop of question, answer and feedback. The
//! [`orchestrator`] owns that loop for one session and talks to the outside
//! world through three seams: a [`dialogue::DialogueService`] that writes and
//! grades questions, a [`speech_output::SpeechOutputPort`] that reads text
//! aloud and a [`speech_input::SpeechInputPort`] that turns the answer back
//! into text. The [`controller`] starts sessions and owns the shared ports.

pub mod controller;
pub mod dialogue;
pub mod error;
pub mod interview;
pub mod orchestrator;
pub mod session_state;
pub mod speech_input;
pub mod speech_output;
pub mod topic;

#[cfg(test)]
mod testing;

pub use controller::InterviewController;
pub use dialogue::DialogueService;
pub use error::{InputError, PortError, SessionError};
pub use interview::{
    DifficultyLevel, Evaluation, Question, Response, SessionConfig, Summary, Topic,
};
pub use orchestrator::{SessionHandle, SessionOrchestrator, Timings};
pub use session_state::{SessionState, SessionStatus};
pub use topic::TopicCatalog;
