//! Error types shared by the speech ports, the orchestrator and the controller.

/// A fault reported by the speech-input side while capturing an answer.
///
/// The first three variants are transient: the user simply did not say
/// anything usable, so the orchestrator re-arms the microphone. Everything
/// else needs the caller to step in.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("No speech detected")]
    NoSpeech,
    #[error("Listening timed out")]
    Timeout,
    #[error("No match found for the spoken input")]
    NoMatch,
    #[error("Microphone permission denied")]
    PermissionDenied,
    #[error("Audio device error: {0}")]
    Device(String),
    #[error("{0}")]
    Other(String),
}

impl InputError {
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            InputError::NoSpeech | InputError::Timeout | InputError::NoMatch
        )
    }

    /// Classifies a free-form message from a recognizer that cannot report a
    /// structured error code.
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("no speech") {
            InputError::NoSpeech
        } else if lower.contains("timeout") || lower.contains("timed out") {
            InputError::Timeout
        } else if lower.contains("no match") {
            InputError::NoMatch
        } else if lower.contains("permission") {
            InputError::PermissionDenied
        } else if lower.contains("audio") || lower.contains("device") {
            InputError::Device(message.to_string())
        } else {
            InputError::Other(message.to_string())
        }
    }
}

/// A failure of the speech output or input port itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Speech device failure: {0}")]
    Device(String),
    #[error("Port has been shut down")]
    ShutDown,
}

/// Errors surfaced by the controller when a session cannot be started.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Invalid session configuration: {0}")]
    InvalidConfig(String),
    #[error("Controller has been shut down")]
    ShutDown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_variants() {
        assert!(InputError::NoSpeech.is_recoverable());
        assert!(InputError::Timeout.is_recoverable());
        assert!(InputError::NoMatch.is_recoverable());
        assert!(!InputError::PermissionDenied.is_recoverable());
        assert!(!InputError::Device("mic unplugged".to_string()).is_recoverable());
        assert!(!InputError::Other("weird".to_string()).is_recoverable());
    }

    #[test]
    fn test_from_message_classification() {
        assert_eq!(
            InputError::from_message("ERROR_NO_SPEECH: no speech input"),
            InputError::NoSpeech
        );
        assert_eq!(
            InputError::from_message("Speech timeout"),
            InputError::Timeout
        );
        assert_eq!(
            InputError::from_message("Recognizer timed out"),
            InputError::Timeout
        );
        assert_eq!(InputError::from_message("No match"), InputError::NoMatch);
        assert_eq!(
            InputError::from_message("Insufficient permissions"),
            InputError::PermissionDenied
        );
        assert_eq!(
            InputError::from_message("Audio recording error"),
            InputError::Device("Audio recording error".to_string())
        );
        assert_eq!(
            InputError::from_message("Server busy"),
            InputError::Other("Server busy".to_string())
        );
    }
}
