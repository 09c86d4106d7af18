//! User-visible failures of an interview session.
//!
//! Every variant is recoverable: the session returns to (or stays in) the
//! candidate's turn and the triggering action can simply be retried.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The microphone could not be opened.
    #[error("Microphone access denied. Please allow microphone access and try again.")]
    MicrophoneUnavailable(String),

    /// A request was rejected or the reply stream broke off.
    #[error("{0}")]
    Transport(String),

    /// The server sent an `error` record on the reply stream.
    #[error("{0}")]
    Server(String),

    /// The end-of-session report could not be produced.
    #[error("{0}")]
    Report(String),
}

impl SessionError {
    /// Underlying cause, for logs. For device failures this differs from the
    /// message shown to the candidate.
    pub fn detail(&self) -> &str {
        match self {
            SessionError::MicrophoneUnavailable(detail)
            | SessionError::Transport(detail)
            | SessionError::Server(detail)
            | SessionError::Report(detail) => detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_microphone_message_hides_device_detail() {
        let error = SessionError::MicrophoneUnavailable("ALSA: device busy".to_string());
        assert_eq!(
            error.to_string(),
            "Microphone access denied. Please allow microphone access and try again."
        );
        assert_eq!(error.detail(), "ALSA: device busy");
    }

    #[test]
    fn test_server_message_is_shown_verbatim() {
        let error = SessionError::Server("boom".to_string());
        assert_eq!(error.to_string(), "boom");
    }
}
