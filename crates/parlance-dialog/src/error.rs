//! Error types for the dialog runtime.

use parlance_core::ParlanceError;

use crate::state_machine::InvocationState;

/// Failure raised by a user intent handler. Recovered by the dispatcher,
/// which answers with the configured error message.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Intent handler failed: {0}")]
    Failed(String),
    #[error("Missing argument: {0}")]
    MissingArgument(String),
    #[error("Session state error: {0}")]
    State(#[from] serde_json::Error),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        HandlerError::Failed(msg.into())
    }
}

/// Errors from the invocation lifecycle itself.
#[derive(Debug, thiserror::Error)]
pub enum DialogError {
    #[error("Invalid invocation transition: {0} -> {1}")]
    InvalidTransition(InvocationState, InvocationState),
    #[error("Malformed webhook request: {0}")]
    MalformedRequest(String),
}

impl From<DialogError> for ParlanceError {
    fn from(err: DialogError) -> Self {
        ParlanceError::Dialog(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_display() {
        assert_eq!(
            HandlerError::failed("boom").to_string(),
            "Intent handler failed: boom"
        );
        assert_eq!(
            HandlerError::MissingArgument("response".into()).to_string(),
            "Missing argument: response"
        );
    }

    #[test]
    fn test_transition_error_display() {
        let err = DialogError::InvalidTransition(InvocationState::Finalized, InvocationState::Start);
        assert_eq!(err.to_string(), "Invalid invocation transition: finalized -> start");
    }

    #[test]
    fn test_dialog_error_into_top_level() {
        let err: ParlanceError = DialogError::MalformedRequest("no result".into()).into();
        assert!(matches!(err, ParlanceError::Dialog(_)));
    }
}
