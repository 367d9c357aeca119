//! Session-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use bdispatch::DispatchError;
use btooling::ToolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    /// The completion round-trip itself failed.
    Dispatch,
    /// A backend-requested tool could not be resolved or executed.
    Tooling,
    /// The backend answered but its payload carried no choices.
    EmptyChoices,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Dispatch, message)
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Tooling, message)
    }

    pub fn empty_choices(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::EmptyChoices, message)
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<DispatchError> for ChatError {
    fn from(value: DispatchError) -> Self {
        ChatError::dispatch(value.to_string())
    }
}

impl From<ToolError> for ChatError {
    fn from(value: ToolError) -> Self {
        ChatError::tooling(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_conversion_preserves_the_message() {
        let error: ChatError = DispatchError::network("connection refused").into();
        assert_eq!(error.kind, ChatErrorKind::Dispatch);
        assert!(error.message.contains("connection refused"));
    }

    #[test]
    fn tooling_conversion_preserves_the_message() {
        let error: ChatError = ToolError::not_found("no such tool").into();
        assert_eq!(error.kind, ChatErrorKind::Tooling);
        assert!(error.message.contains("no such tool"));
    }
}
