//! Dispatch error kinds and error value helpers.
//!
//! ```rust
//! use bdispatch::DispatchError;
//!
//! let auth = DispatchError::authorization("401 from backend");
//! assert!(auth.retryable);
//!
//! let empty = DispatchError::empty_result("no endpoint reachable");
//! assert!(!empty.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchErrorKind {
    /// Transport-level failure before any HTTP status was obtained.
    Network,
    /// HTTP 401. Another api key may still succeed.
    Authorization,
    /// HTTP 405. Configuration defect on the endpoint.
    MethodNotAllowed,
    /// Any other non-200 status.
    UnexpectedStatus,
    /// No endpoint ever produced a response. Total misconfiguration.
    EmptyResult,
    /// Malformed backend body.
    Decode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    pub kind: DispatchErrorKind,
    pub message: String,
    pub retryable: bool,
    pub endpoint: Option<String>,
    pub status: Option<u16>,
}

impl DispatchError {
    pub fn new(kind: DispatchErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            endpoint: None,
            status: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Network, message, true)
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Authorization, message, true)
    }

    pub fn method_not_allowed(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::MethodNotAllowed, message, true)
    }

    pub fn unexpected_status(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::UnexpectedStatus, message, true)
    }

    pub fn empty_result(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::EmptyResult, message, false)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(DispatchErrorKind::Decode, message, false)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.endpoint, self.status) {
            (Some(endpoint), Some(status)) => write!(
                f,
                "{:?} [endpoint={}, status={}]: {}",
                self.kind, endpoint, status, self.message
            ),
            (Some(endpoint), None) => {
                write!(f, "{:?} [endpoint={}]: {}", self.kind, endpoint, self.message)
            }
            _ => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for DispatchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helper_builders_assign_expected_retryability() {
        assert!(DispatchError::network("refused").is_retryable());
        assert!(DispatchError::authorization("bad key").is_retryable());
        assert!(DispatchError::method_not_allowed("405").is_retryable());
        assert!(!DispatchError::empty_result("nothing reachable").is_retryable());
        assert!(!DispatchError::decode("bad json").is_retryable());
    }

    #[test]
    fn context_fields_are_included_in_display() {
        let error = DispatchError::authorization("key rejected")
            .with_endpoint("https://api.example.com")
            .with_status(401);

        let rendered = error.to_string();
        assert!(rendered.contains("https://api.example.com"));
        assert!(rendered.contains("401"));
        assert!(rendered.contains("key rejected"));
    }
}
