//! Session lifecycle and turn orchestration.
//!
//! A [`SessionStore`] keeps one live session per caller-supplied id, each
//! with a bounded [`ConversationHistory`] and a supervisor task that expires
//! the session after a sliding idle TTL. The [`TurnOrchestrator`] runs one
//! conversational turn, including the two-phase protocol for backend
//! requested tool calls.

mod error;
mod history;
mod orchestrator;
mod store;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ConversationHistory, SessionHandle, SessionStore, Turn,
        TurnOrchestrator,
    };
}

pub use error::{ChatError, ChatErrorKind};
pub use history::{ConversationHistory, Turn};
pub use orchestrator::TurnOrchestrator;
pub use store::{DEFAULT_MAX_TURNS, MIN_SESSION_TTL, SessionHandle, SessionStore};
