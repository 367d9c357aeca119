//! Unified facade over the banter workspace crates.
//!
//! This crate is designed to be the single dependency for most applications.
//! It re-exports the core banter crates, loads YAML configuration, and
//! provides the [`ChatAgent`] entry point for session-scoped chat with
//! backend-invoked tools.

mod agent;
mod config;

pub mod prelude;

pub use bcommon;
pub use bdispatch;
pub use bsession;
pub use btooling;

pub use bcommon::{BoxFuture, Registry, SessionId};
pub use bdispatch::{
    BackendError, ChatChoice, ChatPayload, CompletionBody, CompletionDispatcher,
    CompletionRequest, CompletionTransport, DispatchError, DispatchErrorKind, DispatcherConfig,
    EndpointConfig, EndpointTarget, FinishReason, FunctionCall, FunctionParameters, FunctionSpec,
    HttpCompletionTransport, HttpReply, IncrementalPayload, Message, ParameterSpec, Reply, Role,
    SecretString, ToolCall, ToolDescriptor, Usage,
};
pub use bsession::{
    ChatError, ChatErrorKind, ConversationHistory, MIN_SESSION_TTL, SessionHandle, SessionStore,
    Turn, TurnOrchestrator,
};
pub use btooling::{
    FunctionCallback, ToolCallback, ToolError, ToolErrorKind, ToolFuture, ToolRegistration,
    ToolRegistry, ToolTrigger, parse_json_object, parse_json_value, required_string,
};

pub use agent::ChatAgent;
pub use config::{
    AgentConfig, ConfigError, ConfigErrorKind, DEFAULT_SESSION_TTL_MINUTES, EndpointEntry,
};
