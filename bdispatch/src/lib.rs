//! Completion dispatch with credential/endpoint failover.
//!
//! The dispatcher owns an immutable list of backend endpoints, each with its
//! own ordered api keys and optional proxy, and walks them in order until one
//! attempt succeeds. Wire payloads live here too so every other crate in the
//! workspace shares a single message vocabulary.

mod config;
mod dispatcher;
mod error;
mod transport;
mod wire;

pub use config::{
    DEFAULT_CONTENT_TYPE, DEFAULT_ENDPOINT_PATH, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
    DispatcherConfig, EndpointConfig, MIN_TIMEOUT_SECS, SecretString,
};
pub use dispatcher::CompletionDispatcher;
pub use error::{DispatchError, DispatchErrorKind};
pub use transport::{
    CompletionTransport, DispatchFuture, EndpointTarget, HttpCompletionTransport, HttpReply,
};
pub use wire::{
    BackendError, ChatChoice, ChatPayload, CompletionBody, CompletionRequest, Delta, DeltaChoice,
    FinishReason, FunctionCall, FunctionParameters, FunctionSpec, IncrementalPayload, Message,
    ParameterSpec, Reply, Role, ToolCall, ToolDescriptor, Usage, parse_finish_reason,
};
