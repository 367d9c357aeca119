//! Common imports for most banter applications.

pub use crate::{AgentConfig, ChatAgent, ConfigError, ConfigErrorKind};
pub use crate::{
    BoxFuture, ChatError, ChatErrorKind, CompletionDispatcher, CompletionRequest,
    ConversationHistory, DispatchError, DispatchErrorKind, DispatcherConfig, EndpointConfig,
    FinishReason, FunctionCallback, FunctionParameters, FunctionSpec, Message, Role,
    SessionHandle, SessionId, SessionStore, ToolCall, ToolDescriptor, ToolError, ToolErrorKind,
    ToolRegistration, ToolRegistry, Turn, TurnOrchestrator, parse_json_object, required_string,
};
