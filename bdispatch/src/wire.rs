//! Chat-completion wire payloads and envelope decoding.
//!
//! One `Message` type serves both conversation history and the HTTP body;
//! the backend uses the same shape in both directions.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single chat message. `content` is nullable because an assistant message
/// carrying pending tool calls may have no text at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The assistant message that requests tool invocations.
    pub fn assistant_with_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        }
    }

    /// A tool-result message correlated to its originating call id.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_call_type")]
    pub call_type: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object, passed through verbatim to the callback.
    pub arguments: String,
}

fn function_call_type() -> String {
    "function".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionParameters {
    #[serde(rename = "type")]
    pub param_type: String,
    pub properties: std::collections::BTreeMap<String, ParameterSpec>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl FunctionParameters {
    pub fn object() -> Self {
        Self {
            param_type: "object".to_string(),
            properties: std::collections::BTreeMap::new(),
            required: Vec::new(),
        }
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        spec: ParameterSpec,
        required: bool,
    ) -> Self {
        let name = name.into();
        if required {
            self.required.push(name.clone());
        }
        self.properties.insert(name, spec);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: FunctionParameters,
}

/// Tool descriptor as the backend expects it in the request body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    #[serde(rename = "type")]
    pub descriptor_type: String,
    pub function: FunctionSpec,
}

impl ToolDescriptor {
    pub fn function(spec: FunctionSpec) -> Self {
        Self {
            descriptor_type: "function".to_string(),
            function: spec,
        }
    }
}

/// Dispatcher input: everything except the model name, which the dispatcher
/// supplies from its configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDescriptor>,
    pub tool_choice: Option<String>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            tool_choice: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, tool_choice: impl Into<String>) -> Self {
        self.tool_choice = Some(tool_choice.into());
        self
    }
}

/// The serialized POST body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionBody {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDescriptor>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
}

impl CompletionBody {
    /// Tools are omitted entirely when no candidate matched; `tool_choice`
    /// defaults to `auto` whenever tools are present.
    pub fn build(model: impl Into<String>, request: CompletionRequest) -> Self {
        let CompletionRequest {
            messages,
            tools,
            tool_choice,
        } = request;

        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (
                Some(tools),
                Some(tool_choice.unwrap_or_else(|| "auto".to_string())),
            )
        };

        Self {
            model: model.into(),
            messages,
            tools,
            tool_choice,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    Other,
}

pub fn parse_finish_reason(value: Option<&str>) -> FinishReason {
    match value {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("tool_calls") => FinishReason::ToolCalls,
        _ => FinishReason::Other,
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatChoice {
    #[serde(default)]
    pub index: u32,
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

impl ChatChoice {
    pub fn finish_reason(&self) -> FinishReason {
        parse_finish_reason(self.finish_reason.as_deref())
    }
}

/// Full-message payload returned by a non-streaming completion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatPayload {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Delta-shaped payload returned when the backend was asked to stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IncrementalPayload {
    #[serde(default)]
    pub system_fingerprint: Option<String>,
    #[serde(default)]
    pub choices: Vec<DeltaChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeltaChoice {
    #[serde(default)]
    pub index: u32,
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
struct Envelope {
    #[serde(default)]
    id: String,
    #[serde(default)]
    object: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    model: String,
}

/// Structured error the backend may embed in an otherwise-200 body.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendError {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub param: Option<Value>,
    #[serde(default)]
    pub code: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct BackendErrorEnvelope {
    error: BackendError,
}

/// A decoded success response: the generic envelope, the request-specific
/// payload, and an embedded backend error when the body carried one.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub data: T,
    pub backend_error: Option<BackendError>,
}

impl<T> Reply<T> {
    pub fn is_ok(&self) -> bool {
        self.backend_error.is_none()
    }
}

/// Dual decode: the body is parsed once into the envelope and once into the
/// payload type. An absent `id` is the only reliable discriminant for an
/// embedded error body, so in that case the error shape is parsed as well
/// (nested under `error` or flat) and attached for the caller to inspect.
pub(crate) fn decode_reply<T: DeserializeOwned>(body: &str) -> Result<Reply<T>, DispatchError> {
    let envelope: Envelope = serde_json::from_str(body)
        .map_err(|err| DispatchError::decode(format!("envelope decode failed: {err}")))?;

    let backend_error = if envelope.id.is_empty() {
        serde_json::from_str::<BackendErrorEnvelope>(body)
            .map(|wrapped| wrapped.error)
            .or_else(|_| serde_json::from_str::<BackendError>(body))
            .ok()
            .filter(|error| !error.message.is_empty())
    } else {
        None
    };

    let data: T = serde_json::from_str(body)
        .map_err(|err| DispatchError::decode(format!("payload decode failed: {err}")))?;

    Ok(Reply {
        id: envelope.id,
        object: envelope.object,
        created: envelope.created,
        model: envelope.model,
        data,
        backend_error,
    })
}
