//! Two-phase turn orchestration over the dispatcher and tool registry.

use std::sync::Arc;

use bdispatch::{
    ChatChoice, ChatPayload, CompletionDispatcher, CompletionRequest, FinishReason, Message, Reply,
};
use btooling::ToolRegistry;

use crate::{ChatError, ConversationHistory, Turn};

/// Runs one conversational turn against a history.
///
/// Phase one sends the flattened history plus the new user message, with the
/// registry's candidate tools attached when any trigger matched. If the
/// backend finishes with tool calls, every requested call is invoked in the
/// backend's order and a second request is sent carrying the assistant
/// message with its calls plus one tool result per call; that round sends no
/// tools, so the backend must answer in text. Exactly two sends happen in a
/// tool round and one otherwise.
///
/// The turn commits to the history only after the final answer arrives; any
/// failure along the way leaves the history untouched.
#[derive(Clone)]
pub struct TurnOrchestrator {
    dispatcher: Arc<CompletionDispatcher>,
    registry: Arc<ToolRegistry>,
}

impl TurnOrchestrator {
    pub fn new(dispatcher: Arc<CompletionDispatcher>, registry: Arc<ToolRegistry>) -> Self {
        Self {
            dispatcher,
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub async fn run(
        &self,
        history: &ConversationHistory,
        content: &str,
    ) -> Result<String, ChatError> {
        if content.trim().is_empty() {
            return Err(ChatError::invalid_request("content must not be empty"));
        }

        let question = Message::user(content);
        let mut outbound = history.snapshot();
        outbound.push(question.clone());

        let candidates = self.registry.matches(content);
        let mut request = CompletionRequest::new(outbound.clone());
        if !candidates.is_empty() {
            tracing::debug!(candidates = candidates.len(), "attaching matched tools");
            request = request.with_tools(candidates);
        }

        let choice = first_choice(self.dispatcher.send_chat(request).await?)?;

        let answers = if choice.finish_reason() == FinishReason::ToolCalls
            && !choice.message.tool_calls.is_empty()
        {
            self.run_tool_round(outbound, choice.message).await?
        } else {
            vec![choice.message]
        };

        let answer_text = answers
            .last()
            .map(|message| message.text().to_string())
            .unwrap_or_default();

        history.append(Turn::new(question, answers));
        Ok(answer_text)
    }

    /// Invokes every requested call, then asks the backend to finish the
    /// turn with the results in context.
    async fn run_tool_round(
        &self,
        outbound: Vec<Message>,
        assistant: Message,
    ) -> Result<Vec<Message>, ChatError> {
        let mut tool_results = Vec::with_capacity(assistant.tool_calls.len());
        for call in &assistant.tool_calls {
            tracing::debug!(tool = %call.function.name, call_id = %call.id, "invoking tool");
            let result = self
                .registry
                .invoke(&call.function.name, &call.id, &call.function.arguments)
                .await?;
            tool_results.push(result);
        }

        let mut second = outbound;
        second.push(assistant.clone());
        second.extend(tool_results.iter().cloned());

        let final_choice = first_choice(
            self.dispatcher
                .send_chat(CompletionRequest::new(second))
                .await?,
        )?;

        let mut answers = Vec::with_capacity(tool_results.len() + 2);
        answers.push(assistant);
        answers.append(&mut tool_results);
        answers.push(final_choice.message);
        Ok(answers)
    }
}

fn first_choice(reply: Reply<ChatPayload>) -> Result<ChatChoice, ChatError> {
    if let Some(backend_error) = reply.backend_error {
        return Err(ChatError::dispatch(format!(
            "backend reported an error: {}",
            backend_error.message
        )));
    }

    reply
        .data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::empty_choices("backend returned no choices"))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use bdispatch::{
        CompletionBody, CompletionTransport, DispatchError, DispatchFuture, DispatcherConfig,
        EndpointConfig, EndpointTarget, FunctionParameters, FunctionSpec, HttpReply, Role,
    };
    use btooling::{FunctionCallback, ToolError, ToolRegistration};

    use super::*;
    use crate::ChatErrorKind;

    struct ScriptedTransport {
        replies: Mutex<VecDeque<Result<HttpReply, DispatchError>>>,
        bodies: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<HttpReply, DispatchError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                bodies: Mutex::new(Vec::new()),
            }
        }

        fn bodies(&self) -> Vec<String> {
            self.bodies.lock().expect("bodies lock").clone()
        }
    }

    impl CompletionTransport for ScriptedTransport {
        fn post<'a>(
            &'a self,
            _target: &'a EndpointTarget,
            _api_key: &'a str,
            body: &'a CompletionBody,
        ) -> DispatchFuture<'a, Result<HttpReply, DispatchError>> {
            Box::pin(async move {
                self.bodies
                    .lock()
                    .expect("bodies lock")
                    .push(serde_json::to_string(body).expect("body should serialize"));

                self.replies
                    .lock()
                    .expect("replies lock")
                    .pop_front()
                    .expect("transport script exhausted")
            })
        }
    }

    fn ok(body: &str) -> Result<HttpReply, DispatchError> {
        Ok(HttpReply {
            status: 200,
            body: body.to_string(),
        })
    }

    fn plain_reply(content: &str) -> String {
        format!(
            r#"{{"id":"chatcmpl-1","object":"chat.completion","created":1723400000,"model":"gpt-4o-mini","choices":[{{"index":0,"message":{{"role":"assistant","content":"{content}"}},"finish_reason":"stop"}}]}}"#
        )
    }

    fn tool_call_reply() -> String {
        r#"{"id":"chatcmpl-2","object":"chat.completion","created":1723400000,"model":"gpt-4o-mini","choices":[{"index":0,"message":{"role":"assistant","content":null,"tool_calls":[{"id":"call_1","type":"function","function":{"name":"get_weather","arguments":"{\"city\":\"泉州\"}"}}]},"finish_reason":"tool_calls"}]}"#
            .to_string()
    }

    fn orchestrator(
        transport: Arc<ScriptedTransport>,
        registry: Arc<ToolRegistry>,
    ) -> TurnOrchestrator {
        let config = DispatcherConfig::default()
            .with_endpoint(EndpointConfig::new("https://api.example.com").with_api_key("key"));
        let dispatcher = Arc::new(CompletionDispatcher::new(config, transport));
        TurnOrchestrator::new(dispatcher, registry)
    }

    fn weather_registry() -> Arc<ToolRegistry> {
        let registry = ToolRegistry::new();
        registry.register(
            ToolRegistration::new(
                FunctionSpec {
                    name: "get_weather".to_string(),
                    description: "Looks up current weather for a city".to_string(),
                    parameters: FunctionParameters::object(),
                },
                FunctionCallback::new(|_args| async move { Ok("{\"temp\":\"27\"}".to_string()) }),
            )
            .with_keywords(["天气"]),
        );
        Arc::new(registry)
    }

    #[tokio::test]
    async fn plain_round_issues_one_send_and_commits_one_answer() {
        let transport = Arc::new(ScriptedTransport::new(vec![ok(&plain_reply("hello back"))]));
        let orchestrator = orchestrator(transport.clone(), Arc::new(ToolRegistry::new()));
        let history = ConversationHistory::new(Some("be brief".to_string()), 10);

        let answer = orchestrator
            .run(&history, "hello")
            .await
            .expect("turn should succeed");

        assert_eq!(answer, "hello back");
        assert_eq!(history.len(), 1);
        assert_eq!(transport.bodies().len(), 1);
        // no matched tools, so the body must not offer any
        assert!(!transport.bodies()[0].contains("\"tools\""));
    }

    #[tokio::test]
    async fn tool_round_issues_two_sends_and_commits_three_answers() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            ok(&tool_call_reply()),
            ok(&plain_reply("27 degrees in Quanzhou")),
        ]));
        let orchestrator = orchestrator(transport.clone(), weather_registry());
        let history = ConversationHistory::new(Some("be brief".to_string()), 10);

        let answer = orchestrator
            .run(&history, "今天泉州的天气怎么样")
            .await
            .expect("turn should succeed");

        assert_eq!(answer, "27 degrees in Quanzhou");

        let bodies = transport.bodies();
        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].contains("\"tools\""));
        assert!(bodies[0].contains("\"tool_choice\":\"auto\""));
        // second round carries the call and its result but offers no tools
        assert!(bodies[1].contains("\"tool_calls\""));
        assert!(bodies[1].contains("{\\\"temp\\\":\\\"27\\\"}"));
        assert!(!bodies[1].contains("\"tools\""));

        let messages = history.snapshot();
        // system + question + (assistant-with-calls, tool result, final)
        assert_eq!(messages.len(), 5);
        assert_eq!(messages[2].role, Role::Assistant);
        assert!(!messages[2].tool_calls.is_empty());
        assert_eq!(messages[3].role, Role::Tool);
        assert_eq!(messages[3].tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(messages[4].text(), "27 degrees in Quanzhou");
    }

    #[tokio::test]
    async fn failing_callback_commits_nothing() {
        let registry = ToolRegistry::new();
        registry.register(
            ToolRegistration::new(
                FunctionSpec {
                    name: "get_weather".to_string(),
                    description: "Looks up current weather for a city".to_string(),
                    parameters: FunctionParameters::object(),
                },
                FunctionCallback::new(|_args| async move {
                    Err(ToolError::invocation("upstream service down"))
                }),
            )
            .with_keywords(["天气"]),
        );

        let transport = Arc::new(ScriptedTransport::new(vec![ok(&tool_call_reply())]));
        let orchestrator = orchestrator(transport.clone(), Arc::new(registry));
        let history = ConversationHistory::new(None, 10);

        let error = orchestrator
            .run(&history, "今天泉州的天气怎么样")
            .await
            .expect_err("turn should fail");

        assert_eq!(error.kind, ChatErrorKind::Tooling);
        assert!(history.is_empty());
        assert_eq!(transport.bodies().len(), 1);
    }

    #[tokio::test]
    async fn empty_choices_abort_the_turn_uncommitted() {
        let body = r#"{"id":"chatcmpl-3","object":"chat.completion","created":1723400000,"model":"gpt-4o-mini","choices":[]}"#;
        let transport = Arc::new(ScriptedTransport::new(vec![ok(body)]));
        let orchestrator = orchestrator(transport, Arc::new(ToolRegistry::new()));
        let history = ConversationHistory::new(None, 10);

        let error = orchestrator
            .run(&history, "hello")
            .await
            .expect_err("turn should fail");

        assert_eq!(error.kind, ChatErrorKind::EmptyChoices);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn embedded_backend_error_aborts_the_turn() {
        let body = r#"{"error":{"message":"model overloaded","type":"server_error"},"choices":[]}"#;
        let transport = Arc::new(ScriptedTransport::new(vec![ok(body)]));
        let orchestrator = orchestrator(transport, Arc::new(ToolRegistry::new()));
        let history = ConversationHistory::new(None, 10);

        let error = orchestrator
            .run(&history, "hello")
            .await
            .expect_err("turn should fail");

        assert_eq!(error.kind, ChatErrorKind::Dispatch);
        assert!(error.message.contains("model overloaded"));
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn blank_content_is_rejected_before_any_send() {
        let transport = Arc::new(ScriptedTransport::new(Vec::new()));
        let orchestrator = orchestrator(transport.clone(), Arc::new(ToolRegistry::new()));
        let history = ConversationHistory::new(None, 10);

        let error = orchestrator
            .run(&history, "   ")
            .await
            .expect_err("turn should fail");

        assert_eq!(error.kind, ChatErrorKind::InvalidRequest);
        assert!(transport.bodies().is_empty());
    }
}
