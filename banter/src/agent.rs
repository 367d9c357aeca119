//! The `ChatAgent` facade wiring dispatcher, registry, and session store.

use std::sync::Arc;

use bdispatch::CompletionDispatcher;
use bsession::{ChatError, SessionHandle, SessionStore, TurnOrchestrator};
use btooling::{ToolRegistration, ToolRegistry};

use crate::{AgentConfig, ConfigError};

/// Single entry point for most applications. Every collaborator is injected;
/// nothing here is global, so two agents with different configurations can
/// coexist in one process.
///
/// ```rust,no_run
/// use banter::{AgentConfig, ChatAgent};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let config = AgentConfig::from_yaml_file("ai-cfg.yaml")?;
/// let agent = ChatAgent::from_config(&config)?;
///
/// let answer = agent.talk("session-1", "hello").await?;
/// println!("{answer}");
/// # Ok(())
/// # }
/// ```
pub struct ChatAgent {
    store: SessionStore,
    registry: Arc<ToolRegistry>,
}

impl ChatAgent {
    /// Builds the agent around an existing dispatcher. Used directly when the
    /// transport is custom; [`ChatAgent::from_config`] covers the common case.
    pub fn with_dispatcher(config: &AgentConfig, dispatcher: Arc<CompletionDispatcher>) -> Self {
        let registry = Arc::new(ToolRegistry::new());
        let orchestrator = TurnOrchestrator::new(dispatcher, Arc::clone(&registry));
        let store = SessionStore::new(
            orchestrator,
            config.system_prompt.clone(),
            config.max_history,
            config.session_ttl(),
        );

        Self { store, registry }
    }

    /// Convenience factory: HTTP transport from the configured endpoints,
    /// fresh registry, fresh store.
    pub fn from_config(config: &AgentConfig) -> Result<Self, ConfigError> {
        let dispatcher = CompletionDispatcher::from_config(config.dispatcher_config())
            .map_err(|err| ConfigError::invalid(format!("dispatcher setup failed: {err}")))?;
        Ok(Self::with_dispatcher(config, Arc::new(dispatcher)))
    }

    /// Makes a tool available to every session served by this agent.
    pub fn register_tool(&self, registration: ToolRegistration) {
        tracing::debug!(tool = registration.name(), "tool registered");
        self.registry.register(registration);
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.store
    }

    /// Runs one turn on the named session, creating the session on first use.
    pub async fn talk(&self, session_id: &str, content: &str) -> Result<String, ChatError> {
        self.store.talk_by_id(session_id, content).await
    }

    pub fn session(&self, session_id: &str) -> Option<Arc<SessionHandle>> {
        self.store.get(session_id)
    }

    /// Ends the named session; its history is dropped.
    pub fn close_session(&self, session_id: &str) {
        self.store.close(session_id);
    }
}
