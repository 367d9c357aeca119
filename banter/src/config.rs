//! YAML agent configuration.
//!
//! ```rust
//! use banter::AgentConfig;
//!
//! let config = AgentConfig::from_yaml_str(
//!     "endpoints:\n  - url: https://api.openai.com\n    api_keys: [sk-test]\n",
//! )
//! .expect("config should parse");
//!
//! assert_eq!(config.model, "gpt-4o-mini");
//! assert_eq!(config.endpoints.len(), 1);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::Duration;

use bdispatch::{
    DEFAULT_CONTENT_TYPE, DEFAULT_ENDPOINT_PATH, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
    DispatcherConfig, EndpointConfig,
};
use bsession::DEFAULT_MAX_TURNS;
use serde::Deserialize;

pub const DEFAULT_SESSION_TTL_MINUTES: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    Io,
    Parse,
    Invalid,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Io, message)
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Parse, message)
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::Invalid, message)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ConfigError {}

/// One backend endpoint as it appears in the YAML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointEntry {
    pub url: String,
    #[serde(default)]
    pub api_keys: Vec<String>,
    #[serde(default)]
    pub proxy: Option<String>,
}

/// Agent configuration as loaded from YAML. Every field except `endpoints`
/// has a default, so a minimal file only lists the backends and their keys.
/// Floors (timeout, session TTL, history bound) are applied downstream when
/// the runtime pieces are constructed from this.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,
    pub endpoints: Vec<EndpointEntry>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_history")]
    pub max_history: usize,
    #[serde(default = "default_session_ttl_minutes")]
    pub session_ttl_minutes: u64,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

fn default_endpoint_path() -> String {
    DEFAULT_ENDPOINT_PATH.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_history() -> usize {
    DEFAULT_MAX_TURNS
}

fn default_session_ttl_minutes() -> u64 {
    DEFAULT_SESSION_TTL_MINUTES
}

impl AgentConfig {
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: AgentConfig = serde_yaml::from_str(contents)
            .map_err(|err| ConfigError::parse(format!("config parse failed: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|err| {
            ConfigError::io(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_yaml_str(&contents)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoints.is_empty() {
            return Err(ConfigError::invalid("at least one endpoint is required"));
        }
        for endpoint in &self.endpoints {
            if endpoint.url.trim().is_empty() {
                return Err(ConfigError::invalid("endpoint url must not be empty"));
            }
            if endpoint.api_keys.is_empty() {
                return Err(ConfigError::invalid(format!(
                    "endpoint {} has no api keys",
                    endpoint.url
                )));
            }
        }
        Ok(())
    }

    /// Lowers this configuration into the dispatcher's shape; the timeout
    /// floor is applied here.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        let mut config = DispatcherConfig::new(self.model.clone())
            .with_content_type(self.content_type.clone())
            .with_endpoint_path(self.endpoint_path.clone())
            .with_timeout_secs(self.timeout_secs);

        for entry in &self.endpoints {
            let mut endpoint = EndpointConfig::new(entry.url.clone());
            for api_key in &entry.api_keys {
                endpoint = endpoint.with_api_key(api_key.clone());
            }
            if let Some(proxy) = &entry.proxy {
                endpoint = endpoint.with_proxy(proxy.clone());
            }
            config = config.with_endpoint(endpoint);
        }

        config
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_minutes * 60)
    }
}
