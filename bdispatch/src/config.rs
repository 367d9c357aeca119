//! Endpoint and credential configuration, immutable after construction.

use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";
pub const DEFAULT_ENDPOINT_PATH: &str = "/v1/chat/completions";
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Request timeout floor. Values configured below this are raised to it.
pub const MIN_TIMEOUT_SECS: u64 = 5;

/// Api key held in memory. Zeroed on drop and redacted in `Debug` so secrets
/// never leak through logs or panic output.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString {
    value: String,
}

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn expose(&self) -> &str {
        self.value.as_str()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        unsafe {
            self.value.as_mut_vec().fill(0);
        }
    }
}

/// One backend target: a base URL, the api keys to try against it in order,
/// and an optional proxy URL applied to every request it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_keys: Vec<SecretString>,
    pub proxy: Option<String>,
}

impl EndpointConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_keys: Vec::new(),
            proxy: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_keys.push(SecretString::new(api_key));
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

/// Full dispatcher configuration. Read-only after load; the dispatcher never
/// mutates it, so no synchronization is required around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherConfig {
    pub model: String,
    pub content_type: String,
    pub endpoint_path: String,
    pub endpoints: Vec<EndpointConfig>,
    pub timeout: Duration,
}

impl DispatcherConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            endpoint_path: DEFAULT_ENDPOINT_PATH.to_string(),
            endpoints: Vec::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_endpoint_path(mut self, endpoint_path: impl Into<String>) -> Self {
        self.endpoint_path = endpoint_path.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: EndpointConfig) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    /// Sets the per-request timeout, raising it to [`MIN_TIMEOUT_SECS`] when
    /// configured below the floor.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs.max(MIN_TIMEOUT_SECS));
        self
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
    }
}
