//! Credential/endpoint failover dispatch for completion requests.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crate::transport::{CompletionTransport, EndpointTarget, HttpCompletionTransport};
use crate::wire::{
    ChatPayload, CompletionBody, CompletionRequest, IncrementalPayload, Reply, decode_reply,
};

/// Sends completion requests across the configured endpoints, trying each
/// endpoint's api keys in order until one attempt returns HTTP 200.
///
/// There is no backoff anywhere in the loop: moving to the next credential or
/// endpoint is the retry strategy. A classified failure (401, 405, any other
/// non-200) is remembered and only surfaced once every pair is exhausted; if
/// no endpoint ever produced a response at all the distinct `EmptyResult`
/// error is returned instead, since that indicates total misconfiguration
/// rather than transient failure.
pub struct CompletionDispatcher {
    config: DispatcherConfig,
    targets: Vec<EndpointTarget>,
    transport: Arc<dyn CompletionTransport>,
}

impl CompletionDispatcher {
    pub fn new(config: DispatcherConfig, transport: Arc<dyn CompletionTransport>) -> Self {
        let targets = config
            .endpoints
            .iter()
            .map(|endpoint| EndpointTarget::new(endpoint.base_url.clone(), &config.endpoint_path))
            .collect();

        Self {
            config,
            targets,
            transport,
        }
    }

    /// Convenience constructor wiring up the reqwest transport.
    pub fn from_config(config: DispatcherConfig) -> Result<Self, DispatchError> {
        let transport = Arc::new(HttpCompletionTransport::from_config(&config)?);
        Ok(Self::new(config, transport))
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Full-message completion round-trip.
    pub async fn send_chat(
        &self,
        request: CompletionRequest,
    ) -> Result<Reply<ChatPayload>, DispatchError> {
        self.send(request).await
    }

    /// Delta-shaped completion round-trip for stream-mode payloads.
    pub async fn send_incremental(
        &self,
        request: CompletionRequest,
    ) -> Result<Reply<IncrementalPayload>, DispatchError> {
        self.send(request).await
    }

    pub async fn send<T: DeserializeOwned>(
        &self,
        request: CompletionRequest,
    ) -> Result<Reply<T>, DispatchError> {
        let body = CompletionBody::build(self.config.model.clone(), request);

        // transport errors are only logged; a classified failure (one where
        // an HTTP status was obtained) always outranks them at the end
        let mut last_failure: Option<DispatchError> = None;

        for (endpoint, target) in self.config.endpoints.iter().zip(&self.targets) {
            for api_key in &endpoint.api_keys {
                match self.transport.post(target, api_key.expose(), &body).await {
                    Err(error) => {
                        tracing::warn!(
                            endpoint = %target.base_url,
                            error = %error,
                            "transport failure, moving to next credential"
                        );
                    }
                    Ok(reply) => {
                        match reply.status {
                            200 => return decode_reply(&reply.body),
                            401 => {
                                let error = DispatchError::authorization("api key rejected")
                                    .with_endpoint(target.base_url.clone())
                                    .with_status(401);
                                tracing::warn!(endpoint = %target.base_url, "authorization failure");
                                last_failure = Some(error);
                            }
                            405 => {
                                let error = DispatchError::method_not_allowed(
                                    "endpoint rejected the request method",
                                )
                                .with_endpoint(target.base_url.clone())
                                .with_status(405);
                                tracing::warn!(endpoint = %target.base_url, "method not allowed");
                                last_failure = Some(error);
                            }
                            status => {
                                let error = DispatchError::unexpected_status(format!(
                                    "unexpected status {status}"
                                ))
                                .with_endpoint(target.base_url.clone())
                                .with_status(status);
                                tracing::warn!(
                                    endpoint = %target.base_url,
                                    status,
                                    "unexpected status"
                                );
                                last_failure = Some(error);
                            }
                        }
                    }
                }
            }
        }

        match last_failure {
            Some(error) => Err(error),
            None => Err(DispatchError::empty_result(
                "no configured endpoint produced a response",
            )),
        }
    }
}
