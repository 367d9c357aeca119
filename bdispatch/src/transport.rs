//! Transport trait and the reqwest-based HTTP implementation.
//!
//! The trait is the seam tests script against: it turns one (endpoint, key)
//! attempt into either a raw status+body or a network error, and leaves all
//! status classification to the dispatcher.

use std::collections::HashMap;

use bcommon::BoxFuture;
use reqwest::Client;

use crate::config::DispatcherConfig;
use crate::error::DispatchError;
use crate::wire::CompletionBody;

pub type DispatchFuture<'a, T> = BoxFuture<'a, T>;

/// One resolved backend target: the configured base URL plus the full POST
/// URL with the completion path joined on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTarget {
    pub base_url: String,
    pub url: String,
}

impl EndpointTarget {
    pub fn new(base_url: impl Into<String>, endpoint_path: &str) -> Self {
        let base_url = base_url.into();
        let url = format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            endpoint_path.trim_start_matches('/')
        );
        Self { base_url, url }
    }
}

/// Raw outcome of a single HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

pub trait CompletionTransport: Send + Sync {
    fn post<'a>(
        &'a self,
        target: &'a EndpointTarget,
        api_key: &'a str,
        body: &'a CompletionBody,
    ) -> DispatchFuture<'a, Result<HttpReply, DispatchError>>;
}

/// HTTP transport holding one pre-built client per endpoint, because proxy
/// and timeout are client-level settings in reqwest.
#[derive(Debug, Clone)]
pub struct HttpCompletionTransport {
    clients: HashMap<String, Client>,
    content_type: String,
}

impl HttpCompletionTransport {
    pub fn from_config(config: &DispatcherConfig) -> Result<Self, DispatchError> {
        let mut clients = HashMap::new();
        for endpoint in &config.endpoints {
            let mut builder = Client::builder().timeout(config.timeout);
            if let Some(proxy) = &endpoint.proxy {
                let proxy = reqwest::Proxy::all(proxy).map_err(|err| {
                    DispatchError::network(format!("invalid proxy URL '{proxy}': {err}"))
                        .with_endpoint(endpoint.base_url.clone())
                })?;
                builder = builder.proxy(proxy);
            }

            let client = builder.build().map_err(|err| {
                DispatchError::network(format!("http client build failed: {err}"))
                    .with_endpoint(endpoint.base_url.clone())
            })?;
            clients.insert(endpoint.base_url.clone(), client);
        }

        Ok(Self {
            clients,
            content_type: config.content_type.clone(),
        })
    }
}

impl CompletionTransport for HttpCompletionTransport {
    fn post<'a>(
        &'a self,
        target: &'a EndpointTarget,
        api_key: &'a str,
        body: &'a CompletionBody,
    ) -> DispatchFuture<'a, Result<HttpReply, DispatchError>> {
        Box::pin(async move {
            let client = self.clients.get(&target.base_url).ok_or_else(|| {
                DispatchError::network("no client configured for endpoint")
                    .with_endpoint(target.base_url.clone())
            })?;

            let response = client
                .post(&target.url)
                .header(reqwest::header::CONTENT_TYPE, &self.content_type)
                .bearer_auth(api_key)
                .json(body)
                .send()
                .await
                .map_err(|err| {
                    DispatchError::network(err.to_string()).with_endpoint(target.base_url.clone())
                })?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|err| {
                DispatchError::network(format!("failed reading response body: {err}"))
                    .with_endpoint(target.base_url.clone())
                    .with_status(status)
            })?;

            Ok(HttpReply { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;

    #[test]
    fn endpoint_target_joins_base_url_and_path() {
        let target = EndpointTarget::new("https://api.example.com/", "/v1/chat/completions");
        assert_eq!(target.url, "https://api.example.com/v1/chat/completions");

        let target = EndpointTarget::new("https://api.example.com", "v1/chat/completions");
        assert_eq!(target.url, "https://api.example.com/v1/chat/completions");
    }

    #[test]
    fn transport_builds_one_client_per_endpoint() {
        let config = DispatcherConfig::default()
            .with_endpoint(EndpointConfig::new("https://one.example.com").with_api_key("k1"))
            .with_endpoint(EndpointConfig::new("https://two.example.com").with_api_key("k2"));

        let transport =
            HttpCompletionTransport::from_config(&config).expect("transport should build");
        assert_eq!(transport.clients.len(), 2);
    }

    #[test]
    fn transport_rejects_invalid_proxy_url() {
        let config = DispatcherConfig::default().with_endpoint(
            EndpointConfig::new("https://api.example.com")
                .with_api_key("k1")
                .with_proxy("not a url"),
        );

        let error =
            HttpCompletionTransport::from_config(&config).expect_err("proxy should be rejected");
        assert_eq!(error.kind, crate::DispatchErrorKind::Network);
        assert_eq!(error.endpoint.as_deref(), Some("https://api.example.com"));
    }
}
