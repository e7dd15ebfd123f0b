//! HTTP foundation for the hosting platform API
//!
//! This module provides a shared HTTP client with:
//! - Configurable timeout, User-Agent and bearer token
//! - JSON request/response helpers
//! - Translation of every failure into a [`RemoteError`]
//!
//! Retrying is not done here; callers wrap operations in
//! [`retry_with_backoff`](crate::resilience::retry_with_backoff).

use crate::error::{NetworkFault, RemoteError};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::error::Error as _;
use std::time::Duration;
use tracing::debug;

/// Default timeout for HTTP requests (30 seconds)
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default User-Agent header
const DEFAULT_USER_AGENT: &str = concat!("arm/", env!("CARGO_PKG_VERSION"));

/// Default API endpoint
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Error payload returned by the API
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// HTTP client wrapper bound to one API endpoint
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a client for the default endpoint
    pub fn new(token: Option<String>) -> Result<Self, RemoteError> {
        Self::with_config(DEFAULT_API_URL, token, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a client for another endpoint (e.g. GitHub Enterprise)
    pub fn with_base_url(base_url: &str, token: Option<String>) -> Result<Self, RemoteError> {
        Self::with_config(base_url, token, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT)
    }

    /// Create a client with custom configuration
    pub fn with_config(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| RemoteError::new(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Returns true if requests carry a token
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let builder = self
            .client
            .request(method, url)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, RemoteError> {
        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&text)
            .ok()
            .and_then(|b| b.message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(RemoteError::status(status.as_u16(), message))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, RemoteError> {
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteError::new(format!("invalid response: {}", e)))
    }

    /// GET a JSON document
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let response = self.send(self.request(Method::GET, path).query(query)).await?;
        Self::parse(response).await
    }

    /// Send a JSON body and parse the JSON reply
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, RemoteError> {
        let response = self.send(self.request(method, path).json(body)).await?;
        Self::parse(response).await
    }

    /// Send a JSON body, discarding the reply
    pub async fn send_json_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<(), RemoteError> {
        self.send(self.request(method, path).json(body)).await?;
        Ok(())
    }
}

/// Map a transport-level failure onto a fault code
fn transport_error(e: reqwest::Error) -> RemoteError {
    let mut chain = String::new();
    let mut source = e.source();
    while let Some(s) = source {
        chain.push_str(&s.to_string().to_lowercase());
        chain.push(' ');
        source = s.source();
    }

    let fault = if e.is_timeout() {
        Some(NetworkFault::TimedOut)
    } else if chain.contains("dns") || chain.contains("lookup") {
        Some(NetworkFault::HostNotFound)
    } else if e.is_connect() || e.is_request() {
        Some(NetworkFault::ConnectionReset)
    } else {
        None
    };

    let err = RemoteError::new(e.to_string());
    match fault {
        Some(fault) => err.with_fault(fault),
        None => err,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = HttpClient::new(Some("ghp_test".to_string())).unwrap();
        assert!(client.is_authenticated());
        assert_eq!(client.base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_empty_token_is_anonymous() {
        let client = HttpClient::new(Some(String::new())).unwrap();
        assert!(!client.is_authenticated());
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = HttpClient::with_config(
            "https://ghe.example.com/api/v3/",
            None,
            DEFAULT_TIMEOUT,
            DEFAULT_USER_AGENT,
        )
        .unwrap();
        assert_eq!(client.base_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn test_user_agent_has_version() {
        assert!(DEFAULT_USER_AGENT.starts_with("arm/"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_fault() {
        let client = HttpClient::with_config(
            "http://127.0.0.1:1",
            None,
            Duration::from_secs(2),
            DEFAULT_USER_AGENT,
        )
        .unwrap();
        let err = client
            .get_json::<serde_json::Value>("/rate_limit", &[])
            .await
            .unwrap_err();
        assert!(err.status.is_none());
        assert!(err.fault.is_some());
    }
}
