//! Client for the request service.

use crate::execution_context::ExecutionContext;
use crate::http_client::{HttpClient, ReqwestHttpClient};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Bound on a single round trip to the service.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Anything that can turn a query into a command.
///
/// The orchestrator depends on this instead of the network so its modes can
/// be exercised against canned commands.
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Returns the generated command. Empty output counts as failure.
    async fn fetch_command(&self, query: &str, context: &ExecutionContext) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    query: &'a str,
    context: &'a ExecutionContext,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    command: String,
}

/// Talks to the request service over HTTP.
pub struct ServiceClient {
    endpoint: String,
    api_key: Option<String>,
    http: Arc<dyn HttpClient>,
}

impl ServiceClient {
    /// Client using reqwest with the fixed request timeout.
    pub fn new(endpoint: &str, api_key: Option<&str>) -> Result<Self> {
        let http = ReqwestHttpClient::with_timeout(REQUEST_TIMEOUT)?;
        Ok(Self::with_http_client(endpoint, api_key, Arc::new(http)))
    }

    pub fn with_http_client(
        endpoint: &str,
        api_key: Option<&str>,
        http: Arc<dyn HttpClient>,
    ) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: api_key.map(str::to_string),
            http,
        }
    }
}

#[async_trait]
impl CommandSource for ServiceClient {
    async fn fetch_command(&self, query: &str, context: &ExecutionContext) -> Result<String> {
        let body = serde_json::to_value(GenerateRequest { query, context })?;

        let mut headers = vec![("Content-Type", "application/json")];
        if let Some(api_key) = &self.api_key {
            headers.push(("X-API-Key", api_key.as_str()));
        }

        info!("Requesting command from {}", self.endpoint);
        let response = self
            .http
            .post_json(&self.endpoint, &headers, &body)
            .await
            .context("Request to the command service failed")?;

        if !response.is_success() {
            debug!("Service error body: {}", response.body);
            return Err(anyhow!("HTTP Error {}", response.status));
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&response.body).context("JSON Error: unexpected response body")?;

        if parsed.command.trim().is_empty() {
            return Err(anyhow!("No command generated"));
        }
        Ok(parsed.command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::tests::MockHttpClient;

    fn client(http: MockHttpClient, api_key: Option<&str>) -> (ServiceClient, Arc<MockHttpClient>) {
        let http = Arc::new(http);
        let client = ServiceClient::with_http_client(
            "https://svc.test/generate",
            api_key,
            http.clone(),
        );
        (client, http)
    }

    fn context() -> ExecutionContext {
        ExecutionContext::new("linux", "/work")
    }

    #[tokio::test]
    async fn test_fetch_command_sends_envelope() {
        let (client, http) = client(
            MockHttpClient::responding(200, r#"{"command": "ls -la", "query": "list"}"#),
            Some("key-123"),
        );

        let command = client.fetch_command("list", &context()).await.unwrap();

        assert_eq!(command, "ls -la");
        let requests = http.requests.lock().unwrap();
        let (url, headers, body) = &requests[0];
        assert_eq!(url, "https://svc.test/generate");
        assert!(headers.contains(&("X-API-Key".to_string(), "key-123".to_string())));
        assert_eq!(
            *body,
            serde_json::json!({"query": "list", "context": {"os": "linux", "cwd": "/work"}})
        );
    }

    #[tokio::test]
    async fn test_no_api_key_header_without_key() {
        let (client, http) = client(MockHttpClient::responding(200, r#"{"command": "pwd"}"#), None);

        client.fetch_command("where am i", &context()).await.unwrap();

        let requests = http.requests.lock().unwrap();
        assert!(requests[0].1.iter().all(|(name, _)| name != "X-API-Key"));
    }

    #[tokio::test]
    async fn test_error_status_fails() {
        let (client, _) = client(
            MockHttpClient::responding(500, r#"{"error": "Failed to generate shell command"}"#),
            None,
        );

        let err = client.fetch_command("x", &context()).await.unwrap_err();

        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn test_empty_command_fails() {
        let (client, _) = client(MockHttpClient::responding(200, r#"{"command": "  "}"#), None);

        assert!(client.fetch_command("x", &context()).await.is_err());
    }

    #[tokio::test]
    async fn test_undecodable_body_fails() {
        let (client, _) = client(MockHttpClient::responding(200, "<html>"), None);

        assert!(client.fetch_command("x", &context()).await.is_err());
    }

    #[tokio::test]
    async fn test_transport_failure_fails() {
        let (client, _) = client(MockHttpClient::new(vec![]), None);

        assert!(client.fetch_command("x", &context()).await.is_err());
    }
}
