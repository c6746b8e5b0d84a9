//! The hosted text-generation backend, seen as a narrow capability.
//!
//! A backend turns a system text plus a user text into raw generated text,
//! or fails with a classified [`ErrorKind`]. Retrying is not its concern;
//! see [`crate::invoker`].

use crate::http_client::HttpClient;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Classification of a backend failure. Drives the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Capacity limit hit; retry with exponential backoff.
    Throttled,
    /// The request itself is malformed; never retried.
    InvalidRequest,
    /// Network or service hiccup; retry with linear backoff.
    Transient,
    /// Misconfiguration or exhausted options; never retried.
    Fatal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Throttled => "throttled",
            ErrorKind::InvalidRequest => "invalid request",
            ErrorKind::Transient => "transient",
            ErrorKind::Fatal => "fatal",
        };
        f.write_str(name)
    }
}

/// A single failed backend call.
#[derive(Debug, Clone, Error)]
#[error("{kind} backend error: {message}")]
pub struct BackendError {
    pub kind: ErrorKind,
    pub message: String,
}

impl BackendError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Generates text for one prompt. One call, one attempt.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn generate(&self, system_text: &str, user_text: &str) -> Result<String, BackendError>;
}

/// Everything the hosted backend needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl BackendConfig {
    pub const DEFAULT_URL: &'static str = "https://api.anthropic.com/v1/messages";
    pub const DEFAULT_MODEL_ID: &'static str = "claude-3-haiku-20240307";

    /// Configuration with the fixed sampling parameters.
    pub fn new(url: &str, api_key: &str, model_id: &str) -> Self {
        Self {
            url: url.to_string(),
            api_key: api_key.to_string(),
            model_id: model_id.to_string(),
            max_tokens: 200,
            temperature: 0.1,
            top_p: 0.9,
        }
    }
}

/// Maps an HTTP status from the backend to a failure class.
pub fn classify_status(status: u16) -> ErrorKind {
    match status {
        429 | 529 => ErrorKind::Throttled,
        400 | 413 | 422 => ErrorKind::InvalidRequest,
        401 | 403 | 404 => ErrorKind::Fatal,
        _ => ErrorKind::Transient,
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    #[serde(default)]
    message: String,
}

/// Backend speaking the Anthropic Messages API.
pub struct AnthropicBackend {
    config: BackendConfig,
    http: Arc<dyn HttpClient>,
}

impl AnthropicBackend {
    pub fn new(config: BackendConfig, http: Arc<dyn HttpClient>) -> Self {
        Self { config, http }
    }

    fn request_body(&self, system_text: &str, user_text: &str) -> serde_json::Value {
        json!({
            "model": self.config.model_id,
            "max_tokens": self.config.max_tokens,
            "system": system_text,
            "messages": [
                {
                    "role": "user",
                    "content": user_text
                }
            ],
            "temperature": self.config.temperature,
            "top_p": self.config.top_p
        })
    }
}

#[async_trait]
impl Backend for AnthropicBackend {
    async fn generate(&self, system_text: &str, user_text: &str) -> Result<String, BackendError> {
        let body = self.request_body(system_text, user_text);
        let headers = [
            ("x-api-key", self.config.api_key.as_str()),
            ("anthropic-version", "2023-06-01"),
            ("content-type", "application/json"),
        ];

        let response = self
            .http
            .post_json(&self.config.url, &headers, &body)
            .await
            .map_err(|e| BackendError::new(ErrorKind::Transient, format!("transport: {e:#}")))?;

        if !response.is_success() {
            let kind = classify_status(response.status);
            let detail = serde_json::from_str::<ErrorEnvelope>(&response.body)
                .map(|envelope| {
                    format!("{}: {}", envelope.error.error_type, envelope.error.message)
                })
                .unwrap_or_else(|_| response.body.clone());
            warn!("Backend returned status {} ({})", response.status, kind);
            return Err(BackendError::new(
                kind,
                format!("status {}: {}", response.status, detail),
            ));
        }

        let parsed: MessagesResponse = serde_json::from_str(&response.body).map_err(|e| {
            BackendError::new(ErrorKind::Transient, format!("undecodable response: {e}"))
        })?;

        let text = parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| {
                BackendError::new(ErrorKind::Transient, "response had no text content")
            })?;

        debug!("Backend returned {} bytes of text", text.len());
        Ok(text)
    }
}

/// Offline backend for running the service without credentials.
///
/// Picks a command from the user text by keyword.
pub struct MockBackend;

impl MockBackend {
    pub fn new() -> Self {
        Self
    }

    pub fn mock_command(&self, user_text: &str) -> String {
        let request = user_text
            .lines()
            .find_map(|line| line.strip_prefix("Request: "))
            .unwrap_or(user_text)
            .to_lowercase();

        let command = if request.contains("hidden") {
            "ls -d .*"
        } else if request.contains("mp3") {
            "find . -name \"*.mp3\""
        } else if request.contains("disk")
            || request.contains("size")
            || request.contains("large")
        {
            "du -sh * | sort -hr | head -10"
        } else if request.contains("port") {
            "nc -zv localhost 8080 2>&1 || echo \"Port closed\""
        } else if request.contains("compress") || request.contains("archive") {
            "tar -czf archive.tar.gz ."
        } else if request.contains("replace") {
            "find . -type f -exec sed -i 's/foo/bar/g' {} \\;"
        } else if request.contains("sort") {
            "sort -t, -k2,2n data.csv"
        } else if request.contains("list") || request.contains("files") {
            "ls -la"
        } else {
            "echo \"No matching command\""
        };
        command.to_string()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn generate(&self, _system_text: &str, user_text: &str) -> Result<String, BackendError> {
        Ok(self.mock_command(user_text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::HttpResponse;
    use crate::http_client::tests::MockHttpClient;
    use anyhow::anyhow;

    fn backend(http: MockHttpClient) -> (AnthropicBackend, Arc<MockHttpClient>) {
        let http = Arc::new(http);
        let backend = AnthropicBackend::new(
            BackendConfig::new("https://backend.test/v1/messages", "sk-test", "test-model"),
            http.clone(),
        );
        (backend, http)
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(429), ErrorKind::Throttled);
        assert_eq!(classify_status(529), ErrorKind::Throttled);
        assert_eq!(classify_status(400), ErrorKind::InvalidRequest);
        assert_eq!(classify_status(401), ErrorKind::Fatal);
        assert_eq!(classify_status(404), ErrorKind::Fatal);
        assert_eq!(classify_status(500), ErrorKind::Transient);
        assert_eq!(classify_status(503), ErrorKind::Transient);
        assert_eq!(classify_status(418), ErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_generate_extracts_text_and_sends_parameters() {
        let http = MockHttpClient::responding(
            200,
            r#"{"content":[{"type":"text","text":"ls -la"}]}"#,
        );
        let (backend, http) = backend(http);

        let text = backend.generate("system", "user").await.unwrap();

        assert_eq!(text, "ls -la");
        let requests = http.requests.lock().unwrap();
        let (url, headers, body) = &requests[0];
        assert_eq!(url, "https://backend.test/v1/messages");
        assert!(headers.contains(&("x-api-key".to_string(), "sk-test".to_string())));
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], 200);
        assert_eq!(body["system"], "system");
        assert_eq!(body["messages"][0]["content"], "user");
        assert!(body["temperature"].as_f64().unwrap() < 0.2);
    }

    #[tokio::test]
    async fn test_generate_classifies_throttling() {
        let (backend, _) = backend(MockHttpClient::responding(
            429,
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
        ));

        let err = backend.generate("s", "u").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Throttled);
        assert!(err.message.contains("rate_limit_error"));
    }

    #[tokio::test]
    async fn test_generate_classifies_invalid_request() {
        let (backend, _) = backend(MockHttpClient::responding(400, "bad"));

        let err = backend.generate("s", "u").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn test_transport_failure_is_transient() {
        let (backend, _) = backend(MockHttpClient::new(vec![Err(anyhow!("connection reset"))]));

        let err = backend.generate("s", "u").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Transient);
        assert!(err.message.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_transient() {
        let (backend, _) = backend(MockHttpClient::new(vec![Ok(HttpResponse::new(200, "<html>"))]));

        let err = backend.generate("s", "u").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_empty_content_is_transient() {
        let (backend, _) = backend(MockHttpClient::responding(200, r#"{"content":[]}"#));

        let err = backend.generate("s", "u").await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Transient);
    }

    #[tokio::test]
    async fn test_mock_backend_picks_by_keyword() {
        let backend = MockBackend::new();
        let user = "Convert this request into a shell command:\n\nRequest: find MP3 files\n";

        let text = backend.generate("s", user).await.unwrap();

        assert_eq!(text, "find . -name \"*.mp3\"");
    }

    #[test]
    fn test_mock_backend_fallback() {
        assert_eq!(
            MockBackend::new().mock_command("Request: something unusual"),
            "echo \"No matching command\""
        );
    }
}
