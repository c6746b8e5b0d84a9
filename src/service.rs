//! Request service adapter.
//!
//! Turns an inbound JSON body into a response envelope by running
//! prompt building, backend invocation and sanitizing in order. The adapter
//! knows nothing about the HTTP framework hosting it; see [`crate::server`].

use crate::execution_context::{ExecutionContext, GenerationRequest, Query};
use crate::invoker::BackendInvoker;
use crate::prompt;
use crate::sanitizer::sanitize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

pub const QUERY_REQUIRED: &str = "Query parameter is required";
pub const GENERATION_FAILED: &str = "Failed to generate shell command";
pub const INTERNAL_ERROR: &str = "Internal server error";

/// Headers carried by every envelope.
pub const ENVELOPE_HEADERS: [(&str, &str); 2] = [
    ("Content-Type", "application/json"),
    ("Access-Control-Allow-Origin", "*"),
];

/// Headers carried by the cross-origin preflight response.
pub const PREFLIGHT_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "POST, GET, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type, Authorization"),
];

/// Framework-neutral HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    pub status: u16,
    pub headers: Vec<(&'static str, &'static str)>,
    pub body: String,
}

impl ServiceResponse {
    fn envelope(status: u16, body: Value) -> Self {
        Self {
            status,
            headers: ENVELOPE_HEADERS.to_vec(),
            body: body.to_string(),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        Self::envelope(status, json!({ "error": message }))
    }

    /// Empty 200 answer to a cross-origin preflight.
    pub fn preflight() -> Self {
        Self {
            status: 200,
            headers: PREFLIGHT_HEADERS.to_vec(),
            body: String::new(),
        }
    }
}

enum Rejection {
    MissingQuery,
    Malformed(String),
}

/// Validates requests and drives generation for each one.
pub struct RequestService {
    invoker: BackendInvoker,
}

impl RequestService {
    pub fn new(invoker: BackendInvoker) -> Self {
        Self { invoker }
    }

    /// Handles one request body and returns the envelope to send back.
    pub async fn handle(&self, body: &[u8]) -> ServiceResponse {
        let request = match parse_request(body) {
            Ok(request) => request,
            Err(Rejection::MissingQuery) => {
                info!("Rejecting request without a query");
                return ServiceResponse::error(400, QUERY_REQUIRED);
            }
            Err(Rejection::Malformed(reason)) => {
                error!("Error processing request: {}", reason);
                return ServiceResponse::error(500, INTERNAL_ERROR);
            }
        };

        info!("Processing query: {}", request.query.as_str());

        match self.generate(&request).await {
            Some(command) => ServiceResponse::envelope(
                200,
                json!({
                    "command": command,
                    "query": request.query.as_str(),
                }),
            ),
            None => ServiceResponse::error(500, GENERATION_FAILED),
        }
    }

    /// Runs the pipeline; `None` covers both backend failure and empty output.
    async fn generate(&self, request: &GenerationRequest) -> Option<String> {
        let prompt = prompt::build(request);

        let raw = match self.invoker.invoke(&prompt.system, &prompt.user).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    kind = %e.kind,
                    attempts = e.attempts.len(),
                    "Generation failed: {}",
                    e.message
                );
                return None;
            }
        };

        let command = sanitize(&raw);
        if command.is_empty() {
            warn!("Backend returned no usable command");
            return None;
        }

        info!("Generated command: {}", command);
        Some(command)
    }
}

fn parse_request(body: &[u8]) -> Result<GenerationRequest, Rejection> {
    let value: Value = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        serde_json::from_slice(body)
            .map_err(|e| Rejection::Malformed(format!("invalid JSON body: {e}")))?
    };

    let object = value
        .as_object()
        .ok_or_else(|| Rejection::Malformed("request body is not an object".to_string()))?;

    let raw_query = match object.get("query") {
        None | Some(Value::Null) => return Err(Rejection::MissingQuery),
        Some(Value::String(query)) => query,
        Some(other) => {
            return Err(Rejection::Malformed(format!("query is not a string: {other}")));
        }
    };

    let query = Query::parse(raw_query).ok_or(Rejection::MissingQuery)?;
    let context = ExecutionContext::from_json(object.get("context"));
    Ok(GenerationRequest::new(query, context))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ErrorKind;
    use crate::invoker::RetryPolicy;
    use crate::invoker::tests::{FixedJitter, RecordingSleeper, ScriptedBackend};
    use std::sync::Arc;
    use std::time::Duration;

    fn service(backend: Arc<ScriptedBackend>) -> RequestService {
        RequestService::new(BackendInvoker::with_providers(
            backend,
            RetryPolicy::default(),
            Arc::new(RecordingSleeper::default()),
            Arc::new(FixedJitter(Duration::ZERO)),
        ))
    }

    fn body_json(response: &ServiceResponse) -> Value {
        serde_json::from_str(&response.body).unwrap()
    }

    #[tokio::test]
    async fn test_success_envelope() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("```bash\nls -la\n```")]));
        let service = service(backend);

        let response = service
            .handle(br#"{"query": "  list all files ", "context": {"os": "linux", "cwd": "/tmp"}}"#)
            .await;

        assert_eq!(response.status, 200);
        assert_eq!(
            body_json(&response),
            json!({"command": "ls -la", "query": "list all files"})
        );
        assert!(response.headers.contains(&("Content-Type", "application/json")));
        assert!(response.headers.contains(&("Access-Control-Allow-Origin", "*")));
    }

    #[tokio::test]
    async fn test_non_empty_queries_get_commands() {
        for query in ["a", "list files", "find mp3 files larger than 50MB", "ünïcode query"] {
            let backend = Arc::new(ScriptedBackend::new(vec![Ok("echo ok")]));
            let service = service(backend);
            let body = json!({ "query": query }).to_string();

            let response = service.handle(body.as_bytes()).await;

            assert_eq!(response.status, 200, "query {query:?}");
            assert!(!body_json(&response)["command"].as_str().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_blank_query_is_rejected_without_backend_call() {
        let bodies = [
            r#"{"query": ""}"#,
            r#"{"query": "   \n"}"#,
            r#"{}"#,
            r#"{"query": null}"#,
            "",
        ];
        for body in bodies {
            let backend = Arc::new(ScriptedBackend::new(vec![]));
            let service = service(backend.clone());

            let response = service.handle(body.as_bytes()).await;

            assert_eq!(response.status, 400, "body {body:?}");
            assert_eq!(body_json(&response), json!({"error": QUERY_REQUIRED}));
            assert_eq!(backend.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_internal_error() {
        for body in ["{not json", "[1, 2]", r#"{"query": 42}"#] {
            let backend = Arc::new(ScriptedBackend::new(vec![]));
            let service = service(backend.clone());

            let response = service.handle(body.as_bytes()).await;

            assert_eq!(response.status, 500, "body {body:?}");
            assert_eq!(body_json(&response), json!({"error": INTERNAL_ERROR}));
            assert_eq!(backend.calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_backend_failure_does_not_leak_detail() {
        let backend = Arc::new(ScriptedBackend::new(vec![Err(ErrorKind::InvalidRequest)]));
        let service = service(backend);

        let response = service.handle(br#"{"query": "list files"}"#).await;

        assert_eq!(response.status, 500);
        assert_eq!(body_json(&response), json!({"error": GENERATION_FAILED}));
        assert!(!response.body.contains("scripted"));
    }

    #[tokio::test]
    async fn test_empty_generation_is_failure() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok("```\n```")]));
        let service = service(backend);

        let response = service.handle(br#"{"query": "list files"}"#).await;

        assert_eq!(response.status, 500);
        assert_eq!(body_json(&response), json!({"error": GENERATION_FAILED}));
    }

    #[test]
    fn test_parse_request_defaults_context() {
        let Ok(request) = parse_request(br#"{"query": "x", "context": 7}"#) else {
            panic!("expected a request");
        };

        assert_eq!(request.context, ExecutionContext::default());
    }

    #[test]
    fn test_preflight() {
        let response = ServiceResponse::preflight();

        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
        assert!(response
            .headers
            .contains(&("Access-Control-Allow-Methods", "POST, GET, OPTIONS")));
    }
}
