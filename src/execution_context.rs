//! Request-scoped data handed from the caller to the generation pipeline.
//!
//! A [`GenerationRequest`] is built once per inbound query and owned by the
//! call that built it. Nothing here is shared between queries.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_OS_NAME: &str = "posix";
const DEFAULT_CWD: &str = ".";

/// Where the generated command is expected to run.
///
/// Serialized as `{"os": ..., "cwd": ...}` on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionContext {
    /// Operating system name reported by the caller.
    #[serde(rename = "os")]
    pub os_name: String,
    /// Working directory reported by the caller.
    pub cwd: String,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            os_name: DEFAULT_OS_NAME.to_string(),
            cwd: DEFAULT_CWD.to_string(),
        }
    }
}

impl ExecutionContext {
    /// Creates a new execution context.
    pub fn new(os_name: &str, cwd: &str) -> Self {
        Self {
            os_name: os_name.to_string(),
            cwd: cwd.to_string(),
        }
    }

    /// Describes the calling process: target OS name and current directory.
    pub fn current() -> Self {
        let cwd = std::env::current_dir()
            .map(|dir| dir.display().to_string())
            .unwrap_or_else(|_| DEFAULT_CWD.to_string());
        Self::new(std::env::consts::OS, &cwd)
    }

    /// Reads a context from an optional JSON value.
    ///
    /// Absent or non-object values give the defaults; each missing or
    /// non-string key falls back to its own default.
    pub fn from_json(value: Option<&Value>) -> Self {
        let Some(object) = value.and_then(Value::as_object) else {
            return Self::default();
        };
        let field = |key: &str, default: &str| {
            object
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| default.to_string())
        };
        Self {
            os_name: field("os", DEFAULT_OS_NAME),
            cwd: field("cwd", DEFAULT_CWD),
        }
    }
}

/// Operator-supplied request text, guaranteed non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Trims `raw` and rejects it if nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One generation call: what was asked and where it will run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub query: Query,
    pub context: ExecutionContext,
}

impl GenerationRequest {
    pub fn new(query: Query, context: ExecutionContext) -> Self {
        Self { query, context }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_context_serializes_os_key() {
        let context = ExecutionContext::new("linux", "/tmp");

        let json = serde_json::to_value(&context).unwrap();

        assert_eq!(json, json!({"os": "linux", "cwd": "/tmp"}));
    }

    #[test]
    fn test_execution_context_defaults() {
        let context = ExecutionContext::default();

        assert_eq!(context.os_name, "posix");
        assert_eq!(context.cwd, ".");
    }

    #[test]
    fn test_from_json_absent_gives_defaults() {
        assert_eq!(ExecutionContext::from_json(None), ExecutionContext::default());
    }

    #[test]
    fn test_from_json_non_object_gives_defaults() {
        let value = json!("linux");
        assert_eq!(
            ExecutionContext::from_json(Some(&value)),
            ExecutionContext::default()
        );
    }

    #[test]
    fn test_from_json_missing_keys_default_individually() {
        let value = json!({"os": "darwin"});

        let context = ExecutionContext::from_json(Some(&value));

        assert_eq!(context.os_name, "darwin");
        assert_eq!(context.cwd, ".");
    }

    #[test]
    fn test_current_reports_target_os() {
        let context = ExecutionContext::current();

        assert_eq!(context.os_name, std::env::consts::OS);
        assert!(!context.cwd.is_empty());
    }

    #[test]
    fn test_query_trims() {
        let query = Query::parse("  list files \n").unwrap();
        assert_eq!(query.as_str(), "list files");
    }

    #[test]
    fn test_query_rejects_blank() {
        assert!(Query::parse("").is_none());
        assert!(Query::parse(" \t\n ").is_none());
    }
}
