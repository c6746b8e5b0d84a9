//! ShellMate - natural language to shell command translation.
//!
//! Two halves share this library:
//!
//! - **The service** validates a JSON request, builds a prompt, calls the
//!   hosted text-generation backend under a bounded retry policy, cleans up
//!   the reply and answers with a JSON envelope.
//! - **The CLI** sends a query to the service, then either prints the command
//!   for a wrapping shell function (seamless mode) or stages it on the
//!   operator's input line for confirmation (interactive mode).
//!
//! # Architecture
//!
//! - [`config`] - Client and service configuration
//! - [`logging`] - Tracing subscriber setup
//! - [`execution_context`] - Query, context and request types
//! - [`prompt`] - System and user prompt construction
//! - [`backend`] - Backend capability, error classification, hosted client
//! - [`invoker`] - Retry/backoff state machine around the backend
//! - [`sanitizer`] - Fence and whitespace cleanup of generated text
//! - [`service`] - Request validation and response envelopes
//! - [`server`] - axum host for the service
//! - [`client`] - HTTP client for the service
//! - [`stager`] - Pre-filled input line for confirmation
//! - [`executor`] - Runs confirmed lines in the native shell
//! - [`orchestrator`] - Seamless and interactive CLI flows
//! - [`providers`] - Sleep and jitter injection
//! - [`http_client`] - HTTP client abstraction
//!
//! # Example
//!
//! ```ignore
//! use shellmate::client::ServiceClient;
//! use shellmate::executor::SystemShellRunner;
//! use shellmate::orchestrator::Orchestrator;
//! use shellmate::stager::TerminalStager;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = ServiceClient::new("https://example.com/generate", None)?;
//!     let mut orchestrator = Orchestrator::new(
//!         Box::new(client),
//!         Box::new(TerminalStager::new()?),
//!         Box::new(SystemShellRunner),
//!         true,
//!     );
//!
//!     orchestrator.run("show disk usage", false).await;
//!     Ok(())
//! }
//! ```
//!
//! # Shell integration
//!
//! Seamless mode doubles backslashes so that one round of re-interpretation
//! by the wrapping function restores them:
//!
//! ```bash
//! sm() { print -z -- "$(shellmate --seamless "$@")"; }
//! ```

pub mod backend;
pub mod client;
pub mod config;
pub mod execution_context;
pub mod executor;
pub mod http_client;
pub mod invoker;
pub mod logging;
pub mod orchestrator;
pub mod prompt;
pub mod providers;
pub mod sanitizer;
pub mod server;
pub mod service;
pub mod stager;
