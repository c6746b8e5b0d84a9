use anyhow::{Context, Result};
use shellmate::backend::{AnthropicBackend, Backend, MockBackend};
use shellmate::config::ServiceConfig;
use shellmate::http_client::ReqwestHttpClient;
use shellmate::invoker::BackendInvoker;
use shellmate::logging;
use shellmate::server;
use shellmate::service::RequestService;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("info");

    let config = ServiceConfig::from_env()?;

    let backend: Arc<dyn Backend> = if config.use_mock {
        info!("Using mock backend (SHELLMATE_USE_MOCK)");
        Arc::new(MockBackend::new())
    } else {
        info!("Using model: {}", config.backend.model_id);
        let http = ReqwestHttpClient::with_timeout(config.backend_timeout)?;
        Arc::new(AnthropicBackend::new(config.backend.clone(), Arc::new(http)))
    };

    let service = Arc::new(RequestService::new(BackendInvoker::new(backend)));
    let listener = TcpListener::bind(&config.listen)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen))?;

    server::serve(listener, service).await
}
