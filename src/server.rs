//! HTTP host for the request service.

use crate::service::{RequestService, ServiceResponse};
use anyhow::{Context, Result};
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

impl IntoResponse for ServiceResponse {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = (status, self.body).into_response();
        let headers = response.headers_mut();
        headers.remove(CONTENT_TYPE);
        for (name, value) in self.headers {
            if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
                headers.insert(name, HeaderValue::from_static(value));
            }
        }
        response
    }
}

async fn generate(State(service): State<Arc<RequestService>>, body: Bytes) -> ServiceResponse {
    service.handle(&body).await
}

async fn preflight() -> ServiceResponse {
    ServiceResponse::preflight()
}

/// Routes `/` and `/generate` to the service.
pub fn router(service: Arc<RequestService>) -> Router {
    let routes = post(generate).get(generate).options(preflight);
    Router::new()
        .route("/", routes.clone())
        .route("/generate", routes)
        .with_state(service)
}

/// Serves the router on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, service: Arc<RequestService>) -> Result<()> {
    let addr = listener.local_addr().context("Listener has no local address")?;
    info!("Listening on http://{}", addr);
    axum::serve(listener, router(service))
        .await
        .context("HTTP server failed")
}
