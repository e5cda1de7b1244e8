//! # Webhook Server
//!
//! HTTPS endpoint the Kubernetes API server calls with admission reviews.
//!
//! - `POST /upload-cert-to-waf` - admission reviews for TLS secrets
//! - `GET /healthz` - liveness
//!
//! TLS material is the webhook's own serving certificate, usually issued by
//! cert-manager and mounted at `/etc/webhook/certs/`.

use super::handler::AdmissionHandler;
use crate::constants::UPLOAD_CERT_PATH;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Errors that can occur when running the webhook server
#[derive(Debug, Error)]
pub enum WebhookServerError {
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("Webhook server error: {0}")]
    Server(#[from] std::io::Error),
}

/// Create the webhook router
pub fn create_webhook_router(handler: Arc<AdmissionHandler>) -> Router {
    Router::new()
        .route(UPLOAD_CERT_PATH, post(upload_cert_handler))
        .route("/healthz", get(healthz_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

async fn upload_cert_handler(
    State(handler): State<Arc<AdmissionHandler>>,
    body: Bytes,
) -> Response {
    let (status, body) = handler.handle(&body).await;
    if body.is_empty() {
        return status.into_response();
    }
    (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Serve the webhook router over TLS on `0.0.0.0:port`
///
/// # Errors
/// Fails when the TLS files cannot be loaded or the listener fails.
pub async fn run_webhook_server(
    handler: Arc<AdmissionHandler>,
    port: u16,
    cert_path: &Path,
    key_path: &Path,
) -> Result<(), WebhookServerError> {
    use axum_server::tls_rustls::RustlsConfig;

    let app = create_webhook_router(handler);

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| {
            WebhookServerError::TlsConfig(format!(
                "failed to load {} / {}: {e}",
                cert_path.display(),
                key_path.display()
            ))
        })?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, path = UPLOAD_CERT_PATH, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
