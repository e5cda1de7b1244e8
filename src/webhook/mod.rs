//! # Webhook
//!
//! Admission review handling and the TLS server in front of it.

mod handler;
mod patch;
mod server;

pub use handler::{AdmissionHandler, DecodeError};
pub use patch::{certificate_id_patch, PatchTarget};
pub use server::{create_webhook_router, run_webhook_server, WebhookServerError};
