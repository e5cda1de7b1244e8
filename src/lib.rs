//! # WAF Certificate Webhook
//!
//! A Kubernetes mutating admission webhook that keeps Open Telekom Cloud WAF
//! certificates in sync with cert-manager TLS secrets.
//!
//! ## Overview
//!
//! Whenever a TLS secret carrying a `waf-domain-id` annotation is created or
//! updated, the webhook:
//!
//! 1. **Fingerprints** the certificate (SHA-256 of the normalized PEM)
//! 2. **Looks up** a WAF certificate named after that fingerprint
//! 3. **Uploads** the certificate if it is not there yet
//! 4. **Attaches** it to the WAF domain
//! 5. **Retires** the certificate the secret referenced before
//! 6. **Patches** the secret with the resulting WAF certificate id
//!
//! Replays of the same certificate content are no-ops beyond one listing.
//!
//! Tests are included in the module files and under `tests/`.

pub mod certificate;
pub mod config;
pub mod constants;
pub mod observability;
pub mod provider;
pub mod reconciler;
pub mod server;
pub mod webhook;
