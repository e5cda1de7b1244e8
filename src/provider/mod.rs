//! # Provider Traits
//!
//! Abstract interface for the WAF control plane.
//!
//! The reconciler talks to the WAF only through these two capabilities, so
//! it can be driven by the OTC REST client in production and by in-memory
//! fakes in tests. Neither trait caches anything: every call is a round
//! trip to the remote store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod otc;

/// Failure talking to the WAF control plane
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WafError {
    /// Network failure, timeout, or unexpected API status
    #[error("WAF transport error: {0}")]
    Transport(String),

    /// The addressed certificate or domain does not exist
    #[error("WAF resource not found: {0}")]
    NotFound(String),

    /// The WAF rejected the payload
    #[error("WAF rejected request: {0}")]
    Validation(String),

    /// Credentials were rejected or no token could be obtained
    #[error("WAF authentication failed: {0}")]
    Authentication(String),
}

impl WafError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, WafError::NotFound(_))
    }
}

/// A certificate stored in the WAF
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WafCertificateRecord {
    pub id: String,
    pub name: String,
}

/// Client/server protocol of a WAF server entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Http,
    Https,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => f.write_str("HTTP"),
            Protocol::Https => f.write_str("HTTPS"),
        }
    }
}

/// One origin server behind a WAF domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEndpoint {
    pub client_protocol: Protocol,
    pub server_protocol: Protocol,
    pub address: String,
    pub port: u16,
}

/// A WAF-fronted domain and the certificate attached to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WafDomainBinding {
    pub domain_id: String,
    pub certificate_id: Option<String>,
    pub servers: Vec<ServerEndpoint>,
}

/// The WAF's certificate collection
#[async_trait]
pub trait CertificateDirectory: Send + Sync {
    /// All certificates currently stored
    async fn list(&self) -> Result<Vec<WafCertificateRecord>, WafError>;

    /// Upload a certificate under `name`
    async fn create(
        &self,
        name: &str,
        certificate_pem: &[u8],
        key_pem: &[u8],
    ) -> Result<WafCertificateRecord, WafError>;

    /// Delete the certificate with `id`
    async fn delete(&self, id: &str) -> Result<(), WafError>;
}

/// Read/update access to WAF domains
#[async_trait]
pub trait DomainBinding: Send + Sync {
    async fn get(&self, domain_id: &str) -> Result<WafDomainBinding, WafError>;

    /// Point `domain_id` at `certificate_id` with the given server list
    async fn update(
        &self,
        domain_id: &str,
        certificate_id: &str,
        servers: &[ServerEndpoint],
    ) -> Result<WafDomainBinding, WafError>;
}
