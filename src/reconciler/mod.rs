//! # Reconciler
//!
//! Brings the WAF in line with one TLS secret.
//!
//! ## Reconciliation Flow
//!
//! 1. **Lookup**: list WAF certificates and search for one named after the
//!    certificate fingerprint. A hit ends the reconciliation with that id.
//! 2. **Upload**: create a certificate named after the fingerprint.
//! 3. **Attach**: read the target domain, derive its server list from the
//!    [`ServerPolicy`] and point it at the new certificate.
//! 4. **Retire**: delete the certificate the secret referenced before.
//!    Failures are logged and counted, never returned.
//!
//! Nothing is remembered between calls. Replays of the same content take
//! the lookup fast path, and a previous certificate that is already gone is
//! an expected outcome when two reviews race on the same secret.

mod policy;

pub use policy::ServerPolicy;

use crate::certificate::{CertificateMaterial, MaterialError};
use crate::observability::metrics;
use crate::provider::{CertificateDirectory, DomainBinding, WafError};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Why a certificate could not be brought into the WAF
#[derive(Debug, Error)]
pub enum ReconciliationError {
    #[error("failed to look up WAF certificates: {0}")]
    Lookup(#[source] WafError),

    #[error("failed to upload certificate to WAF: {0}")]
    Upload(#[source] WafError),

    /// The certificate exists in the WAF but is not referenced by the domain
    #[error("certificate {certificate_id} uploaded but not attached to WAF domain {domain_id}: {source}")]
    Attach {
        certificate_id: String,
        domain_id: String,
        #[source]
        source: WafError,
    },

    #[error("invalid certificate secret: {0}")]
    InvalidMaterial(#[from] MaterialError),
}

/// Progress of a single reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    NotFound,
    Found,
    Uploading,
    Attaching,
    Retiring,
    Done,
    Failed,
}

impl fmt::Display for ReconcileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReconcileState::NotFound => "not_found",
            ReconcileState::Found => "found",
            ReconcileState::Uploading => "uploading",
            ReconcileState::Attaching => "attaching",
            ReconcileState::Retiring => "retiring",
            ReconcileState::Done => "done",
            ReconcileState::Failed => "failed",
        };
        f.write_str(name)
    }
}

fn transition(state: ReconcileState) {
    debug!(state = %state, "Reconciliation state");
}

/// Certificate reconciler
pub struct CertificateReconciler {
    directory: Arc<dyn CertificateDirectory>,
    binding: Arc<dyn DomainBinding>,
    server_policy: ServerPolicy,
}

impl fmt::Debug for CertificateReconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateReconciler")
            .field("server_policy", &self.server_policy)
            .finish_non_exhaustive()
    }
}

impl CertificateReconciler {
    #[must_use]
    pub fn new(
        directory: Arc<dyn CertificateDirectory>,
        binding: Arc<dyn DomainBinding>,
        server_policy: ServerPolicy,
    ) -> Self {
        Self {
            directory,
            binding,
            server_policy,
        }
    }

    /// Make sure the WAF holds `material` and its domain uses it
    ///
    /// Returns the WAF id of the certificate.
    ///
    /// # Errors
    /// Returns [`ReconciliationError`] when the lookup, upload or attachment fails.
    pub async fn reconcile(
        &self,
        material: &CertificateMaterial,
    ) -> Result<String, ReconciliationError> {
        let span = info_span!(
            "waf.certificate.reconcile",
            fingerprint = %material.fingerprint(),
            domain.id = material.waf_domain_id(),
            domain.name = material.domain_name().unwrap_or_default()
        );
        let start = Instant::now();

        let result = self.run(material).instrument(span).await;

        metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());
        match &result {
            Ok((_, outcome)) => metrics::increment_reconciliations(outcome),
            Err(_) => {
                transition(ReconcileState::Failed);
                metrics::increment_reconciliations("failed");
            }
        }
        result.map(|(id, _)| id)
    }

    async fn run(
        &self,
        material: &CertificateMaterial,
    ) -> Result<(String, &'static str), ReconciliationError> {
        let fingerprint = material.fingerprint().as_str();

        let existing = self
            .directory
            .list()
            .await
            .map_err(ReconciliationError::Lookup)?;
        if let Some(record) = existing.into_iter().find(|c| c.name == fingerprint) {
            transition(ReconcileState::Found);
            info!(certificate.id = %record.id, "Certificate already present in WAF");
            transition(ReconcileState::Done);
            return Ok((record.id, "reused"));
        }
        transition(ReconcileState::NotFound);

        transition(ReconcileState::Uploading);
        let created = self
            .directory
            .create(fingerprint, material.certificate_pem(), material.private_key_pem())
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to upload certificate to WAF");
                ReconciliationError::Upload(e)
            })?;
        info!(certificate.id = %created.id, "Uploaded certificate to WAF");

        transition(ReconcileState::Attaching);
        self.attach(material.waf_domain_id(), &created.id)
            .await
            .map_err(|source| {
                error!(
                    certificate.id = %created.id,
                    error = %source,
                    "Failed to attach certificate to WAF domain"
                );
                ReconciliationError::Attach {
                    certificate_id: created.id.clone(),
                    domain_id: material.waf_domain_id().to_string(),
                    source,
                }
            })?;
        info!(certificate.id = %created.id, "Attached certificate to WAF domain");

        if let Some(previous) = material.previous_certificate_id() {
            if previous != created.id {
                transition(ReconcileState::Retiring);
                self.retire(previous).await;
            }
        }

        transition(ReconcileState::Done);
        Ok((created.id, "uploaded"))
    }

    async fn attach(&self, domain_id: &str, certificate_id: &str) -> Result<(), WafError> {
        let current = self.binding.get(domain_id).await?;
        let servers = self.server_policy.derive_servers(&current)?;
        let updated = self
            .binding
            .update(domain_id, certificate_id, &servers)
            .await?;
        if updated.certificate_id.as_deref() != Some(certificate_id) {
            warn!(
                expected = certificate_id,
                reported = ?updated.certificate_id,
                "WAF domain reports a different certificate after update"
            );
        }
        Ok(())
    }

    async fn retire(&self, previous: &str) {
        match self.directory.delete(previous).await {
            Ok(()) => info!(certificate.id = previous, "Deleted superseded WAF certificate"),
            Err(e) if e.is_not_found() => {
                info!(certificate.id = previous, "Superseded WAF certificate already deleted");
            }
            Err(e) => {
                metrics::increment_retirement_failures();
                warn!(
                    certificate.id = previous,
                    error = %e,
                    "Failed to delete superseded WAF certificate"
                );
            }
        }
    }
}
