//! # Admission Handler
//!
//! Translates admission reviews for TLS secrets into reconciliations.
//!
//! The handler speaks raw bytes in and out so that it stays independent of
//! the HTTP framework. Malformed reviews get HTTP 400 with an empty body.
//! Every well-formed review gets HTTP 200, allow or deny travels in the
//! response envelope.

use super::patch::{certificate_id_patch, PatchTarget};
use crate::certificate::{BookkeepingKeys, CertificateMaterial};
use crate::observability::metrics;
use crate::reconciler::{CertificateReconciler, ReconciliationError};
use axum::http::StatusCode;
use k8s_openapi::api::core::v1::Secret;
use kube::core::admission::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, ConvertAdmissionReviewError, Operation,
};
use kube::core::DynamicObject;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// The review itself could not be understood
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid admission review: {0}")]
    InvalidReview(#[source] serde_json::Error),

    #[error("admission review has no request: {0}")]
    MissingRequest(#[from] ConvertAdmissionReviewError),

    #[error("admission request object is not a secret: {0}")]
    InvalidObject(String),
}

/// Admission protocol handler
pub struct AdmissionHandler {
    reconciler: Arc<CertificateReconciler>,
    keys: BookkeepingKeys,
    patch_target: PatchTarget,
}

impl std::fmt::Debug for AdmissionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionHandler")
            .field("keys", &self.keys)
            .field("patch_target", &self.patch_target)
            .finish_non_exhaustive()
    }
}

impl AdmissionHandler {
    #[must_use]
    pub fn new(
        reconciler: Arc<CertificateReconciler>,
        keys: BookkeepingKeys,
        patch_target: PatchTarget,
    ) -> Self {
        Self {
            reconciler,
            keys,
            patch_target,
        }
    }

    /// Handle one serialized admission review
    pub async fn handle(&self, body: &[u8]) -> (StatusCode, Vec<u8>) {
        let request = match decode_request(body) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Rejecting malformed admission review");
                metrics::increment_admission_reviews("malformed");
                return (StatusCode::BAD_REQUEST, Vec::new());
            }
        };

        let response = match self.review(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(uid = %request.uid, error = %e, "Rejecting malformed admission request");
                metrics::increment_admission_reviews("malformed");
                return (StatusCode::BAD_REQUEST, Vec::new());
            }
        };

        match serde_json::to_vec(&response.into_review()) {
            Ok(bytes) => (StatusCode::OK, bytes),
            Err(e) => {
                error!(uid = %request.uid, error = %e, "Failed to serialize admission response");
                (StatusCode::INTERNAL_SERVER_ERROR, Vec::new())
            }
        }
    }

    async fn review(
        &self,
        request: &AdmissionRequest<DynamicObject>,
    ) -> Result<AdmissionResponse, DecodeError> {
        let uid = &request.uid;
        debug!(
            uid = %uid,
            operation = ?request.operation,
            namespace = ?request.namespace,
            name = %request.name,
            "Processing admission request"
        );

        if request.operation == Operation::Delete {
            debug!(uid = %uid, "Allowing DELETE unchanged");
            metrics::increment_admission_reviews("skipped");
            return Ok(AdmissionResponse::from(request));
        }
        if request.dry_run {
            info!(uid = %uid, "Allowing dry-run review without touching the WAF");
            metrics::increment_admission_reviews("skipped");
            return Ok(AdmissionResponse::from(request));
        }

        let secret = extract_secret(request)?;

        let result = match CertificateMaterial::from_secret(&secret, &self.keys) {
            Ok(material) => self.reconciler.reconcile(&material).await,
            Err(e) => Err(ReconciliationError::from(e)),
        };

        let response = match result {
            Ok(certificate_id) => {
                let patch = certificate_id_patch(
                    &secret.metadata,
                    self.patch_target,
                    &self.keys.certificate_id,
                    &certificate_id,
                );
                match AdmissionResponse::from(request).with_patch(patch) {
                    Ok(response) => {
                        info!(
                            uid = %uid,
                            certificate.id = %certificate_id,
                            "Admission request allowed"
                        );
                        metrics::increment_admission_reviews("allowed");
                        response
                    }
                    Err(e) => {
                        error!(uid = %uid, error = %e, "Failed to serialize patch");
                        metrics::increment_admission_reviews("denied");
                        AdmissionResponse::from(request)
                            .deny(format!("patch serialization error: {e}"))
                    }
                }
            }
            Err(e) => {
                warn!(uid = %uid, error = %e, "Admission request denied");
                metrics::increment_admission_reviews("denied");
                AdmissionResponse::from(request).deny(e.to_string())
            }
        };
        Ok(response)
    }
}

fn decode_request(body: &[u8]) -> Result<AdmissionRequest<DynamicObject>, DecodeError> {
    let review: AdmissionReview<DynamicObject> =
        serde_json::from_slice(body).map_err(DecodeError::InvalidReview)?;
    Ok(review.try_into()?)
}

fn extract_secret(request: &AdmissionRequest<DynamicObject>) -> Result<Secret, DecodeError> {
    let object = request
        .object
        .as_ref()
        .ok_or_else(|| DecodeError::InvalidObject("request carries no object".to_string()))?;
    let raw = serde_json::to_value(object).map_err(|e| DecodeError::InvalidObject(e.to_string()))?;
    serde_json::from_value(raw).map_err(|e| DecodeError::InvalidObject(e.to_string()))
}
