//! # WAF Operations
//!
//! [`CertificateDirectory`] and [`DomainBinding`] on top of [`OtcWafClient`].
//!
//! Each call runs in a `waf.<resource>.<operation>` span and reports its
//! duration and outcome to the WAF operation metrics.

use super::requests::{CreateCertificateRequest, UpdateDomainRequest};
use super::responses::{CertificateItem, CertificateListResponse, DomainResponse};
use super::OtcWafClient;
use crate::constants::WAF_CERTIFICATE_PAGE_SIZE;
use crate::observability::metrics;
use crate::provider::{
    CertificateDirectory, DomainBinding, ServerEndpoint, WafCertificateRecord, WafDomainBinding,
    WafError,
};
use async_trait::async_trait;
use reqwest::Method;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, debug_span, Instrument};

/// Run `operation`, recording duration and failures under `name`
async fn tracked<T, F>(name: &'static str, operation: F) -> Result<T, WafError>
where
    F: Future<Output = Result<T, WafError>>,
{
    let start = Instant::now();
    let result = operation.await;
    metrics::record_waf_operation(name, start.elapsed().as_secs_f64());
    if let Err(e) = &result {
        metrics::increment_waf_operation_errors(name);
        debug!(operation = name, error = %e, "WAF operation failed");
    }
    result
}

fn to_json<T: serde::Serialize>(body: &T) -> Result<Vec<u8>, WafError> {
    serde_json::to_vec(body)
        .map_err(|e| WafError::Validation(format!("Failed to encode request body: {e}")))
}

fn pem_str<'a>(what: &str, pem: &'a [u8]) -> Result<&'a str, WafError> {
    std::str::from_utf8(pem).map_err(|e| WafError::Validation(format!("{what} is not UTF-8: {e}")))
}

#[async_trait]
impl CertificateDirectory for OtcWafClient {
    async fn list(&self) -> Result<Vec<WafCertificateRecord>, WafError> {
        let span = debug_span!("waf.certificate.list");
        tracked("certificate.list", async {
            let mut records = Vec::new();
            // `offset` is the page index
            let mut page = 0usize;
            loop {
                let response: CertificateListResponse = self
                    .send_json(
                        Method::GET,
                        &["certificate"],
                        &[
                            ("offset", page.to_string()),
                            ("limit", WAF_CERTIFICATE_PAGE_SIZE.to_string()),
                        ],
                        None,
                    )
                    .await?;

                let fetched = response.items.len();
                records.extend(response.items.into_iter().map(WafCertificateRecord::from));
                if fetched == 0 || records.len() >= response.total {
                    break;
                }
                page += 1;
            }
            debug!(count = records.len(), "Listed WAF certificates");
            Ok(records)
        })
        .instrument(span)
        .await
    }

    async fn create(
        &self,
        name: &str,
        certificate_pem: &[u8],
        key_pem: &[u8],
    ) -> Result<WafCertificateRecord, WafError> {
        let span = debug_span!("waf.certificate.create", certificate.name = name);
        tracked("certificate.create", async {
            let body = to_json(&CreateCertificateRequest {
                name,
                content: pem_str("certificate", certificate_pem)?,
                key: pem_str("private key", key_pem)?,
            })?;
            let created: CertificateItem = self
                .send_json(Method::POST, &["certificate"], &[], Some(body))
                .await?;
            debug!(certificate.id = %created.id, "Uploaded WAF certificate");
            Ok(WafCertificateRecord::from(created))
        })
        .instrument(span)
        .await
    }

    async fn delete(&self, id: &str) -> Result<(), WafError> {
        let span = debug_span!("waf.certificate.delete", certificate.id = id);
        tracked("certificate.delete", async {
            self.send(Method::DELETE, &["certificate", id], &[], None)
                .await?;
            Ok(())
        })
        .instrument(span)
        .await
    }
}

#[async_trait]
impl DomainBinding for OtcWafClient {
    async fn get(&self, domain_id: &str) -> Result<WafDomainBinding, WafError> {
        let span = debug_span!("waf.domain.get", domain.id = domain_id);
        tracked("domain.get", async {
            let domain: DomainResponse = self
                .send_json(Method::GET, &["instance", domain_id], &[], None)
                .await?;
            Ok(WafDomainBinding::from(domain))
        })
        .instrument(span)
        .await
    }

    async fn update(
        &self,
        domain_id: &str,
        certificate_id: &str,
        servers: &[ServerEndpoint],
    ) -> Result<WafDomainBinding, WafError> {
        let span = debug_span!(
            "waf.domain.update",
            domain.id = domain_id,
            certificate.id = certificate_id
        );
        tracked("domain.update", async {
            let body = to_json(&UpdateDomainRequest {
                certificate_id,
                server: servers,
            })?;
            let domain: DomainResponse = self
                .send_json(Method::PATCH, &["instance", domain_id], &[], Some(body))
                .await?;
            Ok(WafDomainBinding::from(domain))
        })
        .instrument(span)
        .await
    }
}
