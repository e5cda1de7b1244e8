//! Response bodies of the OTC IAM and WAF APIs

use crate::provider::{ServerEndpoint, WafCertificateRecord, WafDomainBinding};
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One page of `GET /v1/{project_id}/waf/certificate`
#[derive(Debug, Deserialize)]
pub(crate) struct CertificateListResponse {
    #[serde(default)]
    pub total: usize,
    #[serde(default)]
    pub items: Vec<CertificateItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CertificateItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl From<CertificateItem> for WafCertificateRecord {
    fn from(item: CertificateItem) -> Self {
        Self {
            id: item.id,
            name: item.name,
        }
    }
}

/// `GET`/`PATCH /v1/{project_id}/waf/instance/{instance_id}`
#[derive(Debug, Deserialize)]
pub(crate) struct DomainResponse {
    pub id: String,
    #[serde(default)]
    pub certificate_id: Option<String>,
    #[serde(default)]
    pub server: Vec<ServerEndpoint>,
}

impl From<DomainResponse> for WafDomainBinding {
    fn from(domain: DomainResponse) -> Self {
        Self {
            domain_id: domain.id,
            certificate_id: domain.certificate_id.filter(|id| !id.is_empty()),
            servers: domain.server,
        }
    }
}

/// Body of `POST /v3/auth/tokens`, the token itself is in `X-Subject-Token`
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub token: TokenBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenBody {
    pub expires_at: DateTime<Utc>,
    pub project: ProjectRef,
}

/// `GET /v3/projects?name=...`
#[derive(Debug, Deserialize)]
pub(crate) struct ProjectListResponse {
    #[serde(default)]
    pub projects: Vec<ProjectRef>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProjectRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Error body returned by the WAF API
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_msg: Option<String>,
}
