//! # OTC WAF REST Client
//!
//! Native REST implementation of [`CertificateDirectory`] and [`DomainBinding`]
//! against the Open Telekom Cloud WAF API v1.
//!
//! Requests are authenticated either with an IAM token (password
//! credentials) or by signing each request with the access key pair. The
//! project id both methods need is resolved lazily on the first call and
//! cached in a [`Session`].
//!
//! [`CertificateDirectory`]: crate::provider::CertificateDirectory
//! [`DomainBinding`]: crate::provider::DomainBinding

mod auth;
mod operations;
mod requests;
mod responses;

use crate::config::{AuthMethod, WebhookConfig};
use crate::constants::IAM_TOKEN_REFRESH_MARGIN_SECS;
use crate::provider::WafError;
use auth::{AkSkSigner, Session};
use chrono::Utc;
use reqwest::{Client, Method, StatusCode, Url};
use requests::TokenRequest;
use responses::{ErrorResponse, ProjectListResponse, TokenResponse};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const JSON_CONTENT_TYPE: &str = "application/json";

/// OTC WAF REST client
pub struct OtcWafClient {
    http_client: Client,
    waf_endpoint: String,
    iam_endpoint: String,
    auth: AuthMethod,
    session: Mutex<Option<Session>>,
}

impl std::fmt::Debug for OtcWafClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtcWafClient")
            .field("waf_endpoint", &self.waf_endpoint)
            .field("iam_endpoint", &self.iam_endpoint)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl OtcWafClient {
    /// Create a client for the endpoints and timeout in `config`
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &WebhookConfig, auth: AuthMethod) -> anyhow::Result<Self> {
        Self::with_endpoints(
            &config.waf_endpoint,
            &config.iam_endpoint,
            config.waf_request_timeout(),
            auth,
        )
    }

    /// Create a client for explicit endpoints
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_endpoints(
        waf_endpoint: &str,
        iam_endpoint: &str,
        timeout: Duration,
        auth: AuthMethod,
    ) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;

        let waf_endpoint = waf_endpoint.trim_end_matches('/').to_string();
        let iam_endpoint = iam_endpoint.trim_end_matches('/').to_string();
        info!(
            waf_endpoint = %waf_endpoint,
            iam_endpoint = %iam_endpoint,
            method = auth.kind(),
            "Created OTC WAF client"
        );

        Ok(Self {
            http_client,
            waf_endpoint,
            iam_endpoint,
            auth,
            session: Mutex::new(None),
        })
    }

    /// Current session, authenticating when none is cached or the token is about to expire
    async fn session(&self) -> Result<Session, WafError> {
        let mut cached = self.session.lock().await;
        if let Some(session) = cached.as_ref() {
            if session.is_fresh(Utc::now(), IAM_TOKEN_REFRESH_MARGIN_SECS) {
                return Ok(session.clone());
            }
            debug!("IAM token close to expiry, re-authenticating");
        }

        let session = match &self.auth {
            AuthMethod::Password {
                username,
                password,
                domain_name,
                project_name,
            } => {
                self.issue_token(username, password, domain_name, project_name)
                    .await?
            }
            AuthMethod::AccessKey {
                access_key,
                secret_key,
                project_name,
            } => {
                self.resolve_project(access_key, secret_key, project_name)
                    .await?
            }
        };
        info!(project_id = %session.project_id, "Authenticated against OTC IAM");
        *cached = Some(session.clone());
        Ok(session)
    }

    async fn invalidate_session(&self) {
        *self.session.lock().await = None;
    }

    async fn issue_token(
        &self,
        username: &str,
        password: &str,
        domain_name: &str,
        project_name: &str,
    ) -> Result<Session, WafError> {
        let url = format!("{}/auth/tokens", self.iam_endpoint);
        let body = TokenRequest::password(username, password, domain_name, project_name);

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| WafError::Transport(format!("IAM token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(authentication_error(status, &body));
        }

        let token = response
            .headers()
            .get(SUBJECT_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                WafError::Authentication(format!("IAM response has no {SUBJECT_TOKEN_HEADER}"))
            })?;
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| WafError::Authentication(format!("Failed to parse IAM token: {e}")))?;

        Ok(Session {
            project_id: body.token.project.id,
            token: Some(token),
            expires_at: Some(body.token.expires_at),
        })
    }

    async fn resolve_project(
        &self,
        access_key: &str,
        secret_key: &str,
        project_name: &str,
    ) -> Result<Session, WafError> {
        let mut url = parse_url(&format!("{}/projects", self.iam_endpoint))?;
        url.query_pairs_mut().append_pair("name", project_name);

        let request = self.signed_request(
            Method::GET,
            url,
            Vec::new(),
            &AkSkSigner::new(access_key, secret_key),
        );
        let response = request
            .send()
            .await
            .map_err(|e| WafError::Transport(format!("IAM project lookup failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            return Err(authentication_error(status, &body));
        }

        let projects: ProjectListResponse = response.json().await.map_err(|e| {
            WafError::Authentication(format!("Failed to parse IAM project list: {e}"))
        })?;
        let project = projects
            .projects
            .into_iter()
            .find(|p| p.name == project_name)
            .ok_or_else(|| {
                WafError::Authentication(format!("IAM project '{project_name}' not found"))
            })?;

        Ok(Session {
            project_id: project.id,
            token: None,
            expires_at: None,
        })
    }

    /// Build a request signed with the access key pair
    fn signed_request(
        &self,
        method: Method,
        url: Url,
        body: Vec<u8>,
        signer: &AkSkSigner<'_>,
    ) -> reqwest::RequestBuilder {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        let authorization = signer.sign(method.as_str(), &url, &mut headers, &body, Utc::now());

        let mut request = self.http_client.request(method, url);
        for (name, value) in &headers {
            // reqwest derives Host from the URL
            if !name.eq_ignore_ascii_case("host") {
                request = request.header(name.as_str(), value.as_str());
            }
        }
        request
            .header(reqwest::header::AUTHORIZATION, authorization)
            .body(body)
    }

    /// Send a WAF API request below `/v1/{project_id}/waf` and return the raw body
    ///
    /// Each entry of `segments` becomes exactly one percent-encoded path segment.
    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, WafError> {
        for segment in segments {
            check_segment(segment)?;
        }
        let session = self.session().await?;
        let mut url = waf_url(&self.waf_endpoint, &session.project_id, segments)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        let body = body.unwrap_or_default();
        let request = match (&self.auth, &session.token) {
            (AuthMethod::AccessKey {
                access_key,
                secret_key,
                ..
            }, _) => self.signed_request(
                method,
                url,
                body,
                &AkSkSigner::new(access_key, secret_key),
            ),
            (AuthMethod::Password { .. }, Some(token)) => self
                .http_client
                .request(method, url)
                .header(AUTH_TOKEN_HEADER, token)
                .header(reqwest::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
                .body(body),
            (AuthMethod::Password { .. }, None) => {
                return Err(WafError::Authentication(
                    "no IAM token in session".to_string(),
                ))
            }
        };

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                WafError::Transport(format!("WAF request timed out: {e}"))
            } else {
                WafError::Transport(format!("WAF request failed: {e}"))
            }
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| WafError::Transport(format!("Failed to read WAF response: {e}")))?;

        if status.is_success() {
            return Ok(bytes.to_vec());
        }

        let error = error_for_status(status, &bytes);
        if matches!(error, WafError::Authentication(_)) {
            warn!(status = %status, "WAF rejected credentials, dropping cached session");
            self.invalidate_session().await;
        }
        Err(error)
    }

    /// [`send`](Self::send) and decode the JSON body
    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
    ) -> Result<T, WafError> {
        let bytes = self.send(method, segments, query, body).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| WafError::Transport(format!("Failed to parse WAF response: {e}")))
    }
}

fn parse_url(raw: &str) -> Result<Url, WafError> {
    Url::parse(raw).map_err(|e| WafError::Transport(format!("Invalid URL '{raw}': {e}")))
}

/// Ids taken from secret metadata end up in the path, dot segments would escape it
fn check_segment(segment: &str) -> Result<(), WafError> {
    if segment.is_empty() || segment == "." || segment == ".." {
        return Err(WafError::Validation(format!(
            "'{segment}' is not a valid WAF resource id"
        )));
    }
    Ok(())
}

/// `{endpoint}/v1/{project_id}/waf/{segments...}`
fn waf_url(endpoint: &str, project_id: &str, segments: &[&str]) -> Result<Url, WafError> {
    let mut url = parse_url(endpoint)?;
    url.path_segments_mut()
        .map_err(|()| WafError::Transport(format!("WAF endpoint '{endpoint}' cannot carry a path")))?
        .pop_if_empty()
        .extend(["v1", project_id, "waf"])
        .extend(segments);
    Ok(url)
}

/// Human-readable message out of an error body
fn error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorResponse>(body) {
        Ok(ErrorResponse {
            error_code: Some(code),
            error_msg: Some(msg),
        }) => format!("{code}: {msg}"),
        Ok(ErrorResponse {
            error_msg: Some(msg),
            ..
        }) => msg,
        _ => String::from_utf8_lossy(body).trim().to_string(),
    }
}

/// Map a non-success WAF status to a [`WafError`]
pub(crate) fn error_for_status(status: StatusCode, body: &[u8]) -> WafError {
    let message = format!("HTTP {}: {}", status.as_u16(), error_message(body));
    match status {
        StatusCode::NOT_FOUND => WafError::NotFound(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => WafError::Validation(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => WafError::Authentication(message),
        _ => WafError::Transport(message),
    }
}

fn authentication_error(status: StatusCode, body: &[u8]) -> WafError {
    WafError::Authentication(format!(
        "IAM returned HTTP {}: {}",
        status.as_u16(),
        error_message(body)
    ))
}
