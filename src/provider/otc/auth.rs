//! # OTC Authentication
//!
//! Two ways of authenticating WAF requests:
//!
//! - **Password**: exchange user/password for a project-scoped IAM token,
//!   sent as `X-Auth-Token`. The token is cached and renewed shortly before
//!   it expires.
//! - **Access key**: sign every request with `SDK-HMAC-SHA256`. The project
//!   id is resolved once through IAM with a signed request.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Url;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

pub(crate) const SIGNING_ALGORITHM: &str = "SDK-HMAC-SHA256";
pub(crate) const SDK_DATE_HEADER: &str = "X-Sdk-Date";
pub(crate) const SDK_DATE_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Authenticated context for WAF calls
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub project_id: String,
    /// IAM token, `None` when requests are signed instead
    pub token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Still usable `margin_secs` from now
    pub fn is_fresh(&self, now: DateTime<Utc>, margin_secs: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => expires_at - chrono::Duration::seconds(margin_secs) > now,
            None => true,
        }
    }
}

/// `SDK-HMAC-SHA256` request signer
pub(crate) struct AkSkSigner<'a> {
    access_key: &'a str,
    secret_key: &'a str,
}

impl<'a> AkSkSigner<'a> {
    pub fn new(access_key: &'a str, secret_key: &'a str) -> Self {
        Self {
            access_key,
            secret_key,
        }
    }

    /// Add `X-Sdk-Date` and `Host` to `headers` and return the `Authorization` value.
    ///
    /// Header names in `headers` may use any case; all of them are signed.
    pub fn sign(
        &self,
        method: &str,
        url: &Url,
        headers: &mut BTreeMap<String, String>,
        body: &[u8],
        now: DateTime<Utc>,
    ) -> String {
        let sdk_date = now.format(SDK_DATE_FORMAT).to_string();
        headers.insert(SDK_DATE_HEADER.to_string(), sdk_date.clone());
        headers
            .entry("Host".to_string())
            .or_insert_with(|| host_header(url));

        let canonical_headers: BTreeMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.trim().to_string()))
            .collect();
        let signed_headers = canonical_headers
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(";");

        let canonical = canonical_request(method, url, &canonical_headers, &signed_headers, body);
        let string_to_sign = format!(
            "{SIGNING_ALGORITHM}\n{sdk_date}\n{}",
            sha256_hex(canonical.as_bytes())
        );
        let signature = self.hmac_hex(string_to_sign.as_bytes());

        format!(
            "{SIGNING_ALGORITHM} Access={}, SignedHeaders={signed_headers}, Signature={signature}",
            self.access_key
        )
    }

    fn hmac_hex(&self, data: &[u8]) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC accepts keys of any length - this should never happen");
        mac.update(data);
        format!("{:x}", mac.finalize().into_bytes())
    }
}

/// `host[:port]`, port only when it is not the scheme default
pub(crate) fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn canonical_request(
    method: &str,
    url: &Url,
    canonical_headers: &BTreeMap<String, String>,
    signed_headers: &str,
    body: &[u8],
) -> String {
    let mut uri = url.path().to_string();
    if !uri.ends_with('/') {
        uri.push('/');
    }

    let mut query: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (uri_escape(&k), uri_escape(&v)))
        .collect();
    query.sort();
    let query = query
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let headers: String = canonical_headers
        .iter()
        .map(|(k, v)| format!("{k}:{v}\n"))
        .collect();

    format!(
        "{}\n{uri}\n{query}\n{headers}\n{signed_headers}\n{}",
        method.to_uppercase(),
        sha256_hex(body)
    )
}

/// RFC 3986 escaping, unreserved characters pass through
fn uri_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                escaped.push(char::from(byte));
            }
            _ => escaped.push_str(&format!("%{byte:02X}")),
        }
    }
    escaped
}
