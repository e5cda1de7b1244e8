//! Server list rewriting applied when a certificate is attached to a domain

use crate::constants::{HTTPS_PORT, HTTP_PORT};
use crate::provider::{Protocol, ServerEndpoint, WafDomainBinding, WafError};
use std::fmt;
use std::str::FromStr;

/// How the attached domain's origin servers are restated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerPolicy {
    /// HTTPS on 443 plus plain HTTP on 80, both to the existing origin address
    #[default]
    HttpsAndHttp,
    /// HTTPS on 443 only
    HttpsOnly,
    /// Keep the current server list untouched
    Preserve,
}

impl ServerPolicy {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerPolicy::HttpsAndHttp => "https-and-http",
            ServerPolicy::HttpsOnly => "https-only",
            ServerPolicy::Preserve => "preserve",
        }
    }

    /// Server list to send along with the new certificate id
    ///
    /// # Errors
    /// [`WafError::Validation`] when the domain has no server to take the origin address from.
    pub fn derive_servers(&self, binding: &WafDomainBinding) -> Result<Vec<ServerEndpoint>, WafError> {
        let Some(origin) = binding.servers.first() else {
            return Err(WafError::Validation(format!(
                "WAF domain {} has no origin server",
                binding.domain_id
            )));
        };

        let endpoint = |protocol: Protocol, port: u16| ServerEndpoint {
            client_protocol: protocol,
            server_protocol: protocol,
            address: origin.address.clone(),
            port,
        };

        Ok(match self {
            ServerPolicy::HttpsAndHttp => vec![
                endpoint(Protocol::Https, HTTPS_PORT),
                endpoint(Protocol::Http, HTTP_PORT),
            ],
            ServerPolicy::HttpsOnly => vec![endpoint(Protocol::Https, HTTPS_PORT)],
            ServerPolicy::Preserve => binding.servers.clone(),
        })
    }
}

impl fmt::Display for ServerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServerPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "https-and-http" => Ok(ServerPolicy::HttpsAndHttp),
            "https-only" => Ok(ServerPolicy::HttpsOnly),
            "preserve" => Ok(ServerPolicy::Preserve),
            other => Err(format!(
                "unknown server policy '{other}', expected https-and-http, https-only or preserve"
            )),
        }
    }
}
