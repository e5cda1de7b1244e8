//! # Webhook Configuration
//!
//! Process-level settings loaded from environment variables.

use super::OtcRegion;
use crate::reconciler::ServerPolicy;
use crate::webhook::PatchTarget;
use std::path::PathBuf;
use anyhow::Context;
use std::time::Duration;

/// Webhook configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Port of the TLS admission webhook server
    pub port: u16,
    /// PEM certificate served by the webhook itself
    pub tls_cert_file: PathBuf,
    /// PEM private key matching `tls_cert_file`
    pub tls_key_file: PathBuf,
    /// Port of the plain HTTP metrics and probe server
    pub metrics_port: u16,
    /// OTC region hosting the WAF
    pub region: OtcRegion,
    /// Name of the Kubernetes secret holding OTC credentials
    pub credentials_secret_name: String,
    /// Namespace of the Kubernetes secret holding OTC credentials
    pub credentials_secret_namespace: String,
    /// Directory with the credentials secret mounted as files
    /// When set, the Kubernetes API is not used for credentials
    pub credentials_dir: Option<PathBuf>,
    /// WAF API base URL, derived from the region unless overridden
    pub waf_endpoint: String,
    /// IAM API base URL, derived from the region unless overridden
    pub iam_endpoint: String,
    /// Timeout applied to every outbound WAF / IAM request (seconds)
    pub waf_request_timeout_secs: u64,
    /// Prefix of the bookkeeping annotations (`<prefix>cert-waf-id`, `<prefix>waf-domain-id`)
    pub annotation_prefix: String,
    /// Whether the resulting certificate id is patched into annotations or labels
    pub patch_target: PatchTarget,
    /// How the WAF domain's server list is rewritten on attachment
    pub server_policy: ServerPolicy,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        use crate::constants::*;
        let region = OtcRegion::default();
        Self {
            port: DEFAULT_WEBHOOK_PORT,
            tls_cert_file: PathBuf::from(DEFAULT_TLS_CERT_FILE),
            tls_key_file: PathBuf::from(DEFAULT_TLS_KEY_FILE),
            metrics_port: DEFAULT_METRICS_PORT,
            region,
            credentials_secret_name: DEFAULT_CREDENTIALS_SECRET_NAME.to_string(),
            credentials_secret_namespace: DEFAULT_CREDENTIALS_SECRET_NAMESPACE.to_string(),
            credentials_dir: None,
            waf_endpoint: region.waf_endpoint(),
            iam_endpoint: region.iam_endpoint(),
            waf_request_timeout_secs: DEFAULT_WAF_REQUEST_TIMEOUT_SECS,
            annotation_prefix: DEFAULT_ANNOTATION_PREFIX.to_string(),
            patch_target: PatchTarget::default(),
            server_policy: ServerPolicy::default(),
            log_format: "json".to_string(),
        }
    }
}

impl WebhookConfig {
    /// Load configuration from environment variables with defaults
    ///
    /// # Errors
    /// Fails when a variable is set to a value that does not parse, including
    /// an unsupported `OTC_REGION`.
    pub fn from_env() -> anyhow::Result<Self> {
        use crate::constants::*;

        let region = env_var_or_default_str("OTC_REGION", "eu-de")
            .parse::<OtcRegion>()
            .context("OTC_REGION")?;

        Ok(Self {
            port: env_var_or_default("WEBHOOK_PORT", DEFAULT_WEBHOOK_PORT)?,
            tls_cert_file: PathBuf::from(env_var_or_default_str(
                "TLS_CERT_FILE",
                DEFAULT_TLS_CERT_FILE,
            )),
            tls_key_file: PathBuf::from(env_var_or_default_str(
                "TLS_KEY_FILE",
                DEFAULT_TLS_KEY_FILE,
            )),
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT)?,
            region,
            credentials_secret_name: env_var_or_default_str(
                "OTC_CREDENTIALS_SECRET",
                DEFAULT_CREDENTIALS_SECRET_NAME,
            ),
            credentials_secret_namespace: env_var_or_default_str(
                "OTC_CREDENTIALS_NAMESPACE",
                DEFAULT_CREDENTIALS_SECRET_NAMESPACE,
            ),
            credentials_dir: std::env::var("OTC_CREDENTIALS_DIR")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            waf_endpoint: env_var_or_default_str("WAF_ENDPOINT", &region.waf_endpoint()),
            iam_endpoint: env_var_or_default_str("IAM_ENDPOINT", &region.iam_endpoint()),
            waf_request_timeout_secs: env_var_or_default(
                "WAF_REQUEST_TIMEOUT_SECS",
                DEFAULT_WAF_REQUEST_TIMEOUT_SECS,
            )?,
            annotation_prefix: env_var_or_default_str(
                "ANNOTATION_PREFIX",
                DEFAULT_ANNOTATION_PREFIX,
            ),
            patch_target: env_var_or_default("PATCH_TARGET", PatchTarget::default())?,
            server_policy: env_var_or_default("SERVER_POLICY", ServerPolicy::default())?,
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
        })
    }

    /// Get outbound request timeout duration
    #[must_use]
    pub fn waf_request_timeout(&self) -> Duration {
        Duration::from_secs(self.waf_request_timeout_secs)
    }

    /// Annotation carrying the WAF certificate id
    #[must_use]
    pub fn cert_waf_id_annotation(&self) -> String {
        format!("{}{}", self.annotation_prefix, crate::constants::CERT_WAF_ID_KEY)
    }

    /// Annotation carrying the target WAF domain id
    #[must_use]
    pub fn waf_domain_id_annotation(&self) -> String {
        format!("{}{}", self.annotation_prefix, crate::constants::WAF_DOMAIN_ID_KEY)
    }
}

/// Parse an environment variable, `default` when unset or empty
///
/// A value that is present but does not parse is an error naming the variable.
fn env_var_or_default<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid value '{raw}' for {key}: {e}")),
        _ => Ok(default),
    }
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
