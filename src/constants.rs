//! # Constants
//!
//! Shared constants used throughout the webhook.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default port of the TLS admission webhook server
pub const DEFAULT_WEBHOOK_PORT: u16 = 8443;

/// Default path to the webhook's own TLS certificate
pub const DEFAULT_TLS_CERT_FILE: &str = "/etc/webhook/certs/tls.crt";

/// Default path to the webhook's own TLS private key
pub const DEFAULT_TLS_KEY_FILE: &str = "/etc/webhook/certs/tls.key";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Route the API server posts admission reviews to
pub const UPLOAD_CERT_PATH: &str = "/upload-cert-to-waf";

/// Default timeout for every outbound WAF / IAM request (seconds)
pub const DEFAULT_WAF_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Page size used when listing WAF certificates
pub const WAF_CERTIFICATE_PAGE_SIZE: usize = 100;

/// Re-authenticate when the cached IAM token expires within this window (seconds)
pub const IAM_TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// Default name of the secret holding OTC credentials
pub const DEFAULT_CREDENTIALS_SECRET_NAME: &str = "otc-credentials";

/// Default namespace of the secret holding OTC credentials
pub const DEFAULT_CREDENTIALS_SECRET_NAMESPACE: &str = "default";

/// Default prefix for the bookkeeping annotations, empty for the bare `cert-waf-id` / `waf-domain-id` keys
pub const DEFAULT_ANNOTATION_PREFIX: &str = "";

/// Suffix of the annotation carrying the WAF certificate id
pub const CERT_WAF_ID_KEY: &str = "cert-waf-id";

/// Suffix of the annotation carrying the target WAF domain id
pub const WAF_DOMAIN_ID_KEY: &str = "waf-domain-id";

/// Annotation cert-manager sets on the secrets it issues
pub const CERT_MANAGER_CERTIFICATE_NAME: &str = "cert-manager.io/certificate-name";

/// Data key of the PEM certificate chain in a TLS secret
pub const TLS_CERT_KEY: &str = "tls.crt";

/// Data key of the PEM private key in a TLS secret
pub const TLS_PRIVATE_KEY_KEY: &str = "tls.key";

/// HTTPS port exposed on a WAF domain
pub const HTTPS_PORT: u16 = 443;

/// HTTP port exposed on a WAF domain
pub const HTTP_PORT: u16 = 80;
