//! # Certificate Fingerprinting
//!
//! Content-addressed identity for certificates.
//!
//! The fingerprint doubles as the certificate's name inside the WAF, which
//! turns "has this certificate been uploaded already" into a name lookup.
//! PEM text picks up CRLF line endings and trailing blank lines on its way
//! through Git, kubectl and cert-manager, so the bytes are normalized before
//! hashing and before upload.

use regex::bytes::Regex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::LazyLock;

static LINE_ENDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\r\n?").expect("Failed to compile line ending regex - this should never happen")
});

/// SHA-256 hex digest of normalized certificate bytes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CertificateFingerprint(String);

impl CertificateFingerprint {
    /// Hash already-normalized bytes
    #[must_use]
    pub fn of_normalized(normalized: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(normalized);
        Self(format!("{:x}", hasher.finalize()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertificateFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CertificateFingerprint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Normalized bytes together with their fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprinted {
    pub normalized: Vec<u8>,
    pub fingerprint: CertificateFingerprint,
}

/// Collapse CRLF / CR line endings to LF, strip surrounding whitespace and
/// terminate non-empty content with exactly one LF.
#[must_use]
pub fn normalize_pem(raw: &[u8]) -> Vec<u8> {
    let unified = LINE_ENDING.replace_all(raw, &b"\n"[..]);
    let trimmed = unified.trim_ascii();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let mut normalized = Vec::with_capacity(trimmed.len() + 1);
    normalized.extend_from_slice(trimmed);
    normalized.push(b'\n');
    normalized
}

/// Normalize `raw` and fingerprint the result
#[must_use]
pub fn fingerprint(raw: &[u8]) -> Fingerprinted {
    let normalized = normalize_pem(raw);
    let fingerprint = CertificateFingerprint::of_normalized(&normalized);
    Fingerprinted {
        normalized,
        fingerprint,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PEM_LF: &str = "-----BEGIN CERTIFICATE-----\nMIIBszCCAVmgAwIBAgIUJ\nQ2x0b2tlbg==\n-----END CERTIFICATE-----\n";

    #[test]
    fn test_crlf_and_lf_fingerprint_identically() {
        let crlf = PEM_LF.replace('\n', "\r\n");
        assert_eq!(
            fingerprint(PEM_LF.as_bytes()).fingerprint,
            fingerprint(crlf.as_bytes()).fingerprint
        );
    }

    #[test]
    fn test_trailing_blank_lines_are_ignored() {
        let padded = format!("{PEM_LF}\n\n");
        let bare = PEM_LF.trim_end();
        let a = fingerprint(padded.as_bytes());
        let b = fingerprint(bare.as_bytes());
        assert_eq!(a.fingerprint, b.fingerprint);
        assert_eq!(a.normalized, PEM_LF.as_bytes());
    }

    #[test]
    fn test_lone_carriage_returns_are_unified() {
        let cr = PEM_LF.replace('\n', "\r");
        assert_eq!(normalize_pem(cr.as_bytes()), PEM_LF.as_bytes());
    }

    #[test]
    fn test_different_content_differs() {
        let other = PEM_LF.replace("Q2x0", "Q2x1");
        assert_ne!(
            fingerprint(PEM_LF.as_bytes()).fingerprint,
            fingerprint(other.as_bytes()).fingerprint
        );
    }

    #[test]
    fn test_known_digest() {
        // sha256("abc\n")
        assert_eq!(
            fingerprint(b"abc\r\n").fingerprint.as_str(),
            "edeaaff3f1774ad2888673770c6d64097e391bc362d7d6fb34982ddf0efd18cb"
        );
    }

    #[test]
    fn test_empty_input() {
        let result = fingerprint(b" \r\n ");
        assert!(result.normalized.is_empty());
        assert_eq!(
            result.fingerprint.as_str(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
