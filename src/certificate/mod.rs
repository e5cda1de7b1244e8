//! # Certificate
//!
//! Certificate identity and the material derived from TLS secrets.

mod fingerprint;
mod material;

pub use fingerprint::{fingerprint, normalize_pem, CertificateFingerprint, Fingerprinted};
pub use material::{BookkeepingKeys, CertificateMaterial, MaterialError};
