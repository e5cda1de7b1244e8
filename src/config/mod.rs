//! # Configuration
//!
//! Process configuration and OTC credentials.
//!
//! Everything here is resolved once at startup; the admission path only
//! sees the finished values through dependency injection.

mod credentials;
mod region;
mod webhook;

pub use credentials::{
    resolve_auth_method, AuthMethod, CredentialSource, KubeSecretSource, MountedDirSource,
};
pub use region::OtcRegion;
pub use webhook::WebhookConfig;
