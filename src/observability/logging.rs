//! # Logging
//!
//! `tracing` subscriber setup. `RUST_LOG` controls the filter, the format
//! is either `json` (default, one object per line) or `text`.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "waf_cert_webhook=info";

/// Install the global subscriber
///
/// # Errors
/// Fails when a global subscriber is already installed.
pub fn init_tracing(log_format: &str) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if log_format.eq_ignore_ascii_case("text") {
        builder.try_init()
    } else {
        builder
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .try_init()
    };

    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))
}
