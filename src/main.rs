//! # WAF Certificate Webhook
//!
//! Bootstrap for the admission webhook binary.
//!
//! Startup order:
//!
//! 1. Install the rustls crypto provider
//! 2. Load configuration (environment, then command-line flags)
//! 3. Initialize logging and metrics
//! 4. Start the metrics / probe server
//! 5. Resolve OTC credentials and build the WAF client
//! 6. Serve admission reviews over TLS

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use waf_cert_webhook::certificate::BookkeepingKeys;
use waf_cert_webhook::config::{
    resolve_auth_method, CredentialSource, KubeSecretSource, MountedDirSource, WebhookConfig,
};
use waf_cert_webhook::observability::{init_tracing, metrics};
use waf_cert_webhook::provider::otc::OtcWafClient;
use waf_cert_webhook::reconciler::CertificateReconciler;
use waf_cert_webhook::server::{start_server, ServerState};
use waf_cert_webhook::webhook::{run_webhook_server, AdmissionHandler};

/// Admission webhook syncing cert-manager TLS secrets to the OTC WAF
///
/// Flags override the matching environment variables.
#[derive(Debug, Parser)]
#[command(name = "waf-cert-webhook", version, about, long_about = None)]
struct Args {
    /// Port of the TLS admission webhook server
    #[arg(long)]
    port: Option<u16>,

    /// PEM certificate served by the webhook
    #[arg(long)]
    tls_cert_file: Option<PathBuf>,

    /// PEM private key matching the serving certificate
    #[arg(long)]
    tls_key_file: Option<PathBuf>,

    /// Port of the metrics and probe server
    #[arg(long)]
    metrics_port: Option<u16>,
}

impl Args {
    fn apply(self, config: &mut WebhookConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = self.tls_cert_file {
            config.tls_cert_file = path;
        }
        if let Some(path) = self.tls_key_file {
            config.tls_key_file = path;
        }
        if let Some(port) = self.metrics_port {
            config.metrics_port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Configure rustls crypto provider BEFORE any TLS connections
    // Use ring as the crypto provider for both the serving side and outbound clients
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    let args = Args::parse();
    let mut config = WebhookConfig::from_env().context("Failed to load configuration")?;
    args.apply(&mut config);

    init_tracing(&config.log_format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        build_time = env!("BUILD_DATETIME"),
        git_hash = env!("BUILD_GIT_HASH"),
        "Starting WAF certificate webhook"
    );
    info!(
        region = %config.region,
        waf_endpoint = %config.waf_endpoint,
        patch_target = %config.patch_target,
        server_policy = %config.server_policy,
        "Loaded configuration"
    );

    metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let metrics_port = config.metrics_port;
    let probe_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = start_server(metrics_port, probe_state).await {
            error!("HTTP server error: {}", e);
        }
    });

    let credentials: Box<dyn CredentialSource> = match &config.credentials_dir {
        Some(dir) => Box::new(MountedDirSource::new(dir)),
        None => {
            let client = kube::Client::try_default()
                .await
                .context("Failed to create Kubernetes client")?;
            Box::new(KubeSecretSource::new(
                client,
                &config.credentials_secret_namespace,
                &config.credentials_secret_name,
            ))
        }
    };
    let auth = resolve_auth_method(credentials.as_ref())
        .await
        .context("Failed to resolve OTC credentials")?;

    let waf = Arc::new(OtcWafClient::new(&config, auth).context("Failed to create WAF client")?);
    let reconciler = Arc::new(CertificateReconciler::new(
        Arc::clone(&waf) as _,
        waf,
        config.server_policy,
    ));
    let handler = Arc::new(AdmissionHandler::new(
        reconciler,
        BookkeepingKeys {
            certificate_id: config.cert_waf_id_annotation(),
            domain_id: config.waf_domain_id_annotation(),
        },
        config.patch_target,
    ));

    server_state.set_ready(true);

    run_webhook_server(handler, config.port, &config.tls_cert_file, &config.tls_key_file)
        .await
        .context("Webhook server failed")?;

    info!("Webhook server stopped");
    Ok(())
}
