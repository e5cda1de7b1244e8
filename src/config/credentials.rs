//! # OTC Credentials
//!
//! Resolves the authentication method used against the OTC identity service.
//!
//! Credentials are read once at startup, either from a Kubernetes `Secret`
//! (default `default/otc-credentials`) or from a directory where that secret
//! is mounted as one file per key. The raw key/value fields are then turned
//! into a tagged [`AuthMethod`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::{Api, Client};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// How the webhook authenticates against OTC
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub enum AuthMethod {
    /// IAM user/password, exchanged for a scoped token
    Password {
        username: String,
        password: String,
        domain_name: String,
        project_name: String,
    },
    /// Access key / secret key, every request is signed
    AccessKey {
        access_key: String,
        secret_key: String,
        project_name: String,
    },
}

impl fmt::Debug for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMethod::Password {
                username,
                domain_name,
                project_name,
                ..
            } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"***")
                .field("domain_name", domain_name)
                .field("project_name", project_name)
                .finish(),
            AuthMethod::AccessKey {
                access_key,
                project_name,
                ..
            } => f
                .debug_struct("AccessKey")
                .field("access_key", access_key)
                .field("secret_key", &"***")
                .field("project_name", project_name)
                .finish(),
        }
    }
}

impl AuthMethod {
    /// Resolve the auth method from raw credential fields.
    ///
    /// Access keys win when both an access key pair and a password are present.
    ///
    /// # Errors
    /// Returns an error naming the missing field when neither method is complete.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Result<Self> {
        let project_name = required(fields, &["projectName"])?;

        if has(fields, "accessKey") || has(fields, "secretKey") {
            return Ok(AuthMethod::AccessKey {
                access_key: required(fields, &["accessKey"])?,
                secret_key: required(fields, &["secretKey"])?,
                project_name,
            });
        }

        Ok(AuthMethod::Password {
            username: required(fields, &["username"])?,
            password: required(fields, &["password"])?,
            domain_name: required(fields, &["osDomainName", "domainName"])?,
            project_name,
        })
    }

    #[must_use]
    pub fn project_name(&self) -> &str {
        match self {
            AuthMethod::Password { project_name, .. }
            | AuthMethod::AccessKey { project_name, .. } => project_name,
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AuthMethod::Password { .. } => "password",
            AuthMethod::AccessKey { .. } => "access-key",
        }
    }
}

fn has(fields: &BTreeMap<String, String>, key: &str) -> bool {
    fields.get(key).is_some_and(|v| !v.trim().is_empty())
}

fn required(fields: &BTreeMap<String, String>, keys: &[&str]) -> Result<String> {
    keys.iter()
        .find_map(|key| {
            fields
                .get(*key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
        .ok_or_else(|| anyhow::anyhow!("OTC credentials are missing field '{}'", keys[0]))
}

/// Somewhere raw credential fields can be read from
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn fetch(&self) -> Result<BTreeMap<String, String>>;
}

/// Credentials stored in a Kubernetes secret, read through the API server
#[derive(Clone)]
pub struct KubeSecretSource {
    client: Client,
    namespace: String,
    name: String,
}

impl fmt::Debug for KubeSecretSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KubeSecretSource")
            .field("namespace", &self.namespace)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl KubeSecretSource {
    #[must_use]
    pub fn new(client: Client, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

#[async_trait]
impl CredentialSource for KubeSecretSource {
    async fn fetch(&self) -> Result<BTreeMap<String, String>> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), &self.namespace);
        let secret = secrets.get(&self.name).await.with_context(|| {
            format!(
                "Failed to read credentials secret {}/{}",
                self.namespace, self.name
            )
        })?;

        let mut fields = BTreeMap::new();
        for (key, value) in secret.data.unwrap_or_default() {
            let value = String::from_utf8(value.0)
                .with_context(|| format!("Credential field '{key}' is not valid UTF-8"))?;
            fields.insert(key, value);
        }
        for (key, value) in secret.string_data.unwrap_or_default() {
            fields.entry(key).or_insert(value);
        }

        info!(
            namespace = %self.namespace,
            name = %self.name,
            "Loaded OTC credentials from Kubernetes secret"
        );
        Ok(fields)
    }
}

/// Credentials mounted into the pod as a directory, one file per key
#[derive(Debug, Clone)]
pub struct MountedDirSource {
    dir: PathBuf,
}

impl MountedDirSource {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl CredentialSource for MountedDirSource {
    async fn fetch(&self) -> Result<BTreeMap<String, String>> {
        let mut fields = BTreeMap::new();
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .with_context(|| format!("Failed to read credentials dir {}", self.dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(key) = file_name.to_str() else {
                continue;
            };
            // Kubernetes secret volumes carry `..data` entries next to the keys
            if key.starts_with('.') || !is_file(&entry.path()).await {
                continue;
            }
            let value = tokio::fs::read_to_string(entry.path())
                .await
                .with_context(|| format!("Failed to read credential file '{key}'"))?;
            debug!(key = %key, "Read credential field from mounted file");
            fields.insert(key.to_string(), value.trim_end_matches(['\r', '\n']).to_string());
        }

        info!(dir = %self.dir.display(), "Loaded OTC credentials from mounted directory");
        Ok(fields)
    }
}

/// Follows symlinks, mounted keys point into the `..data` directory
async fn is_file(path: &std::path::Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}

/// Fetch fields from `source` and resolve the auth method
///
/// # Errors
/// Fails when the source cannot be read or the fields are incomplete.
pub async fn resolve_auth_method(source: &dyn CredentialSource) -> Result<AuthMethod> {
    let mut fields = source.fetch().await?;
    let auth = AuthMethod::from_fields(&fields);
    for value in fields.values_mut() {
        value.zeroize();
    }
    let auth = auth?;
    info!(method = auth.kind(), project = auth.project_name(), "Resolved OTC auth method");
    Ok(auth)
}
