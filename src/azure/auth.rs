//! Azure Authentication
//!
//! Resolves the workload identity settings injected into the pod and builds
//! the `azure_identity` credential from them. Token exchange and caching are
//! left to the SDK credential.

use anyhow::{anyhow, Context, Result};
use azure_core::auth::TokenCredential;
use azure_identity::WorkloadIdentityCredential;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Scope used by the `token` command when none is given
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Public cloud authority
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com/";

pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_FEDERATED_TOKEN_FILE: &str = "AZURE_FEDERATED_TOKEN_FILE";
pub const ENV_AUTHORITY_HOST: &str = "AZURE_AUTHORITY_HOST";

/// Settings fed to [`WorkloadIdentityCredential`]
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadIdentityOptions {
    pub client_id: String,
    pub tenant_id: String,
    pub token_file: PathBuf,
    pub authority_host: Url,
}

impl WorkloadIdentityOptions {
    /// Read options from the process environment
    pub fn from_env(client_id: Option<String>) -> Result<Self> {
        Self::from_lookup(client_id, |key| std::env::var(key).ok())
    }

    /// Read options through `lookup`. The client id is already resolved by
    /// [`crate::config::Config::resolve`]; empty values count as unset.
    pub fn from_lookup<F>(client_id: Option<String>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let client_id = client_id
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No client id for workload identity. Set {} or {}",
                    crate::config::ENV_WI_CLIENT_ID,
                    crate::config::ENV_CLIENT_ID
                )
            })?;
        let tenant_id =
            get(ENV_TENANT_ID).ok_or_else(|| anyhow!("{} is not set", ENV_TENANT_ID))?;
        let token_file = get(ENV_FEDERATED_TOKEN_FILE)
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("{} is not set", ENV_FEDERATED_TOKEN_FILE))?;

        let mut authority = get(ENV_AUTHORITY_HOST).unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());
        if !authority.ends_with('/') {
            authority.push('/');
        }
        let authority_host = Url::parse(&authority)
            .with_context(|| format!("Invalid {}: {}", ENV_AUTHORITY_HOST, authority))?;

        Ok(Self {
            client_id,
            tenant_id,
            token_file,
            authority_host,
        })
    }

    /// Build the SDK credential, reading the projected service-account token
    pub async fn credential(&self) -> Result<Arc<dyn TokenCredential>> {
        let assertion = tokio::fs::read_to_string(&self.token_file)
            .await
            .with_context(|| {
                format!(
                    "Failed to read federated token file {}",
                    self.token_file.display()
                )
            })?;

        tracing::debug!(
            "Workload identity: client {} in tenant {}",
            self.client_id,
            self.tenant_id
        );

        Ok(Arc::new(WorkloadIdentityCredential::new(
            azure_core::new_http_client(),
            self.authority_host.clone(),
            self.tenant_id.clone(),
            self.client_id.clone(),
            assertion.trim().to_string(),
        )))
    }
}
