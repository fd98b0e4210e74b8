//! Azure Resource Manager Client
//!
//! Main client for ARM requests, combining a token credential
//! with the HTTP layer for one subscription.

use super::http::AzureHttpClient;
use azure_core::auth::TokenCredential;
use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Public cloud Resource Manager endpoint
pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

/// Main ARM client, scoped to a subscription
#[derive(Clone)]
pub struct ArmClient {
    credential: Arc<dyn TokenCredential>,
    http: AzureHttpClient,
    subscription_id: String,
    endpoint: Url,
}

impl ArmClient {
    /// Create a new client. Fails if the subscription id is empty.
    pub fn new(
        subscription_id: &str,
        credential: Arc<dyn TokenCredential>,
        http: AzureHttpClient,
        endpoint: Url,
    ) -> Result<Self> {
        if subscription_id.trim().is_empty() {
            return Err(anyhow!("Subscription id must not be empty"));
        }

        Ok(Self {
            credential,
            http,
            subscription_id: subscription_id.to_string(),
            endpoint,
        })
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Token scope for this endpoint, e.g. `https://management.azure.com/.default`
    pub fn scope(&self) -> String {
        format!("{}/.default", self.endpoint.as_str().trim_end_matches('/'))
    }

    /// Make a GET request to an ARM URL
    pub async fn get(&self, url: &str) -> Result<Value> {
        let scope = self.scope();
        let token = self
            .credential
            .get_token(&[scope.as_str()])
            .await
            .context("Failed to acquire ARM access token")?;
        self.http.get(url, token.token.secret()).await
    }

    /// Build a subscription-scoped ARM URL with the given api-version
    pub fn subscription_url(&self, path: &str, api_version: &str) -> Result<Url> {
        let relative = format!(
            "subscriptions/{}/{}",
            urlencoding::encode(&self.subscription_id),
            path.trim_start_matches('/')
        );

        let mut base = self.endpoint.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }

        let mut url = base
            .join(&relative)
            .with_context(|| format!("Invalid ARM path: {}", relative))?;
        url.query_pairs_mut().append_pair("api-version", api_version);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azure_core::auth::{AccessToken, Secret};
    use time::OffsetDateTime;

    #[derive(Debug)]
    struct FixedCredential;

    #[async_trait::async_trait]
    impl TokenCredential for FixedCredential {
        async fn get_token(&self, _scopes: &[&str]) -> azure_core::Result<AccessToken> {
            Ok(AccessToken {
                token: Secret::new("unit-token"),
                expires_on: OffsetDateTime::now_utc() + time::Duration::hours(1),
            })
        }

        async fn clear_cache(&self) -> azure_core::Result<()> {
            Ok(())
        }
    }

    fn client(subscription: &str, endpoint: &str) -> Result<ArmClient> {
        ArmClient::new(
            subscription,
            Arc::new(FixedCredential),
            AzureHttpClient::new(std::time::Duration::from_secs(5))?,
            Url::parse(endpoint)?,
        )
    }

    #[test]
    fn test_empty_subscription_rejected() {
        assert!(client("  ", DEFAULT_ARM_ENDPOINT).is_err());
    }

    #[test]
    fn test_scope_from_endpoint() {
        let c = client("sub", DEFAULT_ARM_ENDPOINT).unwrap();
        assert_eq!(c.scope(), "https://management.azure.com/.default");

        let c = client("sub", "https://management.usgovcloudapi.net/").unwrap();
        assert_eq!(c.scope(), "https://management.usgovcloudapi.net/.default");
    }

    #[test]
    fn test_subscription_url() {
        let c = client("00000000-1111-2222-3333-444444444444", DEFAULT_ARM_ENDPOINT).unwrap();
        let url = c.subscription_url("resourcegroups", "2021-04-01").unwrap();
        assert_eq!(
            url.as_str(),
            "https://management.azure.com/subscriptions/00000000-1111-2222-3333-444444444444/resourcegroups?api-version=2021-04-01"
        );
    }

    #[test]
    fn test_subscription_url_keeps_endpoint_path() {
        let c = client("sub", "http://127.0.0.1:8080/arm").unwrap();
        let url = c.subscription_url("/resourcegroups", "2021-04-01").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:8080/arm/subscriptions/sub/resourcegroups?api-version=2021-04-01"
        );
    }

    #[test]
    fn test_subscription_id_is_escaped() {
        let c = client("a/b", DEFAULT_ARM_ENDPOINT).unwrap();
        let url = c.subscription_url("resourcegroups", "2021-04-01").unwrap();
        assert!(url.path().starts_with("/subscriptions/a%2Fb/"));
    }
}
