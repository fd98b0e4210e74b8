//! Azure API interaction module
//!
//! This module provides the pieces needed to talk to Azure Resource Manager
//! with a workload identity: authentication, HTTP client, and resource group
//! listing.
//!
//! # Module Structure
//!
//! - [`auth`] - Workload identity settings and the `azure_identity` credential built from them
//! - [`client`] - ARM client scoped to a subscription
//! - [`http`] - HTTP utilities for REST API calls
//! - [`resource_groups`] - Resource group listing with `nextLink` pagination
//!
//! # Example
//!
//! ```ignore
//! use azrg::azure::{auth, client::ArmClient, http::AzureHttpClient, resource_groups};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let http = AzureHttpClient::new(std::time::Duration::from_secs(30))?;
//!     let options = auth::WorkloadIdentityOptions::from_env(Some("my-client-id".into()))?;
//!     let credential = options.credential().await?;
//!     let endpoint = url::Url::parse("https://management.azure.com")?;
//!     let client = ArmClient::new("my-subscription", credential, http, endpoint)?;
//!     let groups = resource_groups::list_resource_groups(&client, &Default::default()).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod http;
pub mod resource_groups;
