//! Azure Resource Groups
//!
//! Listing resource groups of a subscription, following ARM's `nextLink`
//! continuation.

use super::client::ArmClient;
use crate::pager::{collect_pages, Pager};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resource Manager API version for resource groups
pub const API_VERSION: &str = "2021-04-01";

/// Resource group information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// One page of the list operation
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceGroupListResult {
    #[serde(default)]
    value: Vec<ResourceGroup>,
    #[serde(default)]
    next_link: Option<String>,
}

/// Optional narrowing of the list operation
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// OData filter, e.g. `tagName eq 'env' and tagValue eq 'prod'`
    pub filter: Option<String>,
    /// Page size hint
    pub top: Option<u32>,
}

/// Pager over the resource groups of the client's subscription
pub struct ResourceGroupsPager<'a> {
    client: &'a ArmClient,
    next_url: Option<String>,
}

impl<'a> ResourceGroupsPager<'a> {
    pub fn new(client: &'a ArmClient, options: &ListOptions) -> Result<Self> {
        let mut url = client.subscription_url("resourcegroups", API_VERSION)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(filter) = &options.filter {
                query.append_pair("$filter", filter);
            }
            if let Some(top) = options.top {
                query.append_pair("$top", &top.to_string());
            }
        }

        Ok(Self {
            client,
            next_url: Some(url.to_string()),
        })
    }
}

impl Pager for ResourceGroupsPager<'_> {
    type Item = ResourceGroup;
    type Error = anyhow::Error;

    fn more(&self) -> bool {
        self.next_url.is_some()
    }

    async fn next_page(&mut self) -> Result<Vec<ResourceGroup>> {
        // Cleared up front so a failed fetch ends the listing
        let Some(url) = self.next_url.take() else {
            return Ok(Vec::new());
        };

        let response = self.client.get(&url).await?;
        let page: ResourceGroupListResult =
            serde_json::from_value(response).context("Failed to parse resource group page")?;

        self.next_url = page.next_link.filter(|link| !link.is_empty());
        Ok(page.value)
    }
}

/// List all resource groups in the client's subscription
pub async fn list_resource_groups(
    client: &ArmClient,
    options: &ListOptions,
) -> Result<Vec<ResourceGroup>> {
    let mut pager = ResourceGroupsPager::new(client, options)?;
    let groups = collect_pages(&mut pager).await?;
    tracing::info!(
        "Listed {} resource groups in subscription {}",
        groups.len(),
        client.subscription_id()
    );
    Ok(groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_parses_arm_shape() {
        let page: ResourceGroupListResult = serde_json::from_value(json!({
            "value": [
                {
                    "id": "/subscriptions/sub/resourceGroups/rg-a",
                    "name": "rg-a",
                    "type": "Microsoft.Resources/resourceGroups",
                    "location": "westeurope",
                    "managedBy": "/subscriptions/sub/resourceGroups/aks/providers/Microsoft.ContainerService/managedClusters/aks",
                    "tags": {"env": "prod"},
                    "properties": {"provisioningState": "Succeeded"}
                },
                {"name": "rg-b"}
            ],
            "nextLink": "https://management.azure.com/subscriptions/sub/resourcegroups?api-version=2021-04-01&%24skiptoken=abc"
        }))
        .unwrap();

        assert_eq!(page.value.len(), 2);
        let first = &page.value[0];
        assert_eq!(first.location.as_deref(), Some("westeurope"));
        assert_eq!(
            first.tags.as_ref().and_then(|t| t.get("env")).map(String::as_str),
            Some("prod")
        );
        assert_eq!(
            first.properties.as_ref().and_then(|p| p.provisioning_state.as_deref()),
            Some("Succeeded")
        );
        assert!(first.managed_by.is_some());
        assert_eq!(page.value[1].name, "rg-b");
        assert!(page.next_link.is_some());
    }

    #[test]
    fn test_last_page_has_no_link() {
        let page: ResourceGroupListResult =
            serde_json::from_value(json!({"value": [{"name": "rg-a"}]})).unwrap();
        assert!(page.next_link.is_none());

        let page: ResourceGroupListResult =
            serde_json::from_value(json!({"nextLink": null})).unwrap();
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }

    #[test]
    fn test_serialize_skips_absent_fields() {
        let group = ResourceGroup {
            name: "rg-a".into(),
            id: None,
            location: Some("eastus".into()),
            managed_by: None,
            tags: None,
            properties: None,
        };
        assert_eq!(
            serde_json::to_value(&group).unwrap(),
            json!({"name": "rg-a", "location": "eastus"})
        );
    }
}
