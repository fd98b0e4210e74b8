//! Configuration Management
//!
//! Settings come from, in order of precedence: command-line flags, environment
//! variables, the JSON config file, and built-in defaults.

use crate::azure::client::DEFAULT_ARM_ENDPOINT;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const ENV_SUB_ID: &str = "SUB_ID";
pub const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
pub const ENV_ARM_ENDPOINT: &str = "ARM_ENDPOINT";
/// User-supplied client id, takes precedence over the webhook's
pub const ENV_WI_CLIENT_ID: &str = "WI_CLIENT_ID";
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Contents of the config file
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub subscription_id: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub arm_endpoint: Option<String>,
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub subscription_id: Option<String>,
    pub client_id: Option<String>,
    pub arm_endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub subscription_id: Option<String>,
    pub client_id: Option<String>,
    pub arm_endpoint: Url,
    pub timeout: Duration,
}

impl Settings {
    /// Subscription id, or an error telling the user where to set it
    pub fn require_subscription(&self) -> Result<&str> {
        self.subscription_id.as_deref().ok_or_else(|| {
            anyhow!(
                "No subscription configured. Set {} or use --subscription",
                ENV_SUB_ID
            )
        })
    }
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("azrg").join("config.json"))
    }

    /// Load configuration from the default location; a missing or unreadable file
    /// yields the defaults
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring config file: {:#}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Merge flags, environment (through `lookup`), and this file into settings
    pub fn resolve<F>(&self, overrides: Overrides, lookup: F) -> Result<Settings>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let subscription_id = overrides
            .subscription_id
            .or_else(|| env(ENV_SUB_ID))
            .or_else(|| env(ENV_SUBSCRIPTION_ID))
            .or_else(|| self.subscription_id.clone());

        let client_id = overrides
            .client_id
            .or_else(|| env(ENV_WI_CLIENT_ID))
            .or_else(|| env(ENV_CLIENT_ID))
            .or_else(|| self.client_id.clone());

        let endpoint = overrides
            .arm_endpoint
            .or_else(|| env(ENV_ARM_ENDPOINT))
            .or_else(|| self.arm_endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ARM_ENDPOINT.to_string());
        let arm_endpoint = Url::parse(&endpoint)
            .with_context(|| format!("Invalid ARM endpoint: {}", endpoint))?;

        let timeout_secs = overrides
            .timeout_secs
            .or(self.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(anyhow!("Timeout must be at least one second"));
        }

        Ok(Settings {
            subscription_id,
            client_id,
            arm_endpoint,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
