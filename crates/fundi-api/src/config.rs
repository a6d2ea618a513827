//! # Server Configuration
//!
//! JSON configuration for the server binary: engine knobs plus one
//! optional section per provider adapter. A deployment with no provider
//! sections gets the sandbox, which is the local-development default.

use serde::Deserialize;

use fundi_core::SettlementConfig;
use fundi_gateway::{MtnConfig, OrangeConfig};

/// Top-level server configuration.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Settlement engine knobs.
    pub engine: SettlementConfig,
    /// MTN Mobile Money adapter, when deployed.
    pub mtn: Option<MtnConfig>,
    /// Orange Money adapter, when deployed.
    pub orange: Option<OrangeConfig>,
    /// Webhook secret for the sandbox provider. Enabled when no real
    /// provider is configured, or alongside them when set.
    pub sandbox_secret: Option<String>,
    /// Fallback wallet MSISDN for users the directory does not know.
    /// Local-development convenience only.
    pub default_wallet_msisdn: Option<String>,
}

impl ServerConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }
}
