//! Client configuration
//!
//! Values are resolved in this order, later sources winning:
//! 1. Built-in defaults (public testnet)
//! 2. JSON config file (`~/.dfinance/config.json` unless given explicitly)
//! 3. `DFI_REST_URL` / `DFI_CHAIN_ID` environment variables
//! 4. Command-line flags

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::address::DEFAULT_ADDRESS_PREFIX;
use crate::tx::DEFAULT_CHAIN_ID;
use crate::wallet::DEFAULT_DERIVATION_PATH;

/// Default public REST endpoint
pub const DEFAULT_REST_URL: &str = "https://rest.testnet.dfinance.co/";
/// Default gas limit
pub const DEFAULT_GAS: &str = "500000";

pub const REST_URL_ENV: &str = "DFI_REST_URL";
pub const CHAIN_ID_ENV: &str = "DFI_CHAIN_ID";

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Node REST endpoint
    pub rest_url: String,
    /// Chain id signed into transactions
    pub chain_id: String,
    /// Gas limit for transactions
    pub gas: String,
    /// BIP32 path for wallet keys
    pub derivation_path: String,
    /// Bech32 address prefix
    pub address_prefix: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            rest_url: DEFAULT_REST_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID.to_string(),
            gas: DEFAULT_GAS.to_string(),
            derivation_path: DEFAULT_DERIVATION_PATH.to_string(),
            address_prefix: DEFAULT_ADDRESS_PREFIX.to_string(),
        }
    }
}

impl ClientConfig {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".dfinance").join("config.json"))
    }

    /// Read a config file; missing keys keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Resolve defaults, file and environment. An explicit path must exist;
    /// the default path is used only when present.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Apply environment overrides using the given lookup
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(REST_URL_ENV) {
            debug!("REST URL overridden by {}", REST_URL_ENV);
            self.rest_url = url;
        }
        if let Some(chain_id) = lookup(CHAIN_ID_ENV) {
            debug!("Chain id overridden by {}", CHAIN_ID_ENV);
            self.chain_id = chain_id;
        }
        self
    }

    /// Write the config as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
    }
}
