//! Configuration management for the multichain MCP server

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::evm::chains::ChainRegistry;

/// Configuration for the multichain MCP server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Reject unknown network names instead of falling back to Ethereum mainnet
    #[serde(default)]
    pub strict_network_resolution: bool,

    /// EVM RPC overrides keyed by network name, alias or decimal chain ID
    /// (e.g. {"polygon": "https://...", "97": "https://..."})
    #[serde(default)]
    pub rpc_urls: HashMap<String, String>,

    /// Timeout for vendor REST and JSON-RPC calls
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub aptos_api_url: Option<String>,

    #[serde(default)]
    pub sui_rpc_url: Option<String>,

    #[serde(default)]
    pub near_rpc_url: Option<String>,

    /// Cosmos REST (LCD) overrides keyed by chain name (e.g. "osmosis")
    #[serde(default)]
    pub cosmos_rest_urls: HashMap<String, String>,
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strict_network_resolution: false,
            rpc_urls: HashMap::new(),
            request_timeout_secs: default_request_timeout_secs(),
            aptos_api_url: None,
            sui_rpc_url: None,
            near_rpc_url: None,
            cosmos_rest_urls: HashMap::new(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content = std::fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read config file: {}", path_ref.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path_ref.display()))?;
        tracing::info!(
            path = %path_ref.display(),
            strict = config.strict_network_resolution,
            "loaded config"
        );
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Tries `~/.multichain-mcp-config.json` first and falls back to defaults when it is
    /// missing or unreadable.
    pub fn load_default() -> Self {
        if let Ok(home) = std::env::var("HOME") {
            let default_path = format!("{}/.multichain-mcp-config.json", home);
            if Path::new(&default_path).exists() {
                match Self::from_file(&default_path) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!(path = %default_path, error = %format!("{:#}", e), "failed to parse config, using defaults");
                    }
                }
            }
        }

        tracing::info!("using default config");
        Self::default()
    }

    /// Map `rpc_urls` keys onto chain IDs.
    ///
    /// Decimal keys are taken as chain IDs; anything else must be a known network name
    /// or alias. Overrides never fall back to the default chain.
    pub fn resolved_rpc_overrides(&self, registry: &ChainRegistry) -> Result<HashMap<u64, String>> {
        let mut resolved = HashMap::with_capacity(self.rpc_urls.len());
        for (key, url) in &self.rpc_urls {
            let chain_id = match key.trim().parse::<u64>() {
                Ok(id) => id,
                Err(_) => match registry.lookup_alias(key) {
                    Some(id) => id,
                    None => bail!("Unknown network '{}' in rpc_urls", key),
                },
            };
            if let Some(previous) = resolved.insert(chain_id, url.clone()) {
                if previous != *url {
                    bail!("Conflicting rpc_urls entries for chain {}", chain_id);
                }
            }
        }
        Ok(resolved)
    }

    /// Save configuration to a file in JSON format.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path_ref = path.as_ref();
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        std::fs::write(path_ref, json)
            .with_context(|| format!("Failed to write config file: {}", path_ref.display()))?;

        Ok(())
    }
}
