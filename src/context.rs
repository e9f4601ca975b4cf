//! Service context shared by all tool handlers

use anyhow::{Context, Result};
use rmcp::ErrorData as McpError;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::evm::chains::{Chain, ChainRegistry, Network, Resolution};
use crate::evm::clients::{ClientCache, EndpointOrigin};

/// Everything a tool call needs: configuration, the chain registry, the EVM
/// client cache and a pooled HTTP client for the non-EVM vendors.
///
/// One context is created per server and handed to handlers by reference, so
/// independent instances (e.g. tests against different mock endpoints) never
/// share cached clients.
pub struct ServiceContext {
    config: Config,
    clients: ClientCache,
    http: reqwest::Client,
}

impl ServiceContext {
    /// Build a context over the built-in registry, applying configured RPC overrides.
    pub fn new(config: Config) -> Result<Self> {
        let registry = Arc::new(ChainRegistry::builtin().clone());
        let overrides = config.resolved_rpc_overrides(&registry)?;
        let clients = ClientCache::new(registry).with_overrides(overrides);
        Self::with_clients(config, clients)
    }

    /// Build a context around an existing client cache.
    pub fn with_clients(config: Config, clients: ClientCache) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("multichain-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            config,
            clients,
            http,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ChainRegistry {
        self.clients.registry()
    }

    pub fn clients(&self) -> &ClientCache {
        &self.clients
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Resolve a tool's `network` argument, honouring strict mode.
    ///
    /// In lenient mode an unrecognised name is logged and replaced by the default chain.
    pub fn resolve(&self, network: Option<&Network>) -> Result<Resolution, McpError> {
        let resolution = self
            .registry()
            .try_resolve(network, self.config.strict_network_resolution)
            .map_err(|e| McpError::invalid_params(e.to_string(), None))?;

        if resolution.fallback {
            match network {
                Some(requested) => tracing::warn!(
                    network = %requested,
                    chain_id = resolution.chain_id,
                    "unknown network, using default chain"
                ),
                None => tracing::debug!(chain_id = resolution.chain_id, "no network given, using default chain"),
            }
        }
        Ok(resolution)
    }

    pub fn chain(&self, chain_id: u64) -> Chain<'_> {
        self.registry().chain(chain_id)
    }

    /// Endpoint for a non-EVM vendor: environment variable, then config, then default.
    pub fn vendor_endpoint(&self, env_key: &str, configured: Option<&str>, default: &str) -> String {
        self.vendor_endpoint_with_origin(env_key, configured, default).0
    }

    /// Like [`vendor_endpoint`](Self::vendor_endpoint), also reporting which source won.
    ///
    /// Overrides may embed API keys, so callers report the origin, never the URL.
    pub fn vendor_endpoint_with_origin(
        &self,
        env_key: &str,
        configured: Option<&str>,
        default: &str,
    ) -> (String, EndpointOrigin) {
        let (url, origin) = match std::env::var(env_key).ok().filter(|url| !url.trim().is_empty()) {
            Some(url) => (url.trim().to_string(), EndpointOrigin::Env),
            None => match configured {
                Some(url) => (url.to_string(), EndpointOrigin::Config),
                None => (default.to_string(), EndpointOrigin::Registry),
            },
        };
        (url.trim_end_matches('/').to_string(), origin)
    }
}
