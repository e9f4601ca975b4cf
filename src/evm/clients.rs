//! Per-chain RPC client cache
//!
//! Clients are built lazily on the first request for a chain ID and live as long
//! as the cache. Construction happens under the map's entry lock, so concurrent
//! first requests for the same chain build exactly one client and every caller
//! gets that same handle back.

use dashmap::DashMap;
use ethers::providers::{Http, Provider};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::ChainError;
use crate::evm::chains::{ChainRegistry, Network};

/// Shared, chain-bound RPC client. Handlers borrow it per call.
pub type ClientHandle = Arc<EvmClient>;

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where a client's endpoint came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointOrigin {
    Env,
    Config,
    Registry,
}

impl fmt::Display for EndpointOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointOrigin::Env => f.write_str("env"),
            EndpointOrigin::Config => f.write_str("config"),
            EndpointOrigin::Registry => f.write_str("registry"),
        }
    }
}

/// JSON-RPC client bound to one chain's endpoint
#[derive(Debug)]
pub struct EvmClient {
    chain_id: u64,
    origin: EndpointOrigin,
    rpc_url: String,
    provider: Provider<Http>,
}

impl EvmClient {
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn origin(&self) -> EndpointOrigin {
        self.origin
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn provider(&self) -> &Provider<Http> {
        &self.provider
    }
}

/// Cache of [`EvmClient`]s keyed by resolved chain ID.
///
/// Endpoint precedence at construction time: the chain's `<NAME>_RPC_URL`
/// environment variable (when non-empty), then configured overrides, then the
/// registry default.
pub struct ClientCache {
    registry: Arc<ChainRegistry>,
    overrides: HashMap<u64, String>,
    env: EnvLookup,
    clients: DashMap<u64, ClientHandle>,
    constructed: AtomicUsize,
}

impl ClientCache {
    pub fn new(registry: Arc<ChainRegistry>) -> Self {
        Self {
            registry,
            overrides: HashMap::new(),
            env: Arc::new(|key| std::env::var(key).ok()),
            clients: DashMap::new(),
            constructed: AtomicUsize::new(0),
        }
    }

    /// Endpoint overrides from configuration, keyed by chain ID.
    pub fn with_overrides(mut self, overrides: HashMap<u64, String>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Replace the environment lookup (tests inject a map here).
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(lookup);
        self
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    /// Resolve a network selector leniently and return its client.
    pub fn get_client(&self, network: Option<&Network>) -> Result<ClientHandle, ChainError> {
        self.client_for(self.registry.resolve_chain_id(network))
    }

    /// Client for an already-resolved chain ID, built on first use.
    pub fn client_for(&self, chain_id: u64) -> Result<ClientHandle, ChainError> {
        if let Some(existing) = self.clients.get(&chain_id) {
            return Ok(Arc::clone(existing.value()));
        }

        let entry = self
            .clients
            .entry(chain_id)
            .or_try_insert_with(|| self.construct(chain_id))?;
        Ok(Arc::clone(entry.value()))
    }

    /// Endpoint a new client for `chain_id` would be bound to.
    pub fn endpoint_for(&self, chain_id: u64) -> Result<(String, EndpointOrigin), ChainError> {
        let env_key = match self.registry.get(chain_id) {
            Some(def) => def.rpc_env_key(),
            None => format!("CHAIN_{}_RPC_URL", chain_id),
        };

        if let Some(url) = (self.env)(&env_key).filter(|url| !url.trim().is_empty()) {
            return Ok((url.trim().to_string(), EndpointOrigin::Env));
        }
        if let Some(url) = self.overrides.get(&chain_id) {
            return Ok((url.clone(), EndpointOrigin::Config));
        }
        self.registry
            .rpc_url(chain_id)
            .map(|url| (url.to_string(), EndpointOrigin::Registry))
            .ok_or_else(|| {
                ChainError::construction(
                    chain_id,
                    format!("no RPC endpoint known; set {}", env_key),
                )
            })
    }

    fn construct(&self, chain_id: u64) -> Result<ClientHandle, ChainError> {
        let (rpc_url, origin) = self.endpoint_for(chain_id).inspect_err(|e| {
            tracing::error!(chain_id, error = %e, "no endpoint for chain");
        })?;

        if !(rpc_url.starts_with("https://") || rpc_url.starts_with("http://")) {
            tracing::error!(chain_id, %origin, "RPC endpoint is not an http(s) URL");
            return Err(ChainError::construction(
                chain_id,
                format!("RPC endpoint from {} is not an http(s) URL", origin),
            ));
        }

        let provider = Provider::<Http>::try_from(rpc_url.as_str()).map_err(|e| {
            tracing::error!(chain_id, %origin, error = %e, "invalid RPC endpoint");
            ChainError::construction(chain_id, format!("invalid RPC URL from {}: {}", origin, e))
        })?;

        self.constructed.fetch_add(1, Ordering::SeqCst);
        tracing::info!(chain_id, %origin, "constructed RPC client");

        Ok(Arc::new(EvmClient {
            chain_id,
            origin,
            rpc_url,
            provider,
        }))
    }

    /// Number of cached clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Total clients ever constructed by this cache
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::SeqCst)
    }
}
