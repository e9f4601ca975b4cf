//! EVM chain registry and network name resolution
//!
//! Holds the static set of supported EVM networks, the alias table used to turn
//! free-form network identifiers into chain IDs, and the accessor that hands tool
//! handlers a full chain configuration.
//!
//! Resolution is deliberately forgiving: integers pass through untouched, strings
//! are matched case-insensitively against the alias table, and anything else lands
//! on Ethereum mainnet. Callers that want typos rejected use [`ChainRegistry::try_resolve`]
//! with `strict` set.

use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::error::ChainError;

/// Chain used when no network is given or a name cannot be resolved.
pub const DEFAULT_CHAIN_ID: u64 = 1;

/// One supported EVM network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainDefinition {
    pub id: u64,
    /// Canonical lowercase name; always an alias and the base of the RPC env key
    pub slug: &'static str,
    pub name: &'static str,
    pub native_currency_symbol: &'static str,
    pub native_currency_decimals: u8,
    pub default_rpc_url: &'static str,
    pub explorer_url: &'static str,
    pub is_testnet: bool,
}

impl ChainDefinition {
    /// Environment variable that overrides this chain's RPC endpoint,
    /// e.g. `BSC_TESTNET_RPC_URL`.
    pub fn rpc_env_key(&self) -> String {
        format!("{}_RPC_URL", self.slug.to_uppercase().replace('-', "_"))
    }
}

const fn chain(
    id: u64,
    slug: &'static str,
    name: &'static str,
    symbol: &'static str,
    rpc: &'static str,
    explorer: &'static str,
    is_testnet: bool,
) -> ChainDefinition {
    ChainDefinition {
        id,
        slug,
        name,
        native_currency_symbol: symbol,
        native_currency_decimals: 18,
        default_rpc_url: rpc,
        explorer_url: explorer,
        is_testnet,
    }
}

/// Every network the EVM tools can talk to without extra configuration.
pub static CHAINS: &[ChainDefinition] = &[
    // Mainnets
    chain(1, "ethereum", "Ethereum", "ETH", "https://eth.llamarpc.com", "https://etherscan.io", false),
    chain(10, "optimism", "OP Mainnet", "ETH", "https://mainnet.optimism.io", "https://optimistic.etherscan.io", false),
    chain(42161, "arbitrum", "Arbitrum One", "ETH", "https://arb1.arbitrum.io/rpc", "https://arbiscan.io", false),
    chain(8453, "base", "Base", "ETH", "https://mainnet.base.org", "https://basescan.org", false),
    chain(137, "polygon", "Polygon", "MATIC", "https://polygon-rpc.com", "https://polygonscan.com", false),
    chain(56, "bsc", "BNB Smart Chain", "BNB", "https://bsc-dataseed.binance.org", "https://bscscan.com", false),
    chain(204, "opbnb", "opBNB", "BNB", "https://opbnb-mainnet-rpc.bnbchain.org", "https://opbnb.bscscan.com", false),
    chain(4689, "iotex", "IoTeX", "IOTX", "https://babel-api.mainnet.iotex.io", "https://iotexscan.io", false),
    chain(43114, "avalanche", "Avalanche C-Chain", "AVAX", "https://api.avax.network/ext/bc/C/rpc", "https://snowtrace.io", false),
    chain(250, "fantom", "Fantom", "FTM", "https://rpc.ftm.tools", "https://ftmscan.com", false),
    chain(100, "gnosis", "Gnosis", "xDAI", "https://rpc.gnosischain.com", "https://gnosisscan.io", false),
    chain(324, "zksync", "zkSync Era", "ETH", "https://mainnet.era.zksync.io", "https://era.zksync.network", false),
    chain(59144, "linea", "Linea", "ETH", "https://rpc.linea.build", "https://lineascan.build", false),
    chain(534352, "scroll", "Scroll", "ETH", "https://rpc.scroll.io", "https://scrollscan.com", false),
    chain(1101, "polygon-zkevm", "Polygon zkEVM", "ETH", "https://zkevm-rpc.com", "https://zkevm.polygonscan.com", false),
    // Testnets
    chain(11155111, "sepolia", "Sepolia", "ETH", "https://sepolia.drpc.org", "https://sepolia.etherscan.io", true),
    chain(11155420, "optimism-sepolia", "OP Sepolia", "ETH", "https://sepolia.optimism.io", "https://sepolia-optimism.etherscan.io", true),
    chain(421614, "arbitrum-sepolia", "Arbitrum Sepolia", "ETH", "https://sepolia-rollup.arbitrum.io/rpc", "https://sepolia.arbiscan.io", true),
    chain(84532, "base-sepolia", "Base Sepolia", "ETH", "https://sepolia.base.org", "https://sepolia.basescan.org", true),
    chain(80002, "polygon-amoy", "Polygon Amoy", "POL", "https://rpc-amoy.polygon.technology", "https://amoy.polygonscan.com", true),
    chain(97, "bsc-testnet", "BNB Smart Chain Testnet", "tBNB", "https://data-seed-prebsc-1-s1.binance.org:8545", "https://testnet.bscscan.com", true),
    chain(5611, "opbnb-testnet", "opBNB Testnet", "tBNB", "https://opbnb-testnet-rpc.bnbchain.org", "https://testnet.opbnbscan.com", true),
    chain(4690, "iotex-testnet", "IoTeX Testnet", "IOTX", "https://babel-api.testnet.iotex.io", "https://testnet.iotexscan.io", true),
];

/// Extra spellings accepted on top of each chain's slug and decimal ID.
/// Every accepted spelling is listed explicitly; there is no fuzzy matching.
pub static NETWORK_ALIASES: &[(&str, u64)] = &[
    ("mainnet", 1),
    ("eth", 1),
    ("ethereum-mainnet", 1),
    ("op", 10),
    ("op-mainnet", 10),
    ("arb", 42161),
    ("arbitrum-one", 42161),
    ("base-mainnet", 8453),
    ("matic", 137),
    ("polygon-pos", 137),
    ("binance", 56),
    ("bnb", 56),
    ("bsc-mainnet", 56),
    ("op-bnb", 204),
    ("avax", 43114),
    ("avalanche-c", 43114),
    ("ftm", 250),
    ("xdai", 100),
    ("zksync-era", 324),
    ("zkevm", 1101),
    ("ethereum-sepolia", 11155111),
    ("sepolia-testnet", 11155111),
    ("op-sepolia", 11155420),
    ("arb-sepolia", 421614),
    ("amoy", 80002),
    ("polygon-testnet", 80002),
    ("bsctestnet", 97),
    ("bsc_testnet", 97),
    ("bnb-testnet", 97),
    ("opbnbtestnet", 5611),
    ("iotextestnet", 4690),
];

static BUILTIN: Lazy<ChainRegistry> = Lazy::new(|| ChainRegistry::assemble(CHAINS, NETWORK_ALIASES).0);

/// A user-supplied network selector: either a numeric chain ID or a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Network {
    Id(u64),
    Name(String),
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Id(id) => write!(f, "{}", id),
            Network::Name(name) => f.write_str(name),
        }
    }
}

impl From<u64> for Network {
    fn from(id: u64) -> Self {
        Network::Id(id)
    }
}

impl From<&str> for Network {
    fn from(name: &str) -> Self {
        Network::Name(name.to_string())
    }
}

/// Outcome of resolving a network selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub chain_id: u64,
    /// True when the default chain was substituted for a missing or unknown name
    pub fallback: bool,
}

/// Chain configuration handed to tool handlers.
///
/// Numeric IDs are trusted even when the registry does not know them, so consumers
/// must cope with the `Unknown` variant carrying nothing but the ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chain<'a> {
    Known(&'a ChainDefinition),
    Unknown { id: u64 },
}

impl<'a> Chain<'a> {
    pub fn id(&self) -> u64 {
        match self {
            Chain::Known(def) => def.id,
            Chain::Unknown { id } => *id,
        }
    }

    pub fn definition(&self) -> Option<&'a ChainDefinition> {
        match self {
            Chain::Known(def) => Some(def),
            Chain::Unknown { .. } => None,
        }
    }

    pub fn name(&self) -> Option<&'a str> {
        self.definition().map(|def| def.name)
    }

    pub fn native_currency_symbol(&self) -> Option<&'a str> {
        self.definition().map(|def| def.native_currency_symbol)
    }

    pub fn is_testnet(&self) -> Option<bool> {
        self.definition().map(|def| def.is_testnet)
    }

    /// Serializable view with only the populated fields
    pub fn summary(&self) -> ChainSummary {
        ChainSummary {
            id: self.id(),
            name: self.name().map(String::from),
            native_currency_symbol: self.native_currency_symbol().map(String::from),
            is_testnet: self.is_testnet(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainSummary {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_currency_symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_testnet: Option<bool>,
}

/// Lookup tables over a fixed set of chain definitions.
#[derive(Debug, Clone)]
pub struct ChainRegistry {
    chains: HashMap<u64, ChainDefinition>,
    aliases: HashMap<String, u64>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl ChainRegistry {
    /// The built-in registry of supported EVM networks.
    pub fn builtin() -> &'static ChainRegistry {
        &BUILTIN
    }

    /// Check the built-in tables for the invariants [`ChainRegistry::new`] enforces.
    pub fn validate_builtin() -> Result<(), ChainError> {
        Self::new(CHAINS, NETWORK_ALIASES).map(|_| ())
    }

    /// Build a registry, rejecting duplicate IDs, non-HTTPS endpoints, conflicting
    /// alias spellings and aliases that point at unregistered chains.
    pub fn new(chains: &[ChainDefinition], aliases: &[(&str, u64)]) -> Result<Self, ChainError> {
        let (registry, problems) = Self::assemble(chains, aliases);
        if problems.is_empty() {
            Ok(registry)
        } else {
            Err(ChainError::InvalidRegistry(problems.join("; ")))
        }
    }

    fn assemble(chains: &[ChainDefinition], aliases: &[(&str, u64)]) -> (Self, Vec<String>) {
        let mut problems = Vec::new();
        let mut by_id = HashMap::with_capacity(chains.len());

        for def in chains {
            if def.id == 0 {
                problems.push(format!("chain '{}' has id 0", def.slug));
            }
            if !def.default_rpc_url.starts_with("https://") {
                problems.push(format!("chain {} RPC URL is not https", def.id));
            }
            if by_id.insert(def.id, *def).is_some() {
                problems.push(format!("duplicate chain id {}", def.id));
            }
        }

        let generated = chains
            .iter()
            .flat_map(|def| [(def.slug.to_string(), def.id), (def.id.to_string(), def.id)]);
        let explicit = aliases.iter().map(|(name, id)| (name.to_string(), *id));

        let mut alias_map: HashMap<String, u64> = HashMap::new();
        for (name, id) in generated.chain(explicit) {
            let key = normalize(&name);
            if key.is_empty() {
                problems.push(format!("empty alias for chain {}", id));
                continue;
            }
            if !by_id.contains_key(&id) {
                problems.push(format!("alias '{}' points at unregistered chain {}", key, id));
            }
            match alias_map.insert(key.clone(), id) {
                Some(previous) if previous != id => {
                    problems.push(format!("alias '{}' maps to both {} and {}", key, previous, id))
                }
                _ => {}
            }
        }

        let registry = Self {
            chains: by_id,
            aliases: alias_map,
        };
        (registry, problems)
    }

    pub fn get(&self, chain_id: u64) -> Option<&ChainDefinition> {
        self.chains.get(&chain_id)
    }

    /// Registry default endpoint for a chain
    pub fn rpc_url(&self, chain_id: u64) -> Option<&'static str> {
        self.get(chain_id).map(|def| def.default_rpc_url)
    }

    /// Look up a name or alias, ignoring case.
    pub fn lookup_alias(&self, name: &str) -> Option<u64> {
        self.aliases.get(&normalize(name)).copied()
    }

    /// Resolve a selector, reporting whether the default chain was substituted.
    pub fn resolve(&self, network: Option<&Network>) -> Resolution {
        match network {
            Some(Network::Id(id)) => Resolution {
                chain_id: *id,
                fallback: false,
            },
            Some(Network::Name(name)) => match self.lookup_alias(name) {
                Some(chain_id) => Resolution {
                    chain_id,
                    fallback: false,
                },
                None => Resolution {
                    chain_id: DEFAULT_CHAIN_ID,
                    fallback: true,
                },
            },
            None => Resolution {
                chain_id: DEFAULT_CHAIN_ID,
                fallback: true,
            },
        }
    }

    pub fn resolve_chain_id(&self, network: Option<&Network>) -> u64 {
        self.resolve(network).chain_id
    }

    /// Like [`resolve`](Self::resolve), but in strict mode an unrecognised name is an
    /// error. A missing selector still means the default chain.
    pub fn try_resolve(
        &self,
        network: Option<&Network>,
        strict: bool,
    ) -> Result<Resolution, ChainError> {
        let resolution = self.resolve(network);
        match network {
            Some(Network::Name(name)) if strict && resolution.fallback => {
                Err(ChainError::UnknownNetwork {
                    input: name.clone(),
                })
            }
            _ => Ok(resolution),
        }
    }

    /// Chain configuration for an already-resolved ID.
    pub fn chain(&self, chain_id: u64) -> Chain<'_> {
        match self.get(chain_id) {
            Some(def) => Chain::Known(def),
            None => Chain::Unknown { id: chain_id },
        }
    }

    /// Resolve a selector and fetch its configuration.
    pub fn get_chain(&self, network: Option<&Network>) -> Chain<'_> {
        self.chain(self.resolve_chain_id(network))
    }

    /// All alias keys of a chain, sorted
    pub fn aliases_for(&self, chain_id: u64) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .aliases
            .iter()
            .filter(|(_, id)| **id == chain_id)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Registered chains, mainnets first, each group ordered by ID.
    pub fn chains(&self) -> Vec<&ChainDefinition> {
        let mut defs: Vec<&ChainDefinition> = self.chains.values().collect();
        defs.sort_by_key(|def| (def.is_testnet, def.id));
        defs
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> &'static ChainRegistry {
        ChainRegistry::builtin()
    }

    fn name(s: &str) -> Network {
        Network::from(s)
    }

    /// Test that the built-in tables satisfy every registry invariant
    #[test]
    fn test_builtin_registry_is_valid() {
        assert!(ChainRegistry::validate_builtin().is_ok());
    }

    /// Test that the registry carries the expected mainnet and testnet IDs
    #[test]
    fn test_registry_contains_mainnets_and_testnets() {
        let mainnets = [1, 10, 42161, 8453, 137, 56, 204, 4689];
        let testnets = [11155111, 11155420, 421614, 84532, 80002, 97, 5611, 4690];

        for id in mainnets {
            let def = registry().get(id).unwrap();
            assert_eq!(def.id, id);
            assert!(!def.is_testnet, "{} should be a mainnet", id);
        }
        for id in testnets {
            let def = registry().get(id).unwrap();
            assert_eq!(def.id, id);
            assert!(def.is_testnet, "{} should be a testnet", id);
        }
    }

    /// Test that getChain returns the same ID for every registered chain
    #[test]
    fn test_get_chain_round_trips_every_registered_id() {
        for def in registry().chains() {
            assert_eq!(registry().get_chain(Some(&Network::Id(def.id))).id(), def.id);
        }
    }

    /// Test that no alias points at a chain missing from the registry
    #[test]
    fn test_no_dangling_aliases() {
        for (alias, id) in NETWORK_ALIASES {
            assert!(registry().get(*id).is_some(), "alias {} is dangling", alias);
        }
        for def in registry().chains() {
            for alias in registry().aliases_for(def.id) {
                let id = registry().lookup_alias(alias).unwrap();
                assert!(registry().get(id).is_some());
            }
        }
    }

    /// Test that every default endpoint is HTTPS
    #[test]
    fn test_default_rpc_urls_are_https() {
        for def in registry().chains() {
            assert!(def.default_rpc_url.starts_with("https://"), "{}", def.slug);
            assert_eq!(registry().rpc_url(def.id), Some(def.default_rpc_url));
        }
    }

    /// Test that Ethereum spellings all resolve to chain 1
    #[test]
    fn test_resolve_ethereum_spellings() {
        for input in ["ETHEREUM", "ethereum", "eth", "mainnet", "Ethereum", "1"] {
            assert_eq!(registry().resolve_chain_id(Some(&name(input))), 1, "{}", input);
        }
    }

    /// Test that separator variants of BSC testnet resolve to the same chain
    #[test]
    fn test_resolve_bsc_testnet_separator_variants() {
        assert_eq!(registry().resolve_chain_id(Some(&name("bsc-testnet"))), 97);
        assert_eq!(registry().resolve_chain_id(Some(&name("bsctestnet"))), 97);
        assert_eq!(registry().resolve_chain_id(Some(&name("BSC-Testnet"))), 97);
    }

    /// Test that missing and unknown networks fall back to mainnet
    #[test]
    fn test_resolve_fallback_to_default() {
        assert_eq!(registry().resolve_chain_id(None), DEFAULT_CHAIN_ID);
        assert_eq!(
            registry().resolve_chain_id(Some(&name("totally-unknown-xyz"))),
            DEFAULT_CHAIN_ID
        );

        let resolution = registry().resolve(Some(&name("ethereun")));
        assert!(resolution.fallback);
        assert_eq!(resolution.chain_id, 1);

        let resolution = registry().resolve(Some(&name("eth")));
        assert!(!resolution.fallback);
    }

    /// Test that numeric IDs pass through, registered or not
    #[test]
    fn test_resolve_numeric_pass_through() {
        assert_eq!(registry().resolve_chain_id(Some(&Network::Id(137))), 137);
        assert_eq!(registry().resolve_chain_id(Some(&Network::Id(999999))), 999999);
        assert!(!registry().resolve(Some(&Network::Id(999999))).fallback);
    }

    /// Test that strict resolution rejects unknown names only
    #[test]
    fn test_try_resolve_strict() {
        let err = registry()
            .try_resolve(Some(&name("ethereun")), true)
            .unwrap_err();
        assert!(matches!(err, ChainError::UnknownNetwork { ref input } if input == "ethereun"));

        assert_eq!(
            registry().try_resolve(Some(&name("ethereun")), false).unwrap().chain_id,
            1
        );
        assert_eq!(registry().try_resolve(None, true).unwrap().chain_id, 1);
        assert_eq!(
            registry().try_resolve(Some(&Network::Id(424242)), true).unwrap().chain_id,
            424242
        );
    }

    /// Test Polygon Amoy resolution and its native currency
    #[test]
    fn test_polygon_amoy_scenario() {
        assert_eq!(registry().resolve_chain_id(Some(&name("polygon-amoy"))), 80002);
        let chain = registry().get_chain(Some(&Network::Id(80002)));
        assert_eq!(chain.native_currency_symbol(), Some("POL"));
        assert_eq!(chain.is_testnet(), Some(true));
    }

    /// Test that an unregistered ID yields a minimal definition instead of failing
    #[test]
    fn test_get_chain_unknown_id() {
        let chain = registry().get_chain(Some(&Network::Id(999999999)));
        assert_eq!(chain, Chain::Unknown { id: 999999999 });
        assert!(chain.name().is_none());
        assert!(chain.native_currency_symbol().is_none());

        let json = serde_json::to_value(chain.summary()).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 999999999u64 }));
    }

    /// Test the env key derived from chain slugs
    #[test]
    fn test_rpc_env_key() {
        assert_eq!(registry().get(1).unwrap().rpc_env_key(), "ETHEREUM_RPC_URL");
        assert_eq!(registry().get(97).unwrap().rpc_env_key(), "BSC_TESTNET_RPC_URL");
    }

    /// Test that chains() lists mainnets before testnets
    #[test]
    fn test_chains_ordering() {
        let defs = registry().chains();
        assert_eq!(defs.len(), CHAINS.len());
        assert_eq!(defs[0].id, 1);
        let first_testnet = defs.iter().position(|d| d.is_testnet).unwrap();
        assert!(defs[first_testnet..].iter().all(|d| d.is_testnet));
    }

    /// Test that aliases_for includes slug, decimal ID and explicit aliases
    #[test]
    fn test_aliases_for() {
        let aliases = registry().aliases_for(137);
        assert!(aliases.contains(&"polygon"));
        assert!(aliases.contains(&"matic"));
        assert!(aliases.contains(&"137"));
    }

    /// Test that custom registries reject broken tables
    #[test]
    fn test_new_rejects_invalid_tables() {
        let good = chain(5, "demo", "Demo", "DEMO", "https://rpc.demo", "https://scan.demo", true);
        let insecure = chain(6, "plain", "Plain", "PLN", "http://rpc.plain", "https://scan.plain", true);

        assert!(ChainRegistry::new(&[good], &[("d", 5)]).is_ok());
        assert!(ChainRegistry::new(&[good, good], &[]).is_err());
        assert!(ChainRegistry::new(&[insecure], &[]).is_err());
        assert!(ChainRegistry::new(&[good], &[("ghost", 77)]).is_err());

        let other = chain(7, "other", "Other", "OTH", "https://rpc.other", "https://scan.other", false);
        let err = ChainRegistry::new(&[good, other], &[("Demo", 7)]).unwrap_err();
        assert!(err.to_string().contains("'demo'"));
    }

    /// Test that network selectors deserialize from numbers and strings
    #[test]
    fn test_network_deserialize() {
        let id: Network = serde_json::from_value(serde_json::json!(56)).unwrap();
        assert_eq!(id, Network::Id(56));
        let named: Network = serde_json::from_value(serde_json::json!("bsc")).unwrap();
        assert_eq!(named, Network::Name("bsc".to_string()));
        assert!(serde_json::from_value::<Network>(serde_json::json!(true)).is_err());
    }
}
