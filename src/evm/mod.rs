//! EVM vendor module: chain registry, per-chain client cache and the EVM tools

pub mod chains;
pub mod clients;
pub mod tools;

pub use chains::{Chain, ChainDefinition, ChainRegistry, Network, Resolution, DEFAULT_CHAIN_ID};
pub use clients::{ClientCache, ClientHandle, EndpointOrigin, EvmClient};
