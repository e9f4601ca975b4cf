//! Multichain MCP Server
//!
//! A Model Context Protocol (MCP) server exposing read-only blockchain queries.
//! EVM networks are reached through a registry of known chains, a forgiving network
//! name resolver and a lazily populated per-chain client cache. Cosmos SDK, Aptos,
//! Sui and Near are served by thin REST / JSON-RPC vendor modules.

pub mod config;
pub mod context;
pub mod envelope;
pub mod error;
pub mod evm;
pub mod server;
pub mod vendors;

pub use context::ServiceContext;
pub use error::ChainError;
pub use server::MultichainMcpHandler;
