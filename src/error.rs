//! Typed errors raised by the chain resolution and client layers

use thiserror::Error;

/// Errors produced while resolving networks or building chain clients.
#[derive(Debug, Error)]
pub enum ChainError {
    /// Only raised when strict network resolution is enabled; the lenient
    /// resolver falls back to the default chain instead.
    #[error("unknown network '{input}'")]
    UnknownNetwork { input: String },

    #[error("failed to construct client for chain {chain_id}: {reason}")]
    ClientConstruction { chain_id: u64, reason: String },

    #[error("invalid chain registry: {0}")]
    InvalidRegistry(String),
}

impl ChainError {
    pub(crate) fn construction(chain_id: u64, reason: impl std::fmt::Display) -> Self {
        Self::ClientConstruction {
            chain_id,
            reason: reason.to_string(),
        }
    }
}
