//! Umbrella error for the EVM client and the sync service.

use thiserror::Error;

use dataswap_core::error::{ConfigError, ContractError, DecodeError, ReconcileError, StoreError, TransportError};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

impl SyncError {
    /// Returns `true` if the failure was a chain or RPC timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout(),
            Self::Contract(ContractError::Transport { source, .. }) => source.is_timeout(),
            _ => false,
        }
    }
}
