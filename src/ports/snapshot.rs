//! Snapshot Provider Port
//!
//! Contract for fetching a wallet's priced holdings. Implementations live in
//! the adapters layer (Solana RPC + price resolution); tests use the mock.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::snapshot::PortfolioSnapshot;
use crate::ports::price::PriceError;

#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error(transparent)]
    Price(#[from] PriceError),
}

#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Fetches the wallet's current holdings with USD values resolved
    async fn snapshot(&self, owner: &str) -> Result<PortfolioSnapshot, SnapshotError>;
}
