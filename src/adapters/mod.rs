//! Adapters Layer - External System Implementations
//!
//! This module contains implementations of the port traits:
//! - Jupiter: DEX aggregator client, wire types and price source
//! - Solana: RPC client, wallet management and the snapshot provider
//! - Birdeye: fallback price source
//! - Executors: live Jupiter execution and in-process paper fills
//! - CLI: command-line argument surface

pub mod birdeye;
pub mod cli;
pub mod executor;
pub mod jupiter;
pub mod paper;
pub mod registry;
pub mod solana;

pub use birdeye::{BirdeyeClient, FallbackPriceProvider};
pub use cli::CliApp;
pub use executor::JupiterSwapExecutor;
pub use jupiter::{JupiterClient, JupiterPriceProvider};
pub use paper::PaperSwapExecutor;
pub use registry::TokenRegistry;
pub use solana::{RpcSnapshotProvider, SolanaClient, WalletManager};
