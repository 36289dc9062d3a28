//! Ports Layer - Trait definitions for external dependencies
//!
//! This module defines the interfaces (ports) the adapters implement.
//! Following hexagonal architecture, these traits abstract:
//! - Wallet snapshots (balances priced in USD)
//! - Price lookup (single and batched)
//! - Swap execution (Jupiter or simulated)

pub mod execution;
pub mod mocks;
pub mod price;
pub mod snapshot;

pub use execution::{ExecutionError, SwapExecutor, SwapReceipt};
pub use price::{PriceError, PriceProvider};
pub use snapshot::{SnapshotError, SnapshotProvider};
