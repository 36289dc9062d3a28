//! Shadowfolio - Copy-Trading Portfolio Mirror Library
//!
//! Watches a set of source wallets on Solana, blends their allocations into
//! a target portfolio, and rebalances a follower wallet toward it with
//! risk-bounded Jupiter swaps.
//!
//! # Modules
//!
//! - `domain`: Core reconciliation logic (snapshots, targets, planning, risk)
//! - `ports`: Trait abstractions (SnapshotProvider, PriceProvider, SwapExecutor)
//! - `adapters`: External implementations (Solana RPC, Jupiter, Birdeye, CLI)
//! - `config`: Configuration loading and validation
//! - `application`: Execution coordinator and the mirror orchestrator

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
