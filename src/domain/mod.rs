//! Domain Layer - Core reconciliation logic for the Shadowfolio mirror bot
//!
//! This module contains pure domain types and logic with no external
//! dependencies. All external interactions happen through the ports layer.
//!
//! ## Reconciliation pipeline
//!
//! - `holding` / `snapshot`: normalized wallet state, valued in USD per cycle
//! - `target`: blends source snapshots into one target allocation
//! - `tolerance`: keeps only deviations large enough to act on
//! - `plan`: sizes and orders the trades that close those deviations
//! - `risk`: the limits every trade obeys, re-checked before submission

pub mod holding;
pub mod plan;
pub mod risk;
pub mod snapshot;
pub mod target;
pub mod tolerance;

pub use holding::{TokenHolding, NATIVE_MINT, USDC_MINT};
pub use plan::{TradeAction, TradeDirection, TradePlan, TradePlanner};
pub use risk::{RiskGuard, RiskLimits, RiskViolation};
pub use snapshot::PortfolioSnapshot;
pub use target::{BlendStrategy, TargetBuilder, TargetError, TargetPortfolio};
pub use tolerance::weight_deviations;
