//! Risk Limits and the Risk Guard
//!
//! RiskLimits is the immutable per-cycle configuration every engine component
//! receives explicitly. The RiskGuard is the last gate before execution: it
//! re-validates each trade action against live wallet state, catching drift
//! between planning and submission.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::holding::NATIVE_MINT;
use crate::domain::plan::{TradeAction, TradeDirection};
use crate::domain::snapshot::PortfolioSnapshot;

#[derive(Debug, Error)]
pub enum RiskViolation {
    #[error("trade notional ${0} below minimum ${1}")]
    TradeTooSmall(Decimal, Decimal),

    #[error("trade notional ${0} exceeds maximum ${1}")]
    TradeTooLarge(Decimal, Decimal),

    #[error("slippage {0} bps exceeds budget {1} bps")]
    SlippageAboveLimit(u16, u16),

    #[error("buying {0} would raise its weight to {1}, above cap {2}")]
    AllocationExceeded(String, Decimal, Decimal),

    #[error("selling would leave {0} SOL, below gas reserve {1} SOL")]
    GasReserveBreached(Decimal, Decimal),

    #[error("invalid risk limits: {0}")]
    InvalidLimits(String),
}

/// Hard limits applied to every trade, immutable for the cycle's duration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    /// Largest single trade in USD
    pub max_trade_size_usd: Decimal,
    /// Smallest trade worth paying fees for, in USD
    pub min_trade_size_usd: Decimal,
    /// Slippage budget per swap, basis points
    pub max_slippage_bps: u16,
    /// Per-token share of the portfolio a BUY may not exceed
    pub max_portfolio_allocation: Decimal,
    /// Native token amount kept untraded to cover future transaction fees
    pub gas_buffer_sol: Decimal,
    /// Deviations at or below this band generate no trade
    pub weight_tolerance: Decimal,
    /// Weights below this are treated as dust
    pub min_weight_threshold: Decimal,
}

impl Default for RiskLimits {
    fn default() -> Self {
        RiskLimits {
            max_trade_size_usd: Decimal::from(1000),
            min_trade_size_usd: Decimal::from(10),
            max_slippage_bps: 100,
            max_portfolio_allocation: Decimal::new(25, 2),
            gas_buffer_sol: Decimal::new(1, 1),
            weight_tolerance: Decimal::new(2, 2),
            min_weight_threshold: Decimal::new(1, 2),
        }
    }
}

impl RiskLimits {
    pub fn validate(&self) -> Result<(), RiskViolation> {
        if self.min_trade_size_usd <= Decimal::ZERO {
            return Err(RiskViolation::InvalidLimits(
                "min_trade_size_usd must be positive".to_string(),
            ));
        }
        if self.max_trade_size_usd < self.min_trade_size_usd {
            return Err(RiskViolation::InvalidLimits(
                "max_trade_size_usd must be >= min_trade_size_usd".to_string(),
            ));
        }
        if self.max_slippage_bps == 0 || self.max_slippage_bps > 10_000 {
            return Err(RiskViolation::InvalidLimits(
                "max_slippage_bps must be in 1..=10000".to_string(),
            ));
        }
        if self.max_portfolio_allocation <= Decimal::ZERO
            || self.max_portfolio_allocation > Decimal::ONE
        {
            return Err(RiskViolation::InvalidLimits(
                "max_portfolio_allocation must be in (0, 1]".to_string(),
            ));
        }
        if self.gas_buffer_sol < Decimal::ZERO {
            return Err(RiskViolation::InvalidLimits(
                "gas_buffer_sol must not be negative".to_string(),
            ));
        }
        if self.weight_tolerance < Decimal::ZERO || self.weight_tolerance >= Decimal::ONE {
            return Err(RiskViolation::InvalidLimits(
                "weight_tolerance must be in [0, 1)".to_string(),
            ));
        }
        if self.min_weight_threshold < Decimal::ZERO || self.min_weight_threshold >= Decimal::ONE {
            return Err(RiskViolation::InvalidLimits(
                "min_weight_threshold must be in [0, 1)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rounding slack applied to the allocation-cap comparison
fn weight_epsilon() -> Decimal {
    Decimal::new(1, 9)
}

/// Pure per-action validation gate, run once right before submission
#[derive(Debug, Clone)]
pub struct RiskGuard {
    limits: RiskLimits,
    native_mint: String,
}

impl RiskGuard {
    pub fn new(limits: RiskLimits) -> Self {
        RiskGuard {
            limits,
            native_mint: NATIVE_MINT.to_string(),
        }
    }

    pub fn with_native_mint(mut self, mint: &str) -> Self {
        self.native_mint = mint.to_string();
        self
    }

    /// Checks size bounds, slippage budget, allocation cap, and gas reserve
    /// against the wallet state observed at execution time
    pub fn check(
        &self,
        action: &TradeAction,
        current: &PortfolioSnapshot,
    ) -> Result<(), RiskViolation> {
        if action.notional_usd < self.limits.min_trade_size_usd {
            return Err(RiskViolation::TradeTooSmall(
                action.notional_usd,
                self.limits.min_trade_size_usd,
            ));
        }
        if action.notional_usd > self.limits.max_trade_size_usd {
            return Err(RiskViolation::TradeTooLarge(
                action.notional_usd,
                self.limits.max_trade_size_usd,
            ));
        }
        if action.max_slippage_bps > self.limits.max_slippage_bps {
            return Err(RiskViolation::SlippageAboveLimit(
                action.max_slippage_bps,
                self.limits.max_slippage_bps,
            ));
        }

        match action.direction {
            TradeDirection::Buy => self.check_allocation(action, current),
            TradeDirection::Sell => self.check_gas_reserve(action, current),
        }
    }

    fn check_allocation(
        &self,
        action: &TradeAction,
        current: &PortfolioSnapshot,
    ) -> Result<(), RiskViolation> {
        // A swap moves value between tokens, total stays constant
        let resulting_weight = if current.total_value_usd.is_zero() {
            Decimal::ONE
        } else {
            (current.value_of(&action.mint) + action.notional_usd) / current.total_value_usd
        };
        if resulting_weight > self.limits.max_portfolio_allocation + weight_epsilon() {
            return Err(RiskViolation::AllocationExceeded(
                action.symbol.clone(),
                resulting_weight,
                self.limits.max_portfolio_allocation,
            ));
        }
        Ok(())
    }

    fn check_gas_reserve(
        &self,
        action: &TradeAction,
        current: &PortfolioSnapshot,
    ) -> Result<(), RiskViolation> {
        if action.mint != self.native_mint {
            return Ok(());
        }
        let holding = match current.holding(&self.native_mint) {
            Some(h) => h,
            None => {
                return Err(RiskViolation::GasReserveBreached(
                    Decimal::ZERO,
                    self.limits.gas_buffer_sol,
                ));
            }
        };
        let price = holding.implied_price();
        if price.is_zero() {
            return Err(RiskViolation::GasReserveBreached(
                Decimal::ZERO,
                self.limits.gas_buffer_sol,
            ));
        }
        let remaining_sol = (holding.usd_value - action.notional_usd) / price;
        if remaining_sol < self.limits.gas_buffer_sol {
            return Err(RiskViolation::GasReserveBreached(
                remaining_sol,
                self.limits.gas_buffer_sol,
            ));
        }
        Ok(())
    }
}
