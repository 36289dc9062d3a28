//! Token Holdings
//!
//! A holding is one token position inside a wallet snapshot: raw on-chain
//! amount plus the USD value resolved for the current reconciliation cycle.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Wrapped SOL mint, used as the native balance's token identity
pub const NATIVE_MINT: &str = "So11111111111111111111111111111111111111112";

/// USDC mint, the funding asset all swaps route through
pub const USDC_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Decimals of the native token (lamports per SOL)
pub const NATIVE_DECIMALS: u8 = 9;

/// Decimals of the funding asset
pub const USDC_DECIMALS: u8 = 6;

/// One token position in a wallet, valued in USD for the current cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenHolding {
    /// Mint address identifying the token
    pub mint: String,
    /// Display symbol (falls back to a shortened mint for unknown tokens)
    pub symbol: String,
    /// Raw amount in base units (smallest denomination)
    pub amount: u64,
    /// Number of base-unit digits after the decimal point
    pub decimals: u8,
    /// USD value at the prices of the current cycle, never carried stale
    pub usd_value: Decimal,
}

impl TokenHolding {
    pub fn new(
        mint: String,
        symbol: String,
        amount: u64,
        decimals: u8,
        usd_value: Decimal,
    ) -> Self {
        TokenHolding {
            mint,
            symbol,
            amount,
            decimals,
            usd_value,
        }
    }

    /// Human-readable amount (raw base units scaled by decimals)
    pub fn ui_amount(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.amount as i128, self.decimals as u32)
    }

    /// USD price per whole token implied by this holding's valuation
    pub fn implied_price(&self) -> Decimal {
        let ui = self.ui_amount();
        if ui.is_zero() {
            Decimal::ZERO
        } else {
            self.usd_value / ui
        }
    }

    pub fn is_native(&self) -> bool {
        self.mint == NATIVE_MINT
    }
}

/// 10^decimals as an exact Decimal, for base-unit conversions
pub fn base_unit_factor(decimals: u8) -> Decimal {
    Decimal::from_i128_with_scale(10i128.pow(decimals.min(28) as u32), 0)
}

/// Converts a UI-denominated amount to raw base units, truncating dust
pub fn to_base_units(ui_amount: Decimal, decimals: u8) -> Option<u64> {
    (ui_amount * base_unit_factor(decimals)).trunc().to_u64()
}
