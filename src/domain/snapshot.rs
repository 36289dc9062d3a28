//! Portfolio Snapshots
//!
//! Point-in-time view of one wallet: every token holding valued in USD at the
//! same instant. Snapshots are rebuilt from chain state each reconciliation
//! cycle and never mutated in place.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::holding::TokenHolding;

/// Immutable view of a wallet's holdings at one point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Wallet address the snapshot was taken from
    pub owner: String,
    /// One entry per distinct mint
    holdings: HashMap<String, TokenHolding>,
    /// Sum of all holdings' USD values, native token included
    pub total_value_usd: Decimal,
    /// When the snapshot was taken
    pub taken_at: DateTime<Utc>,
}

impl PortfolioSnapshot {
    /// Builds a snapshot, merging duplicate mint entries (a wallet can hold
    /// several token accounts for the same mint)
    pub fn new(owner: String, holdings: Vec<TokenHolding>, taken_at: DateTime<Utc>) -> Self {
        let mut merged: HashMap<String, TokenHolding> = HashMap::new();
        for holding in holdings {
            match merged.get_mut(&holding.mint) {
                Some(existing) => {
                    existing.amount = existing.amount.saturating_add(holding.amount);
                    existing.usd_value += holding.usd_value;
                }
                None => {
                    merged.insert(holding.mint.clone(), holding);
                }
            }
        }
        let total_value_usd = merged.values().map(|h| h.usd_value).sum();
        PortfolioSnapshot {
            owner,
            holdings: merged,
            total_value_usd,
            taken_at,
        }
    }

    pub fn holding(&self, mint: &str) -> Option<&TokenHolding> {
        self.holdings.get(mint)
    }

    pub fn holdings(&self) -> impl Iterator<Item = &TokenHolding> {
        self.holdings.values()
    }

    pub fn mints(&self) -> impl Iterator<Item = &str> {
        self.holdings.keys().map(|m| m.as_str())
    }

    pub fn len(&self) -> usize {
        self.holdings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// USD value held in `mint`, zero when absent
    pub fn value_of(&self, mint: &str) -> Decimal {
        self.holdings
            .get(mint)
            .map(|h| h.usd_value)
            .unwrap_or(Decimal::ZERO)
    }

    /// Share of total portfolio value held in `mint`, zero when absent or
    /// when the portfolio has no value
    pub fn weight_of(&self, mint: &str) -> Decimal {
        if self.total_value_usd.is_zero() {
            return Decimal::ZERO;
        }
        self.value_of(mint) / self.total_value_usd
    }
}
