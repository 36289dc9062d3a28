//! Trade Plan Generator
//!
//! Turns actionable weight deviations into an ordered, risk-bounded sequence
//! of trade actions. SELLs always precede BUYs so capital is freed before it
//! is committed, and every action independently satisfies the risk limits.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::holding::{NATIVE_MINT, USDC_MINT};
use crate::domain::risk::RiskLimits;
use crate::domain::snapshot::PortfolioSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeDirection {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeDirection::Buy => write!(f, "BUY"),
            TradeDirection::Sell => write!(f, "SELL"),
        }
    }
}

/// One executable trade instruction, immutable once planned
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAction {
    pub direction: TradeDirection,
    pub mint: String,
    pub symbol: String,
    /// Trade size in USD
    pub notional_usd: Decimal,
    /// Slippage budget handed to the executor, basis points
    pub max_slippage_bps: u16,
    /// Signed weight gap (target − current) that triggered the action
    pub deviation: Decimal,
}

/// Ordered sequence of trade actions, SELLs before BUYs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    actions: Vec<TradeAction>,
}

impl TradePlan {
    pub fn new(actions: Vec<TradeAction>) -> Self {
        TradePlan { actions }
    }

    pub fn actions(&self) -> &[TradeAction] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<TradeAction> {
        self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn sells(&self) -> impl Iterator<Item = &TradeAction> {
        self.actions
            .iter()
            .filter(|a| a.direction == TradeDirection::Sell)
    }

    pub fn buys(&self) -> impl Iterator<Item = &TradeAction> {
        self.actions
            .iter()
            .filter(|a| a.direction == TradeDirection::Buy)
    }

    pub fn total_sell_notional(&self) -> Decimal {
        self.sells().map(|a| a.notional_usd).sum()
    }

    pub fn total_buy_notional(&self) -> Decimal {
        self.buys().map(|a| a.notional_usd).sum()
    }
}

/// Builds trade plans from deviation sets under a fixed set of risk limits
#[derive(Debug, Clone)]
pub struct TradePlanner {
    limits: RiskLimits,
    native_mint: String,
    funding_mint: String,
}

impl TradePlanner {
    pub fn new(limits: RiskLimits) -> Self {
        TradePlanner {
            limits,
            native_mint: NATIVE_MINT.to_string(),
            funding_mint: USDC_MINT.to_string(),
        }
    }

    pub fn with_mints(mut self, native_mint: &str, funding_mint: &str) -> Self {
        self.native_mint = native_mint.to_string();
        self.funding_mint = funding_mint.to_string();
        self
    }

    /// Sizes, bounds, and orders the trades needed to close the given
    /// deviations against the current portfolio
    pub fn build(
        &self,
        deviations: &BTreeMap<String, Decimal>,
        current: &PortfolioSnapshot,
    ) -> TradePlan {
        let total = current.total_value_usd;
        if total <= Decimal::ZERO || deviations.is_empty() {
            return TradePlan::default();
        }

        let mut sells: Vec<TradeAction> = Vec::new();
        let mut buys: Vec<TradeAction> = Vec::new();

        for (mint, deviation) in deviations {
            let symbol = self.symbol_for(current, mint);
            let raw_notional = deviation.abs() * total;
            if raw_notional < self.limits.min_trade_size_usd {
                debug!(
                    "skipping {}: notional ${} below minimum ${}",
                    symbol, raw_notional, self.limits.min_trade_size_usd
                );
                continue;
            }
            let notional = raw_notional.min(self.limits.max_trade_size_usd);

            if *deviation > Decimal::ZERO {
                if let Some(action) =
                    self.bounded_buy(mint, &symbol, notional, *deviation, current)
                {
                    buys.push(action);
                }
            } else if let Some(action) =
                self.bounded_sell(mint, &symbol, notional, *deviation, current)
            {
                sells.push(action);
            }
        }

        self.scale_buys_to_funding(&mut buys, &sells, current);

        let by_notional_desc = |a: &TradeAction, b: &TradeAction| {
            b.notional_usd
                .cmp(&a.notional_usd)
                .then_with(|| a.mint.cmp(&b.mint))
        };
        sells.sort_by(by_notional_desc);
        buys.sort_by(by_notional_desc);

        let mut actions = sells;
        actions.append(&mut buys);
        TradePlan::new(actions)
    }

    /// Applies the per-token allocation cap; the buy shrinks so the post-trade
    /// weight lands exactly on the cap
    fn bounded_buy(
        &self,
        mint: &str,
        symbol: &str,
        notional: Decimal,
        deviation: Decimal,
        current: &PortfolioSnapshot,
    ) -> Option<TradeAction> {
        let cap_value = self.limits.max_portfolio_allocation * current.total_value_usd;
        let headroom = cap_value - current.value_of(mint);
        if headroom <= Decimal::ZERO {
            debug!(
                "skipping BUY {}: already at allocation cap {}",
                symbol, self.limits.max_portfolio_allocation
            );
            return None;
        }
        let bounded = notional.min(headroom);
        if bounded < self.limits.min_trade_size_usd {
            debug!(
                "skipping BUY {}: ${} left under the allocation cap is below minimum",
                symbol, bounded
            );
            return None;
        }
        if bounded < notional {
            debug!(
                "capping BUY {} from ${} to ${} at allocation cap {}",
                symbol, notional, bounded, self.limits.max_portfolio_allocation
            );
        }
        Some(self.action(TradeDirection::Buy, mint, symbol, bounded, deviation))
    }

    /// Caps a sell by the value actually held and, for the native token, by
    /// the gas reserve
    fn bounded_sell(
        &self,
        mint: &str,
        symbol: &str,
        notional: Decimal,
        deviation: Decimal,
        current: &PortfolioSnapshot,
    ) -> Option<TradeAction> {
        let held = current.value_of(mint);
        let ceiling = if mint == self.native_mint {
            self.sellable_native_value(current)
        } else {
            held
        };
        let bounded = notional.min(ceiling);
        if bounded < self.limits.min_trade_size_usd {
            debug!(
                "skipping SELL {}: ${} sellable is below minimum ${}",
                symbol, bounded, self.limits.min_trade_size_usd
            );
            return None;
        }
        if bounded < notional {
            debug!("capping SELL {} from ${} to ${}", symbol, notional, bounded);
        }
        Some(self.action(TradeDirection::Sell, mint, symbol, bounded, deviation))
    }

    /// USD value of the native holding above the gas reserve
    fn sellable_native_value(&self, current: &PortfolioSnapshot) -> Decimal {
        let holding = match current.holding(&self.native_mint) {
            Some(h) => h,
            None => return Decimal::ZERO,
        };
        let price = holding.implied_price();
        if price.is_zero() {
            return Decimal::ZERO;
        }
        (holding.usd_value - self.limits.gas_buffer_sol * price).max(Decimal::ZERO)
    }

    /// Capital that can fund BUYs without touching the gas reserve: sell
    /// proceeds plus idle funding/native balance not already being sold
    fn scale_buys_to_funding(
        &self,
        buys: &mut Vec<TradeAction>,
        sells: &[TradeAction],
        current: &PortfolioSnapshot,
    ) {
        if buys.is_empty() {
            return;
        }

        let sold_of = |mint: &str| -> Decimal {
            sells
                .iter()
                .filter(|a| a.mint == mint)
                .map(|a| a.notional_usd)
                .sum()
        };
        let sell_proceeds: Decimal = sells.iter().map(|a| a.notional_usd).sum();
        let idle_funding =
            (current.value_of(&self.funding_mint) - sold_of(&self.funding_mint)).max(Decimal::ZERO);
        let idle_native =
            (self.sellable_native_value(current) - sold_of(&self.native_mint)).max(Decimal::ZERO);
        let available = sell_proceeds + idle_funding + idle_native;

        let demanded: Decimal = buys.iter().map(|a| a.notional_usd).sum();
        if demanded <= available {
            return;
        }
        if available <= Decimal::ZERO {
            debug!("dropping all {} BUYs: no funding available", buys.len());
            buys.clear();
            return;
        }

        let scale = available / demanded;
        debug!(
            "scaling {} BUYs by {} to fit ${} of available funding",
            buys.len(),
            scale,
            available
        );
        buys.retain_mut(|action| {
            action.notional_usd *= scale;
            if action.notional_usd < self.limits.min_trade_size_usd {
                debug!(
                    "dropping BUY {}: ${} after funding scale is below minimum",
                    action.symbol, action.notional_usd
                );
                false
            } else {
                true
            }
        });
    }

    fn symbol_for(&self, current: &PortfolioSnapshot, mint: &str) -> String {
        current
            .holding(mint)
            .map(|h| h.symbol.clone())
            .unwrap_or_else(|| mint.chars().take(8).collect())
    }

    fn action(
        &self,
        direction: TradeDirection,
        mint: &str,
        symbol: &str,
        notional_usd: Decimal,
        deviation: Decimal,
    ) -> TradeAction {
        TradeAction {
            direction,
            mint: mint.to_string(),
            symbol: symbol.to_string(),
            notional_usd,
            max_slippage_bps: self.limits.max_slippage_bps,
            deviation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::holding::TokenHolding;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    const MINT_A: &str = "AaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaA";
    const MINT_B: &str = "BbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbB";
    const MINT_C: &str = "CcccccccccccccccccccccccccccccccccccccccccC";

    fn sol_holding(ui_sol: Decimal, price: Decimal) -> TokenHolding {
        let lamports = crate::domain::holding::to_base_units(ui_sol, 9).unwrap();
        TokenHolding::new(
            NATIVE_MINT.to_string(),
            "SOL".to_string(),
            lamports,
            9,
            ui_sol * price,
        )
    }

    fn plain_holding(mint: &str, usd: Decimal) -> TokenHolding {
        TokenHolding::new(mint.to_string(), mint[..4].to_string(), 1_000_000, 6, usd)
    }

    fn snapshot(holdings: Vec<TokenHolding>) -> PortfolioSnapshot {
        PortfolioSnapshot::new("follower".to_string(), holdings, Utc::now())
    }

    fn deviations(entries: &[(&str, Decimal)]) -> BTreeMap<String, Decimal> {
        entries
            .iter()
            .map(|(m, d)| (m.to_string(), *d))
            .collect()
    }

    fn planner() -> TradePlanner {
        TradePlanner::new(RiskLimits::default())
    }

    #[test]
    fn test_empty_deviations_empty_plan() {
        let current = snapshot(vec![plain_holding(USDC_MINT, dec!(1000))]);
        let plan = planner().build(&BTreeMap::new(), &current);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_sub_minimum_candidates_are_dropped() {
        // 3% of $100 is $3, under the $10 minimum
        let current = snapshot(vec![plain_holding(USDC_MINT, dec!(100))]);
        let plan = planner().build(&deviations(&[(MINT_A, dec!(0.03))]), &current);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_oversize_notional_clamped_to_max() {
        let current = snapshot(vec![plain_holding(USDC_MINT, dec!(10000))]);
        let mut limits = RiskLimits::default();
        limits.max_portfolio_allocation = dec!(1);
        let plan = TradePlanner::new(limits).build(&deviations(&[(MINT_A, dec!(0.5))]), &current);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.actions()[0].notional_usd, dec!(1000));
    }

    #[test]
    fn test_buy_shrunk_to_allocation_cap_exactly() {
        // MintA at 20%, deviation pushes toward 40%, cap 25%
        let current = snapshot(vec![
            plain_holding(MINT_A, dec!(200)),
            plain_holding(USDC_MINT, dec!(800)),
        ]);
        let plan = planner().build(&deviations(&[(MINT_A, dec!(0.2))]), &current);
        assert_eq!(plan.len(), 1);
        let action = &plan.actions()[0];
        assert_eq!(action.notional_usd, dec!(50));
        let post_weight = (current.value_of(MINT_A) + action.notional_usd) / dec!(1000);
        assert_eq!(post_weight, dec!(0.25));
    }

    #[test]
    fn test_buy_at_cap_is_dropped() {
        let current = snapshot(vec![
            plain_holding(MINT_A, dec!(300)),
            plain_holding(USDC_MINT, dec!(700)),
        ]);
        let plan = planner().build(&deviations(&[(MINT_A, dec!(0.2))]), &current);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_native_sell_capped_by_gas_reserve() {
        // 1 SOL at $200; reserve 0.1 SOL leaves $180 sellable
        let current = snapshot(vec![sol_holding(dec!(1), dec!(200))]);
        let plan = planner().build(&deviations(&[(NATIVE_MINT, dec!(-0.95))]), &current);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.actions()[0].notional_usd, dec!(180.0));
    }

    #[test]
    fn test_sells_ordered_before_buys_by_descending_notional() {
        let mut limits = RiskLimits::default();
        limits.max_portfolio_allocation = dec!(1);
        let current = snapshot(vec![
            plain_holding(MINT_A, dec!(400)),
            plain_holding(MINT_B, dec!(300)),
            plain_holding(USDC_MINT, dec!(300)),
        ]);
        let plan = TradePlanner::new(limits).build(
            &deviations(&[
                (MINT_A, dec!(-0.2)),
                (MINT_B, dec!(-0.1)),
                (MINT_C, dec!(0.25)),
                (USDC_MINT, dec!(0.05)),
            ]),
            &current,
        );

        let directions: Vec<TradeDirection> =
            plan.actions().iter().map(|a| a.direction).collect();
        assert_eq!(
            directions,
            vec![
                TradeDirection::Sell,
                TradeDirection::Sell,
                TradeDirection::Buy,
                TradeDirection::Buy,
            ]
        );
        // Descending notional inside each direction
        assert_eq!(plan.actions()[0].notional_usd, dec!(200));
        assert_eq!(plan.actions()[1].notional_usd, dec!(100));
        assert_eq!(plan.actions()[2].notional_usd, dec!(250));
        assert_eq!(plan.actions()[3].notional_usd, dec!(50));
    }

    #[test]
    fn test_buys_scaled_down_to_available_funding() {
        let mut limits = RiskLimits::default();
        limits.max_portfolio_allocation = dec!(1);
        // $5000 in MintB, nothing else; SELL clamps to $1000 but BUY demand
        // is 2 x $1000
        let current = snapshot(vec![plain_holding(MINT_B, dec!(5000))]);
        let plan = TradePlanner::new(limits).build(
            &deviations(&[
                (MINT_B, dec!(-1)),
                (MINT_A, dec!(0.5)),
                (MINT_C, dec!(0.5)),
            ]),
            &current,
        );

        assert_eq!(plan.total_sell_notional(), dec!(1000));
        assert_eq!(plan.total_buy_notional(), dec!(1000));
        for buy in plan.buys() {
            assert_eq!(buy.notional_usd, dec!(500));
        }
    }

    #[test]
    fn test_idle_funding_counts_toward_buys() {
        let mut limits = RiskLimits::default();
        limits.max_portfolio_allocation = dec!(1);
        // No sells; the idle USDC balance funds the BUY as-is
        let current = snapshot(vec![
            plain_holding(USDC_MINT, dec!(600)),
            plain_holding(MINT_A, dec!(400)),
        ]);
        let plan = TradePlanner::new(limits).build(&deviations(&[(MINT_B, dec!(0.3))]), &current);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.actions()[0].notional_usd, dec!(300));
    }

    #[test]
    fn test_full_rebalance_scenario_sol_into_usdc() {
        // 100% SOL, target 50/50 SOL-USDC
        let current = snapshot(vec![sol_holding(dec!(5), dec!(200))]);
        let mut limits = RiskLimits::default();
        limits.max_portfolio_allocation = dec!(0.6);
        let plan = TradePlanner::new(limits).build(
            &deviations(&[(NATIVE_MINT, dec!(-0.5)), (USDC_MINT, dec!(0.5))]),
            &current,
        );

        assert_eq!(plan.len(), 2);
        let sell = &plan.actions()[0];
        assert_eq!(sell.direction, TradeDirection::Sell);
        assert_eq!(sell.mint, NATIVE_MINT);
        assert_eq!(sell.notional_usd, dec!(500));
        let buy = &plan.actions()[1];
        assert_eq!(buy.direction, TradeDirection::Buy);
        assert_eq!(buy.mint, USDC_MINT);
        assert_eq!(buy.notional_usd, dec!(500));
    }

    #[test]
    fn test_tiny_portfolio_yields_empty_plan() {
        // Half of $15 is under the $10 minimum
        let current = snapshot(vec![sol_holding(dec!(0.075), dec!(200))]);
        let plan = planner().build(
            &deviations(&[(NATIVE_MINT, dec!(-0.5)), (USDC_MINT, dec!(0.5))]),
            &current,
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_actions_carry_slippage_budget_and_deviation() {
        let mut limits = RiskLimits::default();
        limits.max_slippage_bps = 75;
        limits.max_portfolio_allocation = dec!(1);
        let current = snapshot(vec![plain_holding(USDC_MINT, dec!(1000))]);
        let plan = TradePlanner::new(limits).build(&deviations(&[(MINT_A, dec!(0.4))]), &current);
        let action = &plan.actions()[0];
        assert_eq!(action.max_slippage_bps, 75);
        assert_eq!(action.deviation, dec!(0.4));
    }
}
