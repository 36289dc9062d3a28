//! Tolerance Evaluator
//!
//! Compares current weights against the target and keeps only deviations
//! large enough to act on. The tolerance band is the anti-churn guarantee:
//! small drifts never generate trades, so repeated cycles against a stable
//! target converge to a no-op.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::domain::risk::RiskLimits;
use crate::domain::snapshot::PortfolioSnapshot;
use crate::domain::target::TargetPortfolio;

/// Signed weight deviations (target − current) exceeding the tolerance band.
///
/// A token missing from the target counts as target weight 0 (sell candidate)
/// unless its current weight is dust; a token missing from the current
/// portfolio counts as current weight 0 (buy candidate).
pub fn weight_deviations(
    current: &PortfolioSnapshot,
    target: &TargetPortfolio,
    limits: &RiskLimits,
) -> BTreeMap<String, Decimal> {
    let mut mints: BTreeSet<&str> = current.mints().collect();
    mints.extend(target.mints());

    let mut deviations = BTreeMap::new();
    for mint in mints {
        let current_weight = current.weight_of(mint);
        let target_weight = target.weight_of(mint);

        // Leftover dust positions the sources never held are not worth
        // liquidating
        if target_weight.is_zero() && current_weight < limits.min_weight_threshold {
            continue;
        }

        let deviation = target_weight - current_weight;
        if deviation.abs() <= limits.weight_tolerance {
            continue;
        }
        deviations.insert(mint.to_string(), deviation);
    }
    deviations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::holding::{TokenHolding, NATIVE_MINT, USDC_MINT};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn snapshot(positions: &[(&str, Decimal)]) -> PortfolioSnapshot {
        let holdings = positions
            .iter()
            .map(|(mint, usd)| {
                TokenHolding::new(mint.to_string(), mint[..4].to_string(), 1_000_000, 6, *usd)
            })
            .collect();
        PortfolioSnapshot::new("follower".to_string(), holdings, Utc::now())
    }

    fn target(weights: &[(&str, Decimal)]) -> TargetPortfolio {
        TargetPortfolio::from_weights(
            weights
                .iter()
                .map(|(m, w)| (m.to_string(), *w))
                .collect(),
        )
    }

    #[test]
    fn test_within_tolerance_produces_nothing() {
        let current = snapshot(&[(NATIVE_MINT, dec!(510)), (USDC_MINT, dec!(490))]);
        let target = target(&[(NATIVE_MINT, dec!(0.5)), (USDC_MINT, dec!(0.5))]);
        let deviations = weight_deviations(&current, &target, &RiskLimits::default());
        assert!(deviations.is_empty());
    }

    #[test]
    fn test_small_deviation_is_excluded() {
        // +0.01 deviation sits inside the 0.02 band
        let current = snapshot(&[(NATIVE_MINT, dec!(990)), (USDC_MINT, dec!(10))]);
        let target = target(&[(NATIVE_MINT, dec!(0.98)), (USDC_MINT, dec!(0.02))]);
        let deviations = weight_deviations(&current, &target, &RiskLimits::default());
        assert!(deviations.is_empty());
    }

    #[test]
    fn test_deviation_exactly_at_tolerance_is_excluded() {
        let current = snapshot(&[(NATIVE_MINT, dec!(990)), (USDC_MINT, dec!(10))]);
        let target = target(&[(NATIVE_MINT, dec!(0.97)), (USDC_MINT, dec!(0.03))]);
        let deviations = weight_deviations(&current, &target, &RiskLimits::default());
        assert!(deviations.is_empty());
    }

    #[test]
    fn test_large_deviation_is_kept_with_sign() {
        let current = snapshot(&[(NATIVE_MINT, dec!(1000))]);
        let target = target(&[(NATIVE_MINT, dec!(0.5)), (USDC_MINT, dec!(0.5))]);
        let deviations = weight_deviations(&current, &target, &RiskLimits::default());
        assert_eq!(deviations.get(NATIVE_MINT), Some(&dec!(-0.5)));
        assert_eq!(deviations.get(USDC_MINT), Some(&dec!(0.5)));
    }

    #[test]
    fn test_token_absent_from_current_is_full_buy_candidate() {
        let current = snapshot(&[(USDC_MINT, dec!(1000))]);
        let target = target(&[(USDC_MINT, dec!(0.9)), (NATIVE_MINT, dec!(0.1))]);
        let deviations = weight_deviations(&current, &target, &RiskLimits::default());
        assert_eq!(deviations.get(NATIVE_MINT), Some(&dec!(0.1)));
    }

    #[test]
    fn test_dust_holding_without_target_is_ignored() {
        // 0.5% leftover position, not in target, below the 1% dust threshold
        let current = snapshot(&[(USDC_MINT, dec!(995)), ("MintDust11", dec!(5))]);
        let target = target(&[(USDC_MINT, dec!(1))]);
        let deviations = weight_deviations(&current, &target, &RiskLimits::default());
        assert!(!deviations.contains_key("MintDust11"));
    }

    #[test]
    fn test_non_dust_holding_without_target_is_sell_candidate() {
        let current = snapshot(&[(USDC_MINT, dec!(900)), ("MintGone11", dec!(100))]);
        let target = target(&[(USDC_MINT, dec!(1))]);
        let deviations = weight_deviations(&current, &target, &RiskLimits::default());
        assert_eq!(deviations.get("MintGone11"), Some(&dec!(-0.1)));
    }
}
