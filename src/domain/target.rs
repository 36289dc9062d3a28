//! Target Portfolio Builder
//!
//! Blends the allocation weights of one or more source wallets into a single
//! target allocation for the follower wallet. The build is deterministic:
//! same snapshots in, same weights out, regardless of input order.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::debug;

use crate::domain::risk::RiskLimits;
use crate::domain::snapshot::PortfolioSnapshot;

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("insufficient source data: {0}")]
    InsufficientData(String),
}

/// How multiple source portfolios are combined into one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendStrategy {
    /// Every usable source contributes equally
    EqualWeight,
    /// Sources contribute proportionally to their total USD value
    ValueWeighted,
    /// Fresher snapshots contribute more, hyperbolic decay over snapshot age
    /// measured against the newest snapshot in the set
    RecencyWeighted { half_life_secs: u64 },
}

impl Default for BlendStrategy {
    fn default() -> Self {
        BlendStrategy::EqualWeight
    }
}

/// Blended allocation the follower should converge toward. Weights sum to 1
/// and iteration order is stable.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetPortfolio {
    weights: BTreeMap<String, Decimal>,
}

impl TargetPortfolio {
    pub fn from_weights(weights: BTreeMap<String, Decimal>) -> Self {
        TargetPortfolio { weights }
    }

    /// Target weight for `mint`, zero when the token is not in the target
    pub fn weight_of(&self, mint: &str) -> Decimal {
        self.weights.get(mint).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Decimal)> {
        self.weights.iter().map(|(m, w)| (m.as_str(), *w))
    }

    pub fn mints(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(|m| m.as_str())
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Builds a TargetPortfolio from source snapshots
#[derive(Debug, Clone, Default)]
pub struct TargetBuilder {
    strategy: BlendStrategy,
}

impl TargetBuilder {
    pub fn new(strategy: BlendStrategy) -> Self {
        TargetBuilder { strategy }
    }

    /// Blends the source snapshots into a normalized target allocation.
    ///
    /// Sources with zero total value are skipped; holdings below the dust
    /// threshold are excluded and each source renormalized before blending.
    pub fn build(
        &self,
        sources: &[PortfolioSnapshot],
        limits: &RiskLimits,
    ) -> Result<TargetPortfolio, TargetError> {
        if sources.is_empty() {
            return Err(TargetError::InsufficientData(
                "no source snapshots".to_string(),
            ));
        }

        let mut usable: Vec<(&PortfolioSnapshot, BTreeMap<String, Decimal>)> = Vec::new();
        for snapshot in sources {
            match normalized_weights(snapshot, limits.min_weight_threshold) {
                Some(weights) => usable.push((snapshot, weights)),
                None => {
                    debug!(
                        "excluding source {} from blend: zero value or all dust",
                        snapshot.owner
                    );
                }
            }
        }

        if usable.is_empty() {
            return Err(TargetError::InsufficientData(
                "no source with usable holdings".to_string(),
            ));
        }

        let factors = self.blend_factors(&usable);

        let mut blended: BTreeMap<String, Decimal> = BTreeMap::new();
        for ((_, weights), factor) in usable.iter().zip(factors.iter()) {
            for (mint, weight) in weights {
                *blended.entry(mint.clone()).or_default() += *factor * *weight;
            }
        }

        let total: Decimal = blended.values().copied().sum();
        if total.is_zero() {
            return Err(TargetError::InsufficientData(
                "blended weights sum to zero".to_string(),
            ));
        }
        for weight in blended.values_mut() {
            *weight /= total;
        }

        Ok(TargetPortfolio::from_weights(blended))
    }

    /// Per-source contribution factors, normalized to sum to 1
    fn blend_factors(
        &self,
        usable: &[(&PortfolioSnapshot, BTreeMap<String, Decimal>)],
    ) -> Vec<Decimal> {
        let raw: Vec<Decimal> = match self.strategy {
            BlendStrategy::EqualWeight => vec![Decimal::ONE; usable.len()],
            BlendStrategy::ValueWeighted => usable
                .iter()
                .map(|(snapshot, _)| snapshot.total_value_usd)
                .collect(),
            BlendStrategy::RecencyWeighted { half_life_secs } => {
                let newest = usable
                    .iter()
                    .map(|(snapshot, _)| snapshot.taken_at)
                    .max()
                    .unwrap_or_default();
                let half_life = Decimal::from(half_life_secs.max(1));
                usable
                    .iter()
                    .map(|(snapshot, _)| {
                        let age_secs = (newest - snapshot.taken_at).num_seconds().max(0);
                        Decimal::ONE / (Decimal::ONE + Decimal::from(age_secs) / half_life)
                    })
                    .collect()
            }
        };

        let total: Decimal = raw.iter().copied().sum();
        raw.into_iter().map(|factor| factor / total).collect()
    }
}

fn normalized_weights(
    snapshot: &PortfolioSnapshot,
    dust_threshold: Decimal,
) -> Option<BTreeMap<String, Decimal>> {
    if snapshot.total_value_usd <= Decimal::ZERO {
        return None;
    }

    let mut weights: BTreeMap<String, Decimal> = BTreeMap::new();
    for holding in snapshot.holdings() {
        let weight = holding.usd_value / snapshot.total_value_usd;
        if weight >= dust_threshold {
            weights.insert(holding.mint.clone(), weight);
        }
    }

    let total: Decimal = weights.values().copied().sum();
    if total.is_zero() {
        return None;
    }
    for weight in weights.values_mut() {
        *weight /= total;
    }
    Some(weights)
}
