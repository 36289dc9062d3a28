//! Paper Swap Executor
//!
//! In-process executor for paper trading. Fills every action without
//! touching the chain and hands back synthetic signatures, with an optional
//! failure probability for exercising a cycle's failure handling.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::domain::holding::USDC_MINT;
use crate::domain::plan::TradeAction;
use crate::ports::execution::{ExecutionError, SwapExecutor, SwapReceipt};

pub struct PaperSwapExecutor {
    funding_mint: String,
    success_probability: f64,
    sequence: AtomicU64,
}

impl PaperSwapExecutor {
    pub fn new() -> Self {
        PaperSwapExecutor {
            funding_mint: USDC_MINT.to_string(),
            success_probability: 1.0,
            sequence: AtomicU64::new(1),
        }
    }

    pub fn with_funding_mint(mut self, funding_mint: &str) -> Self {
        self.funding_mint = funding_mint.to_string();
        self
    }

    /// Fail a fraction of fills at random
    pub fn with_success_probability(mut self, probability: f64) -> Self {
        self.success_probability = probability.clamp(0.0, 1.0);
        self
    }
}

impl Default for PaperSwapExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SwapExecutor for PaperSwapExecutor {
    async fn execute(&self, action: &TradeAction) -> Result<SwapReceipt, ExecutionError> {
        if action.mint == self.funding_mint {
            info!(
                "PAPER {} {} ${} settles in the funding asset",
                action.direction,
                action.symbol,
                action.notional_usd.round_dp(2)
            );
            return Ok(SwapReceipt::settled_in_place());
        }

        // random() lands in [0, 1), so probability 1 never fails and 0 always
        // does
        if rand::random::<f64>() >= self.success_probability {
            return Err(ExecutionError::Reverted(
                "paper fill failed randomly".to_string(),
            ));
        }

        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let signature = format!("paper-{:08}", seq);
        info!(
            "PAPER {} {} ${} filled as {}",
            action.direction,
            action.symbol,
            action.notional_usd.round_dp(2),
            signature
        );
        Ok(SwapReceipt::on_chain(signature))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::plan::TradeDirection;
    use rust_decimal_macros::dec;

    fn action(mint: &str, symbol: &str) -> TradeAction {
        TradeAction {
            direction: TradeDirection::Buy,
            mint: mint.to_string(),
            symbol: symbol.to_string(),
            notional_usd: dec!(50),
            max_slippage_bps: 100,
            deviation: dec!(0.05),
        }
    }

    #[tokio::test]
    async fn test_paper_fill_returns_synthetic_signature() {
        let executor = PaperSwapExecutor::new();
        let receipt = executor.execute(&action("mint-a", "AAA")).await.unwrap();
        assert_eq!(receipt.signature.as_deref(), Some("paper-00000001"));
    }

    #[tokio::test]
    async fn test_sequence_increments_per_fill() {
        let executor = PaperSwapExecutor::new();
        executor.execute(&action("mint-a", "AAA")).await.unwrap();
        let receipt = executor.execute(&action("mint-b", "BBB")).await.unwrap();
        assert_eq!(receipt.signature.as_deref(), Some("paper-00000002"));
    }

    #[tokio::test]
    async fn test_funding_mint_settles_in_place() {
        let executor = PaperSwapExecutor::new();
        let receipt = executor.execute(&action(USDC_MINT, "USDC")).await.unwrap();
        assert!(receipt.signature.is_none());
    }

    #[tokio::test]
    async fn test_zero_success_probability_fails() {
        let executor = PaperSwapExecutor::new().with_success_probability(0.0);
        let result = executor.execute(&action("mint-a", "AAA")).await;
        assert!(matches!(result, Err(ExecutionError::Reverted(_))));
    }
}
