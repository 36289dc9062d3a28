//! Jupiter Swap Executor
//!
//! Live implementation of the swap executor port. Sizes each action against
//! the wallet's current holdings, quotes and builds the transaction through
//! Jupiter, signs it locally and submits it over RPC, then polls until the
//! signature confirms or the timeout lapses.
//!
//! Actions denominated in the funding asset itself settle in place: a sell
//! into USDC whose target is USDC is already settled, so no swap is sent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use solana_sdk::transaction::VersionedTransaction;
use tracing::{debug, info};

use crate::adapters::jupiter::{JupiterClient, QuoteRequest, SwapRequest};
use crate::adapters::registry::TokenRegistry;
use crate::adapters::solana::{SolanaClient, WalletManager};
use crate::domain::holding::{to_base_units, USDC_MINT};
use crate::domain::plan::{TradeAction, TradeDirection};
use crate::ports::execution::{ExecutionError, SwapExecutor, SwapReceipt};
use crate::ports::price::PriceProvider;
use crate::ports::snapshot::SnapshotProvider;

const CONFIRM_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Swap executor that routes every action through Jupiter
pub struct JupiterSwapExecutor {
    jupiter: JupiterClient,
    solana: SolanaClient,
    wallet: WalletManager,
    snapshots: Arc<dyn SnapshotProvider>,
    prices: Arc<dyn PriceProvider>,
    registry: TokenRegistry,
    funding_mint: String,
    priority_fee_lamports: Option<u64>,
    restrict_intermediate_tokens: bool,
    confirm_timeout: Duration,
}

impl JupiterSwapExecutor {
    pub fn new(
        jupiter: JupiterClient,
        solana: SolanaClient,
        wallet: WalletManager,
        snapshots: Arc<dyn SnapshotProvider>,
        prices: Arc<dyn PriceProvider>,
    ) -> Self {
        JupiterSwapExecutor {
            jupiter,
            solana,
            wallet,
            snapshots,
            prices,
            registry: TokenRegistry::new(),
            funding_mint: USDC_MINT.to_string(),
            priority_fee_lamports: None,
            restrict_intermediate_tokens: true,
            confirm_timeout: Duration::from_secs(60),
        }
    }

    pub fn with_funding_mint(mut self, funding_mint: &str) -> Self {
        self.funding_mint = funding_mint.to_string();
        self
    }

    pub fn with_priority_fee(mut self, lamports: u64) -> Self {
        self.priority_fee_lamports = Some(lamports);
        self
    }

    pub fn with_restricted_intermediates(mut self, restrict: bool) -> Self {
        self.restrict_intermediate_tokens = restrict;
        self
    }

    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    /// Sizes the swap input in base units.
    ///
    /// Sells spend a slice of the held position proportional to the notional,
    /// so no external price is needed. Buys spend the funding asset, sized
    /// from its USD price and capped at the wallet's funding balance.
    async fn input_amount(&self, action: &TradeAction) -> Result<u64, ExecutionError> {
        let owner = self.wallet.public_key();
        let snapshot = self
            .snapshots
            .snapshot(&owner)
            .await
            .map_err(|e| ExecutionError::Other(format!("wallet snapshot failed: {}", e)))?;

        match action.direction {
            TradeDirection::Sell => {
                let held = snapshot.holding(&action.mint).ok_or_else(|| {
                    ExecutionError::Other(format!("no {} holding to sell", action.symbol))
                })?;
                if held.usd_value <= Decimal::ZERO {
                    return Err(ExecutionError::Other(format!(
                        "{} holding has no USD valuation",
                        action.symbol
                    )));
                }
                let fraction = (action.notional_usd / held.usd_value).min(Decimal::ONE);
                let amount = (Decimal::from(held.amount) * fraction)
                    .trunc()
                    .to_u64()
                    .unwrap_or(held.amount);
                Ok(amount.min(held.amount))
            }
            TradeDirection::Buy => {
                let funding_price = match self.prices.usd_price(&self.funding_mint).await {
                    Ok(price) if price > Decimal::ZERO => price,
                    // The funding asset is a dollar stablecoin, par is close enough
                    _ => Decimal::ONE,
                };
                let decimals = self.registry.decimals(&self.funding_mint).unwrap_or(6);
                let ui_amount = action.notional_usd / funding_price;
                let mut amount = to_base_units(ui_amount, decimals).ok_or_else(|| {
                    ExecutionError::Other(format!("buy amount {} out of range", ui_amount))
                })?;
                if let Some(funding) = snapshot.holding(&self.funding_mint) {
                    amount = amount.min(funding.amount);
                }
                Ok(amount)
            }
        }
    }

    /// Polls the signature until the cluster reports it confirmed
    async fn await_confirmation(&self, signature: &str) {
        loop {
            match self.solana.confirm_transaction(signature).await {
                Ok(true) => return,
                Ok(false) => debug!("Signature {} not confirmed yet", signature),
                Err(e) => debug!("Confirmation check failed: {}", e),
            }
            tokio::time::sleep(CONFIRM_POLL_INTERVAL).await;
        }
    }
}

/// Jupiter's slippage violation surfaces as custom program error 0x1771 when
/// preflight simulation rejects the swap
fn classify_send_error(detail: &str) -> ExecutionError {
    if detail.contains("0x1771") || detail.contains("SlippageToleranceExceeded") {
        ExecutionError::SlippageExceeded
    } else {
        ExecutionError::Reverted(detail.to_string())
    }
}

#[async_trait]
impl SwapExecutor for JupiterSwapExecutor {
    async fn execute(&self, action: &TradeAction) -> Result<SwapReceipt, ExecutionError> {
        // Funding-denominated actions hold or release the funding asset
        // itself, there is nothing to swap
        if action.mint == self.funding_mint {
            debug!(
                "{} {} settles in the funding asset, no swap needed",
                action.direction, action.symbol
            );
            return Ok(SwapReceipt::settled_in_place());
        }

        let amount = self.input_amount(action).await?;
        if amount == 0 {
            return Err(ExecutionError::Other(format!(
                "computed zero input amount for {} {}",
                action.direction, action.symbol
            )));
        }

        let (input_mint, output_mint) = match action.direction {
            TradeDirection::Sell => (action.mint.clone(), self.funding_mint.clone()),
            TradeDirection::Buy => (self.funding_mint.clone(), action.mint.clone()),
        };

        let quote_request =
            QuoteRequest::new(input_mint, output_mint, amount, action.max_slippage_bps)
                .with_restricted_intermediates(self.restrict_intermediate_tokens);
        let quote = self.jupiter.get_quote(&quote_request).await?;
        info!(
            "Quoted {} {} for ${}: impact {}%, route [{}]",
            action.direction,
            action.symbol,
            action.notional_usd.round_dp(2),
            quote.price_impact(),
            quote.route_labels().join(" > ")
        );

        let quote_value = serde_json::to_value(&quote)
            .map_err(|e| ExecutionError::Other(format!("Failed to serialize quote: {}", e)))?;
        let mut swap_request = SwapRequest::new(self.wallet.public_key(), quote_value);
        if let Some(fee) = self.priority_fee_lamports {
            swap_request = swap_request.with_priority_fee(fee);
        }
        let swap = self.jupiter.get_swap_transaction(&swap_request).await?;

        let bytes = swap
            .transaction_bytes()
            .map_err(|e| ExecutionError::Other(format!("transaction decode failed: {}", e)))?;
        let unsigned: VersionedTransaction = bincode::deserialize(&bytes)
            .map_err(|e| ExecutionError::Other(format!("transaction deserialize failed: {}", e)))?;
        let signed = VersionedTransaction::try_new(unsigned.message, &[self.wallet.keypair()])
            .map_err(|e| ExecutionError::Other(format!("signing failed: {}", e)))?;

        let signature = self
            .solana
            .send_transaction(&signed)
            .await
            .map_err(|e| classify_send_error(&e.to_string()))?;
        info!("Submitted {}, awaiting confirmation", signature);

        tokio::time::timeout(self.confirm_timeout, self.await_confirmation(&signature))
            .await
            .map_err(|_| {
                ExecutionError::Timeout(format!("confirmation of {} timed out", signature))
            })?;

        Ok(SwapReceipt::on_chain(signature))
    }
}
