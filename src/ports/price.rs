//! Price Provider Port
//!
//! USD price lookup per mint. The batch call powers snapshot valuation; the
//! single call serves the executor's notional-to-amount conversion.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PriceError {
    #[error("no price available for {0}")]
    Unavailable(String),

    #[error("price request failed: {0}")]
    Transport(String),

    #[error("price API rate limited")]
    RateLimited,
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Current USD price for one mint
    async fn usd_price(&self, mint: &str) -> Result<Decimal, PriceError>;

    /// Prices for many mints at once. Mints without a price are absent from
    /// the result; only transport-level failures error the whole batch.
    async fn usd_prices(&self, mints: &[String]) -> Result<HashMap<String, Decimal>, PriceError> {
        let mut prices = HashMap::new();
        for mint in mints {
            match self.usd_price(mint).await {
                Ok(price) => {
                    prices.insert(mint.clone(), price);
                }
                Err(PriceError::Unavailable(_)) => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(prices)
    }
}
