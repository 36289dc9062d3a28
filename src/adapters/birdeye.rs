//! Birdeye Price Source
//!
//! Secondary USD price provider backed by Birdeye's public API, and the
//! fallback composition the snapshot pipeline runs: ask the primary source
//! first, consult the fallback for whatever the primary could not answer.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use crate::ports::price::{PriceError, PriceProvider};

#[derive(Debug, Deserialize)]
struct BirdeyeResponse {
    success: bool,
    #[serde(default)]
    data: Option<BirdeyeData>,
}

#[derive(Debug, Deserialize)]
struct BirdeyeData {
    value: f64,
}

/// USD price provider backed by Birdeye's defi price endpoint
#[derive(Debug, Clone)]
pub struct BirdeyeClient {
    http: Client,
    api_url: String,
    api_key: String,
}

impl BirdeyeClient {
    pub fn new(api_url: String, api_key: String) -> Result<Self, PriceError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| PriceError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_url,
            api_key,
        })
    }

    fn parse_price_response(
        &self,
        mint: &str,
        body: BirdeyeResponse,
    ) -> Result<Decimal, PriceError> {
        let value = match body.data {
            Some(data) if body.success => data.value,
            _ => return Err(PriceError::Unavailable(mint.to_string())),
        };

        Decimal::try_from(value)
            .map_err(|e| PriceError::Transport(format!("Bad price value {}: {}", value, e)))
    }
}

#[async_trait]
impl PriceProvider for BirdeyeClient {
    async fn usd_price(&self, mint: &str) -> Result<Decimal, PriceError> {
        let url = format!("{}/defi/price", self.api_url);

        let response = self
            .http
            .get(&url)
            .query(&[("address", mint)])
            .header("X-API-KEY", &self.api_key)
            .header("x-chain", "solana")
            .send()
            .await
            .map_err(|e| PriceError::Transport(e.to_string()))?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(PriceError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(PriceError::Transport(format!(
                "Birdeye returned {}",
                response.status()
            )));
        }

        let body: BirdeyeResponse = response
            .json()
            .await
            .map_err(|e| PriceError::Transport(format!("Failed to parse response: {}", e)))?;

        self.parse_price_response(mint, body)
    }
}

/// Price provider that asks a primary source first and falls back to a
/// secondary one for mints the primary fails on
pub struct FallbackPriceProvider {
    primary: Arc<dyn PriceProvider>,
    fallback: Arc<dyn PriceProvider>,
}

impl FallbackPriceProvider {
    pub fn new(primary: Arc<dyn PriceProvider>, fallback: Arc<dyn PriceProvider>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl PriceProvider for FallbackPriceProvider {
    async fn usd_price(&self, mint: &str) -> Result<Decimal, PriceError> {
        match self.primary.usd_price(mint).await {
            Ok(price) => Ok(price),
            Err(err) => {
                warn!("Primary price source failed for {}: {}", mint, err);
                self.fallback.usd_price(mint).await
            }
        }
    }

    async fn usd_prices(&self, mints: &[String]) -> Result<HashMap<String, Decimal>, PriceError> {
        let mut prices = match self.primary.usd_prices(mints).await {
            Ok(prices) => prices,
            Err(err) => {
                warn!(
                    "Primary price source failed for {} mints: {}",
                    mints.len(),
                    err
                );
                return self.fallback.usd_prices(mints).await;
            }
        };

        let missing: Vec<String> = mints
            .iter()
            .filter(|mint| !prices.contains_key(*mint))
            .cloned()
            .collect();
        if !missing.is_empty() {
            match self.fallback.usd_prices(&missing).await {
                Ok(extra) => prices.extend(extra),
                Err(err) => warn!(
                    "Fallback price source failed for {} mints: {}",
                    missing.len(),
                    err
                ),
            }
        }

        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::mocks::MockPriceProvider;
    use rust_decimal_macros::dec;

    fn client() -> BirdeyeClient {
        BirdeyeClient::new(
            "https://public-api.birdeye.so".to_string(),
            "test-key".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_successful_response() {
        let body: BirdeyeResponse = serde_json::from_str(
            r#"{"success": true, "data": {"value": 147.53, "updateUnixTime": 1700000000}}"#,
        )
        .unwrap();

        let price = client().parse_price_response("mint", body).unwrap();
        assert_eq!(price, dec!(147.53));
    }

    #[test]
    fn test_parse_unsuccessful_response() {
        let body: BirdeyeResponse =
            serde_json::from_str(r#"{"success": false, "data": null}"#).unwrap();

        let result = client().parse_price_response("mint", body);
        assert!(matches!(result, Err(PriceError::Unavailable(_))));
    }

    #[test]
    fn test_parse_missing_data() {
        let body: BirdeyeResponse = serde_json::from_str(r#"{"success": true}"#).unwrap();

        let result = client().parse_price_response("mint", body);
        assert!(matches!(result, Err(PriceError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_fallback_used_when_primary_fails() {
        let primary = Arc::new(MockPriceProvider::new());
        let fallback = Arc::new(MockPriceProvider::new().with_price("mint-a", dec!(3)));
        let provider = FallbackPriceProvider::new(primary, fallback);

        let price = provider.usd_price("mint-a").await.unwrap();
        assert_eq!(price, dec!(3));
    }

    #[tokio::test]
    async fn test_primary_price_wins() {
        let primary = Arc::new(MockPriceProvider::new().with_price("mint-a", dec!(2)));
        let fallback = Arc::new(MockPriceProvider::new().with_price("mint-a", dec!(3)));
        let provider = FallbackPriceProvider::new(primary, fallback);

        let price = provider.usd_price("mint-a").await.unwrap();
        assert_eq!(price, dec!(2));
    }

    #[tokio::test]
    async fn test_batch_fills_missing_from_fallback() {
        let primary = Arc::new(MockPriceProvider::new().with_price("mint-a", dec!(2)));
        let fallback = Arc::new(MockPriceProvider::new().with_price("mint-b", dec!(7)));
        let provider = FallbackPriceProvider::new(primary, fallback);

        let prices = provider
            .usd_prices(&["mint-a".to_string(), "mint-b".to_string()])
            .await
            .unwrap();
        assert_eq!(prices.get("mint-a"), Some(&dec!(2)));
        assert_eq!(prices.get("mint-b"), Some(&dec!(7)));
    }

    #[tokio::test]
    async fn test_batch_unpriced_everywhere_stays_absent() {
        let primary = Arc::new(MockPriceProvider::new().with_price("mint-a", dec!(2)));
        let fallback = Arc::new(MockPriceProvider::new());
        let provider = FallbackPriceProvider::new(primary, fallback);

        let prices = provider
            .usd_prices(&["mint-a".to_string(), "mint-b".to_string()])
            .await
            .unwrap();
        assert_eq!(prices.len(), 1);
        assert!(!prices.contains_key("mint-b"));
    }
}
