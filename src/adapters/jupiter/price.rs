//! Jupiter Price Source
//!
//! Price provider backed by the Jupiter Price API v2. Prices arrive as
//! decimal strings keyed by mint; mints the aggregator cannot price come
//! back null and are skipped. USDC is the unit of account and is pinned at
//! one dollar without a request. Rate limits and transport failures retry
//! with backoff before surfacing an error.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::domain::holding::USDC_MINT;
use crate::ports::price::{PriceError, PriceProvider};

/// Maximum mints accepted per request by the price API
const MAX_IDS_PER_REQUEST: usize = 100;

/// Attempts per batch before giving up
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
struct PriceV2Response {
    #[serde(default)]
    data: HashMap<String, Option<PriceV2Entry>>,
}

#[derive(Debug, Deserialize)]
struct PriceV2Entry {
    price: String,
}

/// Parses the API's decimal strings, which occasionally use scientific
/// notation for very small prices
fn parse_price(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw)
        .ok()
        .or_else(|| Decimal::from_scientific(raw).ok())
}

/// USD price provider backed by Jupiter's Price API
#[derive(Debug, Clone)]
pub struct JupiterPriceProvider {
    http: Client,
    api_url: String,
    api_key: Option<String>,
}

impl JupiterPriceProvider {
    pub fn new(api_url: String, api_key: Option<String>) -> Result<Self, PriceError> {
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

    async fn fetch_batch(&self, mints: &[String]) -> Result<HashMap<String, Decimal>, PriceError> {
        let ids = mints.join(",");
        let mut req = self.http.get(&self.api_url).query(&[("ids", ids.as_str())]);

        if let Some(ref api_key) = self.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = self.execute_with_retry(&req).await?;

        if !response.status().is_success() {
            return Err(PriceError::Transport(format!(
                "price API returned {}",
                response.status()
            )));
        }

        let body: PriceV2Response = response
            .json()
            .await
            .map_err(|e| PriceError::Transport(format!("Failed to parse response: {}", e)))?;

        let mut prices = HashMap::with_capacity(body.data.len());
        for (mint, entry) in body.data {
            let Some(entry) = entry else {
                debug!("Price API has no quote for {}", mint);
                continue;
            };
            match parse_price(&entry.price) {
                Some(price) => {
                    prices.insert(mint, price);
                }
                None => debug!("Unparseable price {:?} for {}", entry.price, mint),
            }
        }
        Ok(prices)
    }

    /// Sends the request, backing off and retrying on rate limits, server
    /// errors, and transport failures
    async fn execute_with_retry(
        &self,
        req: &reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, PriceError> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            let attempt_req = req
                .try_clone()
                .ok_or_else(|| PriceError::Transport("Failed to clone request".into()))?;

            match attempt_req.send().await {
                Ok(response) => {
                    // Rate limiting (429) backs off exponentially
                    if response.status() == StatusCode::TOO_MANY_REQUESTS {
                        let backoff = Duration::from_secs(2u64.pow(attempt + 1)); // 2s, 4s, 8s
                        warn!(
                            "Price API rate limited (429), backing off for {:?} (attempt {}/{})",
                            backoff,
                            attempt + 1,
                            MAX_RETRIES
                        );
                        last_error = Some(PriceError::RateLimited);
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    if response.status().is_server_error() {
                        last_error = Some(PriceError::Transport(format!(
                            "price API returned {}",
                            response.status()
                        )));
                        tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1)))
                            .await;
                        continue;
                    }

                    return Ok(response);
                }
                Err(e) => {
                    last_error = Some(PriceError::Transport(e.to_string()));
                    tokio::time::sleep(Duration::from_millis(500 * (attempt as u64 + 1))).await;
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PriceError::Transport("Max retries exceeded".into())))
    }
}

#[async_trait]
impl PriceProvider for JupiterPriceProvider {
    async fn usd_price(&self, mint: &str) -> Result<Decimal, PriceError> {
        // USDC is the unit of account, never worth a round trip
        if mint == USDC_MINT {
            return Ok(Decimal::ONE);
        }
        let ids = [mint.to_string()];
        let batch = self.fetch_batch(&ids).await?;
        batch
            .get(mint)
            .copied()
            .ok_or_else(|| PriceError::Unavailable(mint.to_string()))
    }

    async fn usd_prices(&self, mints: &[String]) -> Result<HashMap<String, Decimal>, PriceError> {
        let mut prices = HashMap::with_capacity(mints.len());
        let mut remote = Vec::with_capacity(mints.len());
        for mint in mints {
            if mint == USDC_MINT {
                prices.insert(mint.clone(), Decimal::ONE);
            } else {
                remote.push(mint.clone());
            }
        }
        for chunk in remote.chunks(MAX_IDS_PER_REQUEST) {
            prices.extend(self.fetch_batch(chunk).await?);
        }
        Ok(prices)
    }
}
