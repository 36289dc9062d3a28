//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml
//! structure. Every section has sane defaults, so a minimal file only needs
//! the source wallets to follow.

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::holding::{NATIVE_MINT, USDC_MINT};
use crate::domain::risk::RiskLimits;
use crate::domain::target::BlendStrategy;

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub solana: SolanaSection,
    #[serde(default)]
    pub sources: SourcesSection,
    #[serde(default)]
    pub risk: RiskSection,
    #[serde(default)]
    pub tokens: TokensSection,
    #[serde(default)]
    pub jupiter: JupiterSection,
    #[serde(default)]
    pub birdeye: BirdeyeSection,
    #[serde(default)]
    pub engine: EngineSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Solana RPC configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolanaSection {
    /// RPC endpoint (use a private RPC for production)
    pub rpc_url: String,
    /// Commitment level: "processed", "confirmed", "finalized"
    pub commitment: String,
    /// Follower wallet keypair path (NEVER commit this file!)
    pub keypair_path: String,
}

impl Default for SolanaSection {
    fn default() -> Self {
        SolanaSection {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: "confirmed".to_string(),
            keypair_path: "~/.config/solana/id.json".to_string(),
        }
    }
}

impl SolanaSection {
    /// Get RPC URL with environment variable override
    /// Checks SOLANA_RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> String {
        std::env::var("SOLANA_RPC_URL").unwrap_or_else(|_| self.rpc_url.clone())
    }

    /// Get keypair path with environment variable override
    /// Checks SOLANA_KEYPAIR_PATH env var first, falls back to config value
    pub fn get_keypair_path(&self) -> String {
        std::env::var("SOLANA_KEYPAIR_PATH").unwrap_or_else(|_| self.keypair_path.clone())
    }
}

/// Source wallets configuration section
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesSection {
    /// Wallet addresses to mirror
    pub wallets: Vec<String>,
    /// Blend across sources: "equal", "value", or "recency"
    pub blend: Option<String>,
    /// Half-life for the "recency" blend, in seconds
    pub recency_half_life_secs: Option<u64>,
}

impl SourcesSection {
    /// Get source wallets with environment variable override
    /// Checks SOURCE_ADDRESSES env var (comma separated) first
    pub fn get_wallets(&self) -> Vec<String> {
        match std::env::var("SOURCE_ADDRESSES") {
            Ok(raw) if !raw.trim().is_empty() => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            _ => self.wallets.clone(),
        }
    }
}

/// Risk limits configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskSection {
    /// Largest single trade in USD
    pub max_trade_size_usd: f64,
    /// Smallest trade worth paying fees for, in USD
    pub min_trade_size_usd: f64,
    /// Slippage budget per swap in basis points
    pub max_slippage_bps: u16,
    /// Per-token share of the portfolio a buy may not exceed (0-1)
    pub max_portfolio_allocation: f64,
    /// SOL amount kept untraded to cover transaction fees
    pub gas_buffer_sol: f64,
    /// Weight deviations at or below this band are ignored (0-1)
    pub weight_tolerance: f64,
    /// Weights below this are treated as dust (0-1)
    pub min_weight_threshold: f64,
}

impl Default for RiskSection {
    fn default() -> Self {
        RiskSection {
            max_trade_size_usd: 1000.0,
            min_trade_size_usd: 10.0,
            max_slippage_bps: 100,
            max_portfolio_allocation: 0.25,
            gas_buffer_sol: 0.1,
            weight_tolerance: 0.02,
            min_weight_threshold: 0.01,
        }
    }
}

/// Tokens configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TokensSection {
    /// Native SOL mint address
    pub native_mint: String,
    /// Stable mint every swap routes through
    pub funding_mint: String,
}

impl Default for TokensSection {
    fn default() -> Self {
        TokensSection {
            native_mint: NATIVE_MINT.to_string(),
            funding_mint: USDC_MINT.to_string(),
        }
    }
}

/// Jupiter API configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct JupiterSection {
    /// Jupiter V6 quote/swap API base URL
    pub api_url: String,
    /// Jupiter Price API V2 base URL
    pub price_api_url: String,
    /// Optional API key for higher rate limits (get from jup.ag)
    pub api_key: Option<String>,
    /// Maximum priority fee in lamports
    pub max_priority_fee_lamports: u64,
    /// Restrict intermediate tokens to high-liquidity paths
    pub restrict_intermediate_tokens: bool,
}

impl Default for JupiterSection {
    fn default() -> Self {
        JupiterSection {
            api_url: "https://quote-api.jup.ag/v6".to_string(),
            price_api_url: "https://api.jup.ag/price/v2".to_string(),
            api_key: None,
            max_priority_fee_lamports: 1_000_000,
            restrict_intermediate_tokens: true,
        }
    }
}

impl JupiterSection {
    /// Get API key with environment variable fallback
    /// Checks JUPITER_API_KEY env var if config value is empty/None
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var("JUPITER_API_KEY").ok()
    }
}

/// Birdeye fallback price source configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BirdeyeSection {
    /// Birdeye public API base URL
    pub api_url: String,
    /// API key, required for any Birdeye request
    pub api_key: Option<String>,
}

impl Default for BirdeyeSection {
    fn default() -> Self {
        BirdeyeSection {
            api_url: "https://public-api.birdeye.so".to_string(),
            api_key: None,
        }
    }
}

impl BirdeyeSection {
    /// Get API key with environment variable fallback
    /// Checks BIRDEYE_API_KEY env var if config value is empty/None
    pub fn get_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            if !key.is_empty() {
                return Some(key.clone());
            }
        }
        std::env::var("BIRDEYE_API_KEY").ok()
    }
}

/// Engine loop configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Seconds between reconciliation cycles
    pub poll_interval_secs: u64,
    /// Seconds to wait for a submitted swap to confirm
    pub confirm_timeout_secs: u64,
    /// Log swaps instead of submitting them
    pub paper_mode: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        EngineSection {
            poll_interval_secs: 60,
            confirm_timeout_secs: 60,
            paper_mode: true,
        }
    }
}

impl EngineSection {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.poll_interval_secs)
    }

    pub fn confirm_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.confirm_timeout_secs)
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        LoggingSection {
            level: "info".to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.get_wallets().is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one source wallet is required ([sources] wallets or SOURCE_ADDRESSES)"
                    .to_string(),
            ));
        }

        if self.solana.rpc_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "rpc_url cannot be empty".to_string(),
            ));
        }

        if self.solana.keypair_path.is_empty() {
            return Err(ConfigError::ValidationError(
                "keypair_path cannot be empty".to_string(),
            ));
        }

        if self.tokens.native_mint.is_empty() || self.tokens.funding_mint.is_empty() {
            return Err(ConfigError::ValidationError(
                "native_mint and funding_mint cannot be empty".to_string(),
            ));
        }

        if self.jupiter.api_url.is_empty() || self.jupiter.price_api_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "jupiter api_url and price_api_url cannot be empty".to_string(),
            ));
        }

        // Parses the blend and converts the risk section, surfacing any
        // out-of-range numbers
        self.blend_strategy()?;
        self.risk_limits()?;
        Ok(())
    }

    /// Risk section converted to exact decimal limits
    pub fn risk_limits(&self) -> Result<RiskLimits, ConfigError> {
        let limits = RiskLimits {
            max_trade_size_usd: decimal_field(self.risk.max_trade_size_usd, "max_trade_size_usd")?,
            min_trade_size_usd: decimal_field(self.risk.min_trade_size_usd, "min_trade_size_usd")?,
            max_slippage_bps: self.risk.max_slippage_bps,
            max_portfolio_allocation: decimal_field(
                self.risk.max_portfolio_allocation,
                "max_portfolio_allocation",
            )?,
            gas_buffer_sol: decimal_field(self.risk.gas_buffer_sol, "gas_buffer_sol")?,
            weight_tolerance: decimal_field(self.risk.weight_tolerance, "weight_tolerance")?,
            min_weight_threshold: decimal_field(
                self.risk.min_weight_threshold,
                "min_weight_threshold",
            )?,
        };
        limits
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(limits)
    }

    /// Blend choice parsed from the sources section
    pub fn blend_strategy(&self) -> Result<BlendStrategy, ConfigError> {
        let strategy = match self.sources.blend.as_deref() {
            None | Some("equal") => BlendStrategy::EqualWeight,
            Some("value") => BlendStrategy::ValueWeighted,
            Some("recency") => BlendStrategy::RecencyWeighted {
                half_life_secs: self.sources.recency_half_life_secs.unwrap_or(86_400),
            },
            Some(other) => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown blend \"{other}\", expected equal, value, or recency"
                )));
            }
        };
        Ok(strategy)
    }
}

fn decimal_field(value: f64, field: &str) -> Result<Decimal, ConfigError> {
    Decimal::try_from(value).map_err(|_| {
        ConfigError::ValidationError(format!("{field} is not a representable number: {value}"))
    })
}
