//! Jupiter Quote Types
//!
//! Request and response structures for the Jupiter V6 quote API.

use serde::{Deserialize, Serialize};

/// Parameters for the /quote endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    /// Mint being sold
    pub input_mint: String,
    /// Mint being bought
    pub output_mint: String,
    /// Input amount in base units (lamports for SOL)
    pub amount: u64,
    /// Slippage tolerance in basis points (1 = 0.01%)
    pub slippage_bps: u16,
    /// Route only through high-liquidity intermediate tokens
    #[serde(default)]
    pub restrict_intermediate_tokens: bool,
}

impl QuoteRequest {
    /// Create a new quote request with required parameters
    pub fn new(input_mint: String, output_mint: String, amount: u64, slippage_bps: u16) -> Self {
        Self {
            input_mint,
            output_mint,
            amount,
            slippage_bps,
            restrict_intermediate_tokens: true,
        }
    }

    /// Set intermediate token restriction
    pub fn with_restricted_intermediates(mut self, restrict: bool) -> Self {
        self.restrict_intermediate_tokens = restrict;
        self
    }
}

/// Response from the /quote endpoint. Amounts arrive as decimal strings of
/// base units, and the whole value is echoed back verbatim in the swap
/// request, so unmodeled fields are preserved in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    /// Mint being sold
    pub input_mint: String,
    /// Mint being bought
    pub output_mint: String,
    /// Input amount in base units
    pub in_amount: String,
    /// Expected output amount in base units
    pub out_amount: String,
    /// Minimum acceptable output after slippage
    pub other_amount_threshold: String,
    /// Swap mode (ExactIn or ExactOut)
    pub swap_mode: String,
    /// Slippage in basis points
    pub slippage_bps: u16,
    /// Price impact percentage (as string)
    #[serde(default)]
    pub price_impact_pct: String,
    /// Hops the aggregator picked for this swap
    pub route_plan: Vec<RoutePlanStep>,
    /// Slot the quote was computed at
    #[serde(default)]
    pub context_slot: Option<u64>,
    /// Server-side computation time
    #[serde(default)]
    pub time_taken: Option<f64>,
    /// Fields this struct does not model
    #[serde(flatten)]
    pub extra: std::collections::HashMap<String, serde_json::Value>,
}

impl QuoteResponse {
    /// Input amount as base units, 0 when unparseable
    pub fn input_amount(&self) -> u64 {
        self.in_amount.parse().unwrap_or(0)
    }

    /// Expected output as base units, 0 when unparseable
    pub fn output_amount(&self) -> u64 {
        self.out_amount.parse().unwrap_or(0)
    }

    /// Post-slippage output floor as base units
    pub fn min_output_amount(&self) -> u64 {
        self.other_amount_threshold.parse().unwrap_or(0)
    }

    /// Price impact as an f64 percentage
    pub fn price_impact(&self) -> f64 {
        self.price_impact_pct.parse().unwrap_or(0.0)
    }

    /// DEX labels along the route, in hop order
    pub fn route_labels(&self) -> Vec<String> {
        self.route_plan
            .iter()
            .map(|step| step.swap_info.label.clone())
            .collect()
    }
}

/// One hop of the route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePlanStep {
    /// The pool swap performed at this hop
    pub swap_info: SwapInfo,
    /// Share of the trade routed through this hop
    pub percent: u8,
}

/// A single pool swap inside a route
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapInfo {
    /// Pool account address
    pub amm_key: String,
    /// DEX name (e.g., "Raydium", "Orca")
    pub label: String,
    /// Mint sold at this hop
    pub input_mint: String,
    /// Mint bought at this hop
    pub output_mint: String,
    /// Input amount for this hop
    pub in_amount: String,
    /// Output amount for this hop
    pub out_amount: String,
    /// Fee charged (not always returned by the API)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_amount: Option<String>,
    /// Mint the fee is charged in (not always returned by the API)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_mint: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_request_new() {
        let req = QuoteRequest::new(
            "So11111111111111111111111111111111111111112".to_string(),
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v".to_string(),
            2_500_000_000, // 2.5 SOL
            75,            // 0.75%
        );

        assert_eq!(req.amount, 2_500_000_000);
        assert_eq!(req.slippage_bps, 75);
        assert!(req.restrict_intermediate_tokens);
    }

    #[test]
    fn test_quote_request_builder() {
        let req = QuoteRequest::new("SOL".to_string(), "USDC".to_string(), 1_000_000, 100)
            .with_restricted_intermediates(false);

        assert!(!req.restrict_intermediate_tokens);
    }

    #[test]
    fn test_quote_response_parsing() {
        let json = r#"{
            "inputMint": "So11111111111111111111111111111111111111112",
            "outputMint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
            "inAmount": "2000000000",
            "outAmount": "295060000",
            "otherAmountThreshold": "293584700",
            "swapMode": "ExactIn",
            "slippageBps": 50,
            "priceImpactPct": "0.02",
            "routePlan": [{
                "swapInfo": {
                    "ammKey": "poolSolUsdc",
                    "label": "Whirlpool",
                    "inputMint": "SOL",
                    "outputMint": "USDC",
                    "inAmount": "2000000000",
                    "outAmount": "295060000",
                    "feeAmount": "73765",
                    "feeMint": "USDC"
                },
                "percent": 100
            }]
        }"#;

        let quote: QuoteResponse = serde_json::from_str(json).unwrap();
        assert_eq!(quote.input_amount(), 2_000_000_000);
        assert_eq!(quote.output_amount(), 295_060_000);
        assert_eq!(quote.min_output_amount(), 293_584_700);
        assert!((quote.price_impact() - 0.02).abs() < 0.001);
        assert_eq!(quote.route_labels(), vec!["Whirlpool".to_string()]);
    }

    #[test]
    fn test_route_plan_split_step_parsing() {
        let json = r#"{
            "swapInfo": {
                "ammKey": "poolSplit",
                "label": "Meteora",
                "inputMint": "SOL",
                "outputMint": "USDC",
                "inAmount": "700000000",
                "outAmount": "103270000"
            },
            "percent": 35
        }"#;

        let step: RoutePlanStep = serde_json::from_str(json).unwrap();
        assert_eq!(step.percent, 35);
        assert_eq!(step.swap_info.label, "Meteora");
        assert!(step.swap_info.fee_amount.is_none());
    }
}
