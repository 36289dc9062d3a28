//! Token Registry
//!
//! Static metadata for mints the mirror commonly encounters. The registry
//! serves display symbols, decimals for decoding when the RPC returns
//! unparsed account data, and the stable-alias fold for allocation math;
//! an unknown mint never blocks a snapshot.

use std::collections::HashMap;

use crate::domain::holding::{NATIVE_MINT, USDC_MINT};

/// Metadata for one known mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: &'static str,
    pub decimals: u8,
}

const KNOWN_TOKENS: &[(&str, &str, u8)] = &[
    (NATIVE_MINT, "SOL", 9),
    (USDC_MINT, "USDC", 6),
    ("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT", 6),
    ("USDSwr9ApdHk5bvJKMjzff41FfuX8bSxdKcR81vTwcA", "USDS", 6),
    ("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So", "mSOL", 9),
    ("J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn", "JitoSOL", 9),
    ("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", "BONK", 5),
    ("EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm", "WIF", 6),
    ("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN", "JUP", 6),
    ("4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R", "RAY", 6),
    ("rndrizKT3MK1iimdxRdWabcF7Zg7AR5T4nud4EkHBof", "RENDER", 8),
    ("HZ1JovNiVvGrGNiiYvEozEVgZ58xaU3RKwX8eACQBCt3", "PYTH", 6),
];

/// Stable mints folded onto USDC for allocation math. Every entry carries
/// six decimals, so raw amounts merge without rescaling.
const USDC_ALIASES: &[&str] = &[
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
    "USDSwr9ApdHk5bvJKMjzff41FfuX8bSxdKcR81vTwcA",
];

/// Lookup table from mint address to static token metadata
#[derive(Debug, Clone)]
pub struct TokenRegistry {
    by_mint: HashMap<&'static str, TokenInfo>,
}

impl Default for TokenRegistry {
    fn default() -> Self {
        let by_mint = KNOWN_TOKENS
            .iter()
            .map(|(mint, symbol, decimals)| {
                (
                    *mint,
                    TokenInfo {
                        symbol,
                        decimals: *decimals,
                    },
                )
            })
            .collect();
        TokenRegistry { by_mint }
    }
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&self, mint: &str) -> Option<TokenInfo> {
        self.by_mint.get(mint).copied()
    }

    pub fn decimals(&self, mint: &str) -> Option<u8> {
        self.info(mint).map(|i| i.decimals)
    }

    /// Known symbol, or a truncated mint address for display
    pub fn display_symbol(&self, mint: &str) -> String {
        match self.info(mint) {
            Some(info) => info.symbol.to_string(),
            None => mint.chars().take(8).collect(),
        }
    }

    /// Collapses stablecoin aliases onto USDC so stable balances compare as
    /// one asset during reconciliation
    pub fn canonical_mint<'a>(&self, mint: &'a str) -> &'a str {
        if USDC_ALIASES.contains(&mint) {
            USDC_MINT
        } else {
            mint
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_mint_lookup() {
        let registry = TokenRegistry::new();

        let sol = registry.info(NATIVE_MINT).unwrap();
        assert_eq!(sol.symbol, "SOL");
        assert_eq!(sol.decimals, 9);

        assert_eq!(registry.decimals(USDC_MINT), Some(6));
        assert_eq!(registry.display_symbol(USDC_MINT), "USDC");
    }

    #[test]
    fn test_unknown_mint_truncates_address() {
        let registry = TokenRegistry::new();
        let mint = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";

        assert!(registry.info(mint).is_none());
        assert_eq!(registry.display_symbol(mint), "7xKXtg2C");
    }

    #[test]
    fn test_short_mint_displays_whole() {
        let registry = TokenRegistry::new();
        assert_eq!(registry.display_symbol("abc"), "abc");
    }

    #[test]
    fn test_stable_aliases_fold_onto_usdc() {
        let registry = TokenRegistry::new();

        assert_eq!(
            registry.canonical_mint("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
            USDC_MINT
        );
        assert_eq!(
            registry.canonical_mint("USDSwr9ApdHk5bvJKMjzff41FfuX8bSxdKcR81vTwcA"),
            USDC_MINT
        );
        assert_eq!(registry.canonical_mint(NATIVE_MINT), NATIVE_MINT);
        assert_eq!(registry.canonical_mint(USDC_MINT), USDC_MINT);
    }
}
