//! RPC Snapshot Provider
//!
//! Builds a priced portfolio snapshot from on-chain state: the native SOL
//! balance plus every SPL token account owned by the wallet, valued in USD
//! through the price provider. Token accounts of the same mint are merged,
//! tokens the price source does not know are excluded with a warning, and a
//! missing SOL price fails the whole snapshot.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine as _;
use chrono::Utc;
use rust_decimal::Decimal;
use solana_account_decoder::{UiAccountData, UiAccountEncoding};
use solana_client::rpc_response::RpcKeyedAccount;
use solana_sdk::program_pack::Pack;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

use crate::adapters::registry::TokenRegistry;
use crate::adapters::solana::rpc::SolanaClient;
use crate::domain::holding::{TokenHolding, NATIVE_DECIMALS, NATIVE_MINT};
use crate::domain::snapshot::PortfolioSnapshot;
use crate::ports::price::{PriceError, PriceProvider};
use crate::ports::snapshot::{SnapshotError, SnapshotProvider};

/// Raw token balance before price resolution
struct RawBalance {
    mint: String,
    amount: u64,
    decimals: u8,
}

/// Snapshot provider backed by Solana RPC and a USD price source
pub struct RpcSnapshotProvider {
    solana: SolanaClient,
    prices: Arc<dyn PriceProvider>,
    registry: TokenRegistry,
}

impl RpcSnapshotProvider {
    pub fn new(solana: SolanaClient, prices: Arc<dyn PriceProvider>) -> Self {
        RpcSnapshotProvider {
            solana,
            prices,
            registry: TokenRegistry::new(),
        }
    }

    /// Extracts mint, amount and decimals from one token account.
    ///
    /// RPC answers jsonParsed for SPL token accounts; the binary arms cover
    /// responses where server-side parsing was unavailable, in which case
    /// decimals come from the token registry.
    fn decode_token_account(&self, keyed: &RpcKeyedAccount) -> Option<RawBalance> {
        match &keyed.account.data {
            UiAccountData::Json(parsed) => {
                let info = parsed.parsed.get("info")?;
                let mint = info.get("mint")?.as_str()?.to_string();
                let token_amount = info.get("tokenAmount")?;
                let amount = token_amount.get("amount")?.as_str()?.parse::<u64>().ok()?;
                let decimals = u8::try_from(token_amount.get("decimals")?.as_u64()?).ok()?;
                Some(RawBalance {
                    mint,
                    amount,
                    decimals,
                })
            }
            UiAccountData::Binary(blob, encoding) => {
                let bytes = match encoding {
                    UiAccountEncoding::Base58 => bs58::decode(blob).into_vec().ok()?,
                    UiAccountEncoding::Base64 => {
                        base64::engine::general_purpose::STANDARD.decode(blob).ok()?
                    }
                    _ => return None,
                };
                self.decode_packed_account(&bytes)
            }
            UiAccountData::LegacyBinary(blob) => {
                let bytes = bs58::decode(blob).into_vec().ok()?;
                self.decode_packed_account(&bytes)
            }
        }
    }

    fn decode_packed_account(&self, bytes: &[u8]) -> Option<RawBalance> {
        let account = spl_token::state::Account::unpack(bytes).ok()?;
        let mint = account.mint.to_string();
        // Unknown mints carry no decimals in the packed layout, skip them
        let Some(decimals) = self.registry.decimals(&mint) else {
            debug!("Skipping token account with unknown mint {}", mint);
            return None;
        };
        Some(RawBalance {
            mint,
            amount: account.amount,
            decimals,
        })
    }

    /// Folds one decoded balance into the per-mint map, collapsing stable
    /// aliases onto USDC so they reconcile as a single asset
    fn merge_raw(&self, balances: &mut BTreeMap<String, RawBalance>, mut raw: RawBalance) {
        raw.mint = self.registry.canonical_mint(&raw.mint).to_string();
        balances
            .entry(raw.mint.clone())
            .and_modify(|existing| existing.amount = existing.amount.saturating_add(raw.amount))
            .or_insert(raw);
    }
}

#[async_trait]
impl SnapshotProvider for RpcSnapshotProvider {
    async fn snapshot(&self, owner: &str) -> Result<PortfolioSnapshot, SnapshotError> {
        Pubkey::from_str(owner).map_err(|_| SnapshotError::InvalidAddress(owner.to_string()))?;

        let lamports = self
            .solana
            .get_balance(owner)
            .await
            .map_err(|err| SnapshotError::Rpc(err.to_string()))?;
        let accounts = self
            .solana
            .get_token_accounts(owner)
            .await
            .map_err(|err| SnapshotError::Rpc(err.to_string()))?;

        let mut balances: BTreeMap<String, RawBalance> = BTreeMap::new();
        if lamports > 0 {
            balances.insert(
                NATIVE_MINT.to_string(),
                RawBalance {
                    mint: NATIVE_MINT.to_string(),
                    amount: lamports,
                    decimals: NATIVE_DECIMALS,
                },
            );
        }
        for keyed in &accounts {
            match self.decode_token_account(keyed) {
                Some(raw) if raw.amount > 0 => self.merge_raw(&mut balances, raw),
                Some(_) => {}
                None => warn!("Could not decode token account {}", keyed.pubkey),
            }
        }

        let mints: Vec<String> = balances.keys().cloned().collect();
        let prices = self.prices.usd_prices(&mints).await?;

        let mut holdings = Vec::with_capacity(balances.len());
        for (mint, raw) in balances {
            let Some(price) = prices.get(&mint) else {
                // Gas-reserve checks downstream need the SOL price
                if mint == NATIVE_MINT {
                    return Err(SnapshotError::Price(PriceError::Unavailable(mint)));
                }
                warn!("No price for {}, excluding it from the snapshot", mint);
                continue;
            };
            let ui_amount = Decimal::from_i128_with_scale(raw.amount as i128, raw.decimals as u32);
            holdings.push(TokenHolding::new(
                mint.clone(),
                self.registry.display_symbol(&mint),
                raw.amount,
                raw.decimals,
                ui_amount * price,
            ));
        }

        Ok(PortfolioSnapshot::new(owner.to_string(), holdings, Utc::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::holding::USDC_MINT;
    use crate::ports::mocks::MockPriceProvider;
    use solana_account_decoder::parse_account_data::ParsedAccount;
    use solana_account_decoder::UiAccount;
    use solana_sdk::program_option::COption;

    fn provider() -> RpcSnapshotProvider {
        RpcSnapshotProvider::new(
            SolanaClient::new("http://localhost:8899".to_string()),
            Arc::new(MockPriceProvider::new()),
        )
    }

    fn json_account(mint: &str, amount: &str, decimals: u8) -> RpcKeyedAccount {
        let parsed = serde_json::json!({
            "type": "account",
            "info": {
                "mint": mint,
                "owner": "4Nd1mBQtrMJVYVfKf2PJy9NZUZdTAsp7D4xWLs4gDB4T",
                "tokenAmount": {
                    "amount": amount,
                    "decimals": decimals,
                    "uiAmountString": "0"
                }
            }
        });
        RpcKeyedAccount {
            pubkey: "B1zq6TtTrLFJgERSwfbtQZbkPszyJzh5Mc6xbAqcBMzW".to_string(),
            account: UiAccount {
                lamports: 2_039_280,
                data: UiAccountData::Json(ParsedAccount {
                    program: "spl-token".to_string(),
                    parsed,
                    space: 165,
                }),
                owner: spl_token::id().to_string(),
                executable: false,
                rent_epoch: 0,
                space: Some(165),
            },
        }
    }

    fn packed_account(mint: &str, amount: u64) -> RpcKeyedAccount {
        let state = spl_token::state::Account {
            mint: Pubkey::from_str(mint).unwrap(),
            owner: Pubkey::new_unique(),
            amount,
            delegate: COption::None,
            state: spl_token::state::AccountState::Initialized,
            is_native: COption::None,
            delegated_amount: 0,
            close_authority: COption::None,
        };
        let mut bytes = [0u8; spl_token::state::Account::LEN];
        spl_token::state::Account::pack(state, &mut bytes).unwrap();
        RpcKeyedAccount {
            pubkey: "B1zq6TtTrLFJgERSwfbtQZbkPszyJzh5Mc6xbAqcBMzW".to_string(),
            account: UiAccount {
                lamports: 2_039_280,
                data: UiAccountData::Binary(
                    bs58::encode(&bytes).into_string(),
                    UiAccountEncoding::Base58,
                ),
                owner: spl_token::id().to_string(),
                executable: false,
                rent_epoch: 0,
                space: Some(165),
            },
        }
    }

    #[test]
    fn test_decode_json_parsed_account() {
        let keyed = json_account(USDC_MINT, "5000000", 6);
        let raw = provider().decode_token_account(&keyed).unwrap();
        assert_eq!(raw.mint, USDC_MINT);
        assert_eq!(raw.amount, 5_000_000);
        assert_eq!(raw.decimals, 6);
    }

    #[test]
    fn test_decode_binary_account_with_registry_decimals() {
        let keyed = packed_account(USDC_MINT, 25_000_000);
        let raw = provider().decode_token_account(&keyed).unwrap();
        assert_eq!(raw.mint, USDC_MINT);
        assert_eq!(raw.amount, 25_000_000);
        assert_eq!(raw.decimals, 6);
    }

    #[test]
    fn test_decode_binary_account_unknown_mint_skipped() {
        let unknown = Pubkey::new_unique().to_string();
        let keyed = packed_account(&unknown, 1_000);
        assert!(provider().decode_token_account(&keyed).is_none());
    }

    #[test]
    fn test_stable_aliases_merge_into_one_balance() {
        let usdt = "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB";
        let p = provider();
        let mut balances = BTreeMap::new();

        p.merge_raw(
            &mut balances,
            RawBalance {
                mint: USDC_MINT.to_string(),
                amount: 3_000_000,
                decimals: 6,
            },
        );
        p.merge_raw(
            &mut balances,
            RawBalance {
                mint: usdt.to_string(),
                amount: 2_000_000,
                decimals: 6,
            },
        );

        assert_eq!(balances.len(), 1);
        assert_eq!(balances[USDC_MINT].amount, 5_000_000);
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        let mut keyed = json_account(USDC_MINT, "5000000", 6);
        keyed.account.data = UiAccountData::Json(ParsedAccount {
            program: "spl-token".to_string(),
            parsed: serde_json::json!({"type": "mint"}),
            space: 82,
        });
        assert!(provider().decode_token_account(&keyed).is_none());
    }

    #[tokio::test]
    async fn test_snapshot_rejects_invalid_address() {
        let result = provider().snapshot("not-a-pubkey").await;
        assert!(matches!(result, Err(SnapshotError::InvalidAddress(_))));
    }
}
