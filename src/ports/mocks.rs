//! Recording mocks for the three ports
//!
//! Each mock records its calls and serves scripted responses through
//! `with_*` builders. Compiled into the library so integration tests under
//! `tests/` can drive full cycles without any network.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::plan::TradeAction;
use crate::domain::snapshot::PortfolioSnapshot;
use crate::ports::execution::{ExecutionError, SwapExecutor, SwapReceipt};
use crate::ports::price::{PriceError, PriceProvider};
use crate::ports::snapshot::{SnapshotError, SnapshotProvider};

/// Mock snapshot provider with per-wallet scripted snapshots
#[derive(Debug, Default)]
pub struct MockSnapshotProvider {
    calls: Arc<Mutex<Vec<String>>>,
    responses: Arc<Mutex<HashMap<String, VecDeque<PortfolioSnapshot>>>>,
    failures: Arc<Mutex<HashSet<String>>>,
}

impl MockSnapshotProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves this snapshot for every fetch of the wallet
    pub fn with_snapshot(self, snapshot: PortfolioSnapshot) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(snapshot.owner.clone())
            .or_default()
            .push_back(snapshot);
        self
    }

    /// Fails every fetch of the wallet with an RPC error
    pub fn with_failure(self, owner: &str) -> Self {
        self.failures.lock().unwrap().insert(owner.to_string());
        self
    }

    /// Wallets fetched, in call order
    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotProvider for MockSnapshotProvider {
    async fn snapshot(&self, owner: &str) -> Result<PortfolioSnapshot, SnapshotError> {
        self.calls.lock().unwrap().push(owner.to_string());
        if self.failures.lock().unwrap().contains(owner) {
            return Err(SnapshotError::Rpc(format!("mock rpc failure for {owner}")));
        }
        let mut responses = self.responses.lock().unwrap();
        let queue = responses
            .get_mut(owner)
            .ok_or_else(|| SnapshotError::Rpc(format!("no snapshot configured for {owner}")))?;
        // Scripted snapshots drain in order; the last one keeps serving so
        // repeated guard re-checks see stable state
        let snapshot = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        snapshot.ok_or_else(|| SnapshotError::Rpc(format!("no snapshot configured for {owner}")))
    }
}

/// Mock price provider with fixed per-mint prices
#[derive(Debug, Default)]
pub struct MockPriceProvider {
    calls: Arc<Mutex<Vec<String>>>,
    prices: Arc<Mutex<HashMap<String, Decimal>>>,
}

impl MockPriceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(self, mint: &str, price: Decimal) -> Self {
        self.prices.lock().unwrap().insert(mint.to_string(), price);
        self
    }

    pub fn get_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceProvider for MockPriceProvider {
    async fn usd_price(&self, mint: &str) -> Result<Decimal, PriceError> {
        self.calls.lock().unwrap().push(mint.to_string());
        self.prices
            .lock()
            .unwrap()
            .get(mint)
            .copied()
            .ok_or_else(|| PriceError::Unavailable(mint.to_string()))
    }
}

/// Mock swap executor with per-mint scripted outcomes
#[derive(Debug, Default)]
pub struct MockSwapExecutor {
    calls: Arc<Mutex<Vec<TradeAction>>>,
    failures: Arc<Mutex<HashMap<String, ExecutionError>>>,
}

impl MockSwapExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails every action on this mint with the given error
    pub fn with_failure(self, mint: &str, error: ExecutionError) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(mint.to_string(), error);
        self
    }

    /// Actions handed to the executor, in submission order
    pub fn get_calls(&self) -> Vec<TradeAction> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SwapExecutor for MockSwapExecutor {
    async fn execute(&self, action: &TradeAction) -> Result<SwapReceipt, ExecutionError> {
        let call_index = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(action.clone());
            calls.len()
        };
        if let Some(error) = self.failures.lock().unwrap().get(&action.mint) {
            return Err(error.clone());
        }
        Ok(SwapReceipt::on_chain(format!("MockSig{call_index}")))
    }
}
