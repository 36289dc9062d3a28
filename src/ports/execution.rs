//! Swap Executor Port
//!
//! Contract for turning one TradeAction into an on-chain swap. The live
//! implementation routes through Jupiter; the paper implementation simulates
//! fills in-process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::plan::TradeAction;

#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    #[error("execution timed out: {0}")]
    Timeout(String),

    #[error("slippage tolerance exceeded")]
    SlippageExceeded,

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("execution failed: {0}")]
    Other(String),
}

/// Outcome of a confirmed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapReceipt {
    /// Transaction signature; None when the action settled in the funding
    /// asset without an on-chain swap
    pub signature: Option<String>,
}

impl SwapReceipt {
    pub fn on_chain(signature: String) -> Self {
        SwapReceipt {
            signature: Some(signature),
        }
    }

    pub fn settled_in_place() -> Self {
        SwapReceipt { signature: None }
    }
}

#[async_trait]
pub trait SwapExecutor: Send + Sync {
    /// Executes one action to completion: submit, confirm, report
    async fn execute(&self, action: &TradeAction) -> Result<SwapReceipt, ExecutionError>;
}
