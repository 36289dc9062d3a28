//! Execution Coordinator
//!
//! Drives a trade plan against the swap executor, one action at a time, in
//! plan order. Each action passes through a small state machine:
//!
//! PENDING -> SUBMITTED -> CONFIRMED | FAILED
//!         \-> SKIPPED (guard rejection, halt, or unrefreshable state)
//!
//! A failed action never blocks the rest of the plan and is never retried
//! within the cycle.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::plan::{TradeAction, TradePlan};
use crate::domain::risk::RiskGuard;
use crate::ports::execution::{ExecutionError, SwapExecutor};
use crate::ports::snapshot::SnapshotProvider;

/// Final state of one action after the coordinator handled it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionState {
    Pending,
    Submitted,
    Confirmed,
    Failed,
    Skipped,
}

impl std::fmt::Display for ActionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ActionState::Pending => "PENDING",
            ActionState::Submitted => "SUBMITTED",
            ActionState::Confirmed => "CONFIRMED",
            ActionState::Failed => "FAILED",
            ActionState::Skipped => "SKIPPED",
        };
        write!(f, "{label}")
    }
}

/// One action's journey through the state machine
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub action: TradeAction,
    pub state: ActionState,
    pub signature: Option<String>,
    /// Failure or skip reason, None for confirmed actions
    pub detail: Option<String>,
}

impl ActionOutcome {
    fn confirmed(action: TradeAction, signature: Option<String>) -> Self {
        ActionOutcome {
            action,
            state: ActionState::Confirmed,
            signature,
            detail: None,
        }
    }

    fn failed(action: TradeAction, error: &ExecutionError) -> Self {
        ActionOutcome {
            action,
            state: ActionState::Failed,
            signature: None,
            detail: Some(error.to_string()),
        }
    }

    fn skipped(action: TradeAction, reason: String) -> Self {
        ActionOutcome {
            action,
            state: ActionState::Skipped,
            signature: None,
            detail: Some(reason),
        }
    }
}

/// Per-plan execution summary, one outcome per planned action
#[derive(Debug, Clone, Default)]
pub struct ExecutionReport {
    outcomes: Vec<ActionOutcome>,
}

impl ExecutionReport {
    pub fn outcomes(&self) -> &[ActionOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn confirmed_count(&self) -> usize {
        self.count(ActionState::Confirmed)
    }

    pub fn failed_count(&self) -> usize {
        self.count(ActionState::Failed)
    }

    pub fn skipped_count(&self) -> usize {
        self.count(ActionState::Skipped)
    }

    fn count(&self, state: ActionState) -> usize {
        self.outcomes.iter().filter(|o| o.state == state).count()
    }

    fn push(&mut self, outcome: ActionOutcome) {
        self.outcomes.push(outcome);
    }
}

/// Executes trade plans strictly in order with a risk re-check per action
#[derive(Clone)]
pub struct ExecutionCoordinator {
    executor: Arc<dyn SwapExecutor>,
    snapshots: Arc<dyn SnapshotProvider>,
    guard: RiskGuard,
    halted: Arc<RwLock<bool>>,
}

impl ExecutionCoordinator {
    pub fn new(
        executor: Arc<dyn SwapExecutor>,
        snapshots: Arc<dyn SnapshotProvider>,
        guard: RiskGuard,
    ) -> Self {
        ExecutionCoordinator {
            executor,
            snapshots,
            guard,
            halted: Arc::new(RwLock::new(false)),
        }
    }

    /// Shares an externally owned halt flag (the orchestrator's stop signal)
    pub fn with_halt_flag(mut self, halted: Arc<RwLock<bool>>) -> Self {
        self.halted = halted;
        self
    }

    pub fn with_guard(mut self, guard: RiskGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Skips every not-yet-submitted action; never interrupts mid-submission
    pub async fn halt(&self) {
        *self.halted.write().await = true;
    }

    /// Runs the plan to completion, returning one outcome per action
    pub async fn execute_plan(&self, owner: &str, plan: TradePlan) -> ExecutionReport {
        let total = plan.len();
        let mut report = ExecutionReport::default();

        for (index, action) in plan.into_actions().into_iter().enumerate() {
            let position = format!("[{}/{}]", index + 1, total);

            if *self.halted.read().await {
                warn!(
                    "{} SKIPPED {} {} ${}: halt requested",
                    position, action.direction, action.symbol, action.notional_usd
                );
                report.push(ActionOutcome::skipped(
                    action,
                    "halt requested before submission".to_string(),
                ));
                continue;
            }

            // Re-check against live state, not the planning snapshot
            let current = match self.snapshots.snapshot(owner).await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    warn!(
                        "{} SKIPPED {} {} ${}: state refresh failed: {}",
                        position, action.direction, action.symbol, action.notional_usd, err
                    );
                    report.push(ActionOutcome::skipped(
                        action,
                        format!("state refresh failed: {err}"),
                    ));
                    continue;
                }
            };

            if let Err(violation) = self.guard.check(&action, &current) {
                warn!(
                    "{} SKIPPED {} {} ${}: {}",
                    position, action.direction, action.symbol, action.notional_usd, violation
                );
                report.push(ActionOutcome::skipped(action, violation.to_string()));
                continue;
            }

            debug!(
                "{} SUBMITTED {} {} ${} (slippage {} bps)",
                position,
                action.direction,
                action.symbol,
                action.notional_usd,
                action.max_slippage_bps
            );
            match self.executor.execute(&action).await {
                Ok(receipt) => {
                    info!(
                        "{} CONFIRMED {} {} ${} tx={}",
                        position,
                        action.direction,
                        action.symbol,
                        action.notional_usd,
                        receipt.signature.as_deref().unwrap_or("settled-in-place")
                    );
                    report.push(ActionOutcome::confirmed(action, receipt.signature));
                }
                Err(err) => {
                    // No retry within the cycle, the plan's pricing is stale
                    warn!(
                        "{} FAILED {} {} ${}: {}",
                        position, action.direction, action.symbol, action.notional_usd, err
                    );
                    report.push(ActionOutcome::failed(action, &err));
                }
            }
        }

        info!(
            "plan finished: {} confirmed, {} failed, {} skipped",
            report.confirmed_count(),
            report.failed_count(),
            report.skipped_count()
        );
        report
    }
}
