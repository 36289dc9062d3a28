//! Mirror Orchestrator
//!
//! Owns the reconciliation loop. One cycle snapshots the follower wallet and
//! every source wallet, blends the sources into a target allocation, measures
//! the follower's drift from it, plans the bounded trades that close the gap,
//! and hands the plan to the execution coordinator. A drift-free cycle plans
//! nothing at all.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::application::coordinator::{ExecutionCoordinator, ExecutionReport};
use crate::domain::holding::{NATIVE_MINT, USDC_MINT};
use crate::domain::plan::{TradePlan, TradePlanner};
use crate::domain::risk::{RiskGuard, RiskLimits};
use crate::domain::snapshot::PortfolioSnapshot;
use crate::domain::target::{BlendStrategy, TargetBuilder, TargetError, TargetPortfolio};
use crate::domain::tolerance::weight_deviations;
use crate::ports::execution::SwapExecutor;
use crate::ports::snapshot::{SnapshotError, SnapshotProvider};

/// Aborts a cycle. Source wallet failures are not fatal and never appear
/// here, they only shrink the blend.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error("follower snapshot unavailable: {0}")]
    Follower(#[from] SnapshotError),

    #[error(transparent)]
    Target(#[from] TargetError),
}

/// Everything one cycle observed, decided, and did
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub follower_value_usd: Decimal,
    pub sources_blended: usize,
    pub target: TargetPortfolio,
    pub deviations: BTreeMap<String, Decimal>,
    pub plan: TradePlan,
    /// None when nothing was actionable or the cycle ran plan-only
    pub execution: Option<ExecutionReport>,
}

pub struct MirrorOrchestrator {
    snapshots: Arc<dyn SnapshotProvider>,
    coordinator: ExecutionCoordinator,
    limits: RiskLimits,
    blend: BlendStrategy,
    follower: String,
    sources: Vec<String>,
    native_mint: String,
    funding_mint: String,
    poll_interval: Duration,
    plan_only: bool,
    is_running: Arc<RwLock<bool>>,
    halted: Arc<RwLock<bool>>,
}

impl MirrorOrchestrator {
    pub fn new(
        snapshots: Arc<dyn SnapshotProvider>,
        executor: Arc<dyn SwapExecutor>,
        limits: RiskLimits,
        follower: String,
        sources: Vec<String>,
    ) -> Self {
        let halted = Arc::new(RwLock::new(false));
        let coordinator = ExecutionCoordinator::new(
            executor,
            Arc::clone(&snapshots),
            RiskGuard::new(limits.clone()),
        )
        .with_halt_flag(Arc::clone(&halted));

        MirrorOrchestrator {
            snapshots,
            coordinator,
            limits,
            blend: BlendStrategy::default(),
            follower,
            sources,
            native_mint: NATIVE_MINT.to_string(),
            funding_mint: USDC_MINT.to_string(),
            poll_interval: Duration::from_secs(60),
            plan_only: false,
            is_running: Arc::new(RwLock::new(false)),
            halted,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_blend(mut self, blend: BlendStrategy) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_mints(mut self, native_mint: &str, funding_mint: &str) -> Self {
        self.native_mint = native_mint.to_string();
        self.funding_mint = funding_mint.to_string();
        self.coordinator = self
            .coordinator
            .with_guard(RiskGuard::new(self.limits.clone()).with_native_mint(native_mint));
        self
    }

    /// Plan and log trades but never submit them
    pub fn with_plan_only(mut self, plan_only: bool) -> Self {
        self.plan_only = plan_only;
        self
    }

    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Reconcile forever at the poll interval until stopped
    pub async fn run(&self) {
        *self.is_running.write().await = true;
        *self.halted.write().await = false;

        info!(
            "mirror loop starting: follower {}, {} sources, poll every {:?}",
            self.follower,
            self.sources.len(),
            self.poll_interval
        );

        while *self.is_running.read().await {
            match self.run_cycle().await {
                Ok(report) => {
                    debug!(
                        "cycle done: {} actions planned against {} sources",
                        report.plan.len(),
                        report.sources_blended
                    );
                }
                Err(e) => {
                    error!("cycle aborted: {}", e);
                    // Keep running, the next poll may succeed
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }

        info!("mirror loop stopped");
    }

    /// Stop the loop and halt any trade submissions still pending
    pub async fn stop(&self) {
        *self.is_running.write().await = false;
        *self.halted.write().await = true;
        info!("stop signal sent to orchestrator");
    }

    /// Execute one reconciliation pass
    pub async fn run_cycle(&self) -> Result<CycleReport, CycleError> {
        let started = std::time::Instant::now();

        let current = self.snapshots.snapshot(&self.follower).await?;
        info!(
            "follower holds {} tokens worth ${}",
            current.len(),
            current.total_value_usd.round_dp(2)
        );
        self.warn_if_gas_low(&current);

        let sources = self.fetch_source_snapshots().await;
        let target = TargetBuilder::new(self.blend).build(&sources, &self.limits)?;
        let deviations = weight_deviations(&current, &target, &self.limits);

        if deviations.is_empty() {
            info!("allocation within tolerance, nothing to do");
            return Ok(CycleReport {
                follower_value_usd: current.total_value_usd,
                sources_blended: sources.len(),
                target,
                deviations,
                plan: TradePlan::default(),
                execution: None,
            });
        }

        let planner = TradePlanner::new(self.limits.clone())
            .with_mints(&self.native_mint, &self.funding_mint);
        let plan = planner.build(&deviations, &current);
        info!(
            "planned {} trades: {} sells (${}), {} buys (${})",
            plan.len(),
            plan.sells().count(),
            plan.total_sell_notional().round_dp(2),
            plan.buys().count(),
            plan.total_buy_notional().round_dp(2)
        );

        let execution = if plan.is_empty() {
            None
        } else if self.plan_only {
            for action in plan.actions() {
                info!(
                    "PLANNED {} {} ${} (deviation {})",
                    action.direction,
                    action.symbol,
                    action.notional_usd.round_dp(2),
                    action.deviation.round_dp(4)
                );
            }
            None
        } else {
            Some(
                self.coordinator
                    .execute_plan(&self.follower, plan.clone())
                    .await,
            )
        };

        debug!("cycle finished in {:?}", started.elapsed());
        Ok(CycleReport {
            follower_value_usd: current.total_value_usd,
            sources_blended: sources.len(),
            target,
            deviations,
            plan,
            execution,
        })
    }

    /// Fetch all source wallets concurrently, dropping the ones that fail
    async fn fetch_source_snapshots(&self) -> Vec<PortfolioSnapshot> {
        let mut tasks = JoinSet::new();
        for source in &self.sources {
            let provider = Arc::clone(&self.snapshots);
            let owner = source.clone();
            tasks.spawn(async move {
                let result = provider.snapshot(&owner).await;
                (owner, result)
            });
        }

        let mut snapshots = Vec::with_capacity(self.sources.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((owner, Ok(snapshot))) => {
                    debug!(
                        "source {}: {} tokens, ${}",
                        owner,
                        snapshot.len(),
                        snapshot.total_value_usd.round_dp(2)
                    );
                    snapshots.push(snapshot);
                }
                Ok((owner, Err(e))) => {
                    warn!("excluding source {} this cycle: {}", owner, e);
                }
                Err(e) => warn!("source snapshot task failed: {}", e),
            }
        }
        snapshots
    }

    fn warn_if_gas_low(&self, current: &PortfolioSnapshot) {
        match current.holding(&self.native_mint) {
            Some(native) if native.ui_amount() < self.limits.gas_buffer_sol => {
                warn!(
                    "native balance {} SOL is below the {} SOL gas buffer",
                    native.ui_amount().round_dp(4),
                    self.limits.gas_buffer_sol
                );
            }
            Some(_) => {}
            None => warn!("wallet holds no native SOL, swaps cannot pay fees"),
        }
    }
}

// Clone shares the run state so a signal handler can stop a running loop
impl Clone for MirrorOrchestrator {
    fn clone(&self) -> Self {
        MirrorOrchestrator {
            snapshots: Arc::clone(&self.snapshots),
            coordinator: self.coordinator.clone(),
            limits: self.limits.clone(),
            blend: self.blend,
            follower: self.follower.clone(),
            sources: self.sources.clone(),
            native_mint: self.native_mint.clone(),
            funding_mint: self.funding_mint.clone(),
            poll_interval: self.poll_interval,
            plan_only: self.plan_only,
            is_running: Arc::clone(&self.is_running),
            halted: Arc::clone(&self.halted),
        }
    }
}
