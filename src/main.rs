//! Shadowfolio - Copy-Trading Portfolio Mirror for Solana
//!
//! Watches one or more source wallets, blends their allocations into a
//! target portfolio, and keeps a follower wallet aligned via Jupiter swaps.

use anyhow::{Result, Context, bail};
use clap::Parser;
use rust_decimal::Decimal;
use tracing_subscriber::{fmt, EnvFilter};
use std::path::Path;
use std::sync::Arc;

use shadowfolio::adapters::birdeye::{BirdeyeClient, FallbackPriceProvider};
use shadowfolio::adapters::cli::{CliApp, Command, RunCmd, PlanCmd, StatusCmd, KeygenCmd};
use shadowfolio::adapters::executor::JupiterSwapExecutor;
use shadowfolio::adapters::jupiter::{JupiterClient, JupiterConfig, JupiterPriceProvider};
use shadowfolio::adapters::paper::PaperSwapExecutor;
use shadowfolio::adapters::solana::{RpcSnapshotProvider, SolanaClient, WalletManager};
use shadowfolio::application::MirrorOrchestrator;
use shadowfolio::config::{load_config, Config};
use shadowfolio::domain::TargetBuilder;
use shadowfolio::ports::execution::SwapExecutor;
use shadowfolio::ports::price::PriceProvider;
use shadowfolio::ports::snapshot::SnapshotProvider;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    let config_level = match &app.command {
        Command::Run(cmd) => peek_log_level(&cmd.config),
        Command::Plan(cmd) => peek_log_level(&cmd.config),
        Command::Status(cmd) => peek_log_level(&cmd.config),
        Command::Keygen(_) => None,
    };
    init_logging(app.verbose, app.debug, config_level.as_deref())?;

    match app.command {
        Command::Run(cmd) => run_command(cmd).await,
        Command::Plan(cmd) => plan_command(cmd).await,
        Command::Status(cmd) => status_command(cmd).await,
        Command::Keygen(cmd) => keygen_command(cmd),
    }
}

/// Best-effort read of the [logging] level before the subscriber exists; a
/// broken config file reports properly once the command loads it for real
fn peek_log_level(path: &Path) -> Option<String> {
    load_config(path).ok().map(|config| config.logging.level)
}

/// Level precedence: --debug/--verbose, then RUST_LOG, then the config file
fn init_logging(verbose: bool, debug: bool, config_level: Option<&str>) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else if let Ok(from_env) = EnvFilter::try_from_default_env() {
        from_env
    } else {
        EnvFilter::new(config_level.unwrap_or("warn"))
    };

    fmt().with_env_filter(filter).init();
    Ok(())
}

async fn run_command(cmd: RunCmd) -> Result<()> {
    if cmd.live && cmd.paper {
        bail!("--live and --paper are mutually exclusive");
    }
    if cmd.live && !cmd.i_accept_losses {
        bail!(
            "Live trading moves real funds.\n\
             Re-run with --live --i-accept-losses once you have reviewed the [risk] settings."
        );
    }

    tracing::info!("Starting shadowfolio mirror...");

    // Load config, then apply CLI overrides
    let mut config = load_config(&cmd.config)
        .context("Failed to load configuration")?;
    if let Some(rpc_url) = cmd.rpc_url {
        config.solana.rpc_url = rpc_url;
    }
    if let Some(keypair) = cmd.keypair {
        config.solana.keypair_path = keypair.display().to_string();
    }

    let paper = if cmd.live {
        false
    } else if cmd.paper {
        true
    } else {
        config.engine.paper_mode
    };

    // Build components
    let solana = SolanaClient::new_with_commitment(
        config.solana.get_rpc_url(),
        &config.solana.commitment,
    );
    let prices = build_price_stack(&config)?;
    let snapshots: Arc<dyn SnapshotProvider> = Arc::new(RpcSnapshotProvider::new(
        solana.clone(),
        Arc::clone(&prices),
    ));

    // Expand keypair path (handles ~ for home directory)
    let keypair_path = shellexpand::tilde(&config.solana.get_keypair_path()).to_string();

    // Load wallet with improved error handling
    let wallet = match load_wallet_with_context(&keypair_path, paper) {
        Ok(w) => w,
        Err(e) => {
            if paper {
                // In paper mode, create a random wallet and warn the user
                tracing::warn!(
                    "Wallet not found at '{}' - using random wallet for paper trading",
                    keypair_path
                );
                tracing::warn!(
                    "To create a real wallet, run: shadowfolio keygen --output {}",
                    keypair_path
                );
                WalletManager::new_random()
            } else {
                // In live mode, wallet is required - return helpful error
                return Err(e);
            }
        }
    };
    let follower = wallet.public_key();

    let executor: Arc<dyn SwapExecutor> = if paper {
        Arc::new(PaperSwapExecutor::new().with_funding_mint(&config.tokens.funding_mint))
    } else {
        let jupiter = JupiterClient::with_config(JupiterConfig {
            api_base_url: config.jupiter.api_url.clone(),
            api_key: config.jupiter.get_api_key(),
            ..JupiterConfig::default()
        })
        .context("Failed to create Jupiter client")?;

        Arc::new(
            JupiterSwapExecutor::new(
                jupiter,
                solana.clone(),
                wallet,
                Arc::clone(&snapshots),
                Arc::clone(&prices),
            )
            .with_funding_mint(&config.tokens.funding_mint)
            .with_priority_fee(config.jupiter.max_priority_fee_lamports)
            .with_restricted_intermediates(config.jupiter.restrict_intermediate_tokens)
            .with_confirm_timeout(config.engine.confirm_timeout()),
        )
    };

    // Create orchestrator
    let sources = config.sources.get_wallets();
    let orchestrator = MirrorOrchestrator::new(
        snapshots,
        executor,
        config.risk_limits().context("Invalid [risk] settings")?,
        follower.clone(),
        sources.clone(),
    )
    .with_blend(config.blend_strategy().context("Invalid [sources] settings")?)
    .with_poll_interval(config.engine.poll_interval())
    .with_mints(&config.tokens.native_mint, &config.tokens.funding_mint);

    // Setup Ctrl+C handler
    let orch = orchestrator.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received");
        orch.stop().await;
    });

    // Run
    if paper {
        tracing::warn!("PAPER TRADING MODE - no real transactions");
    } else {
        tracing::warn!("LIVE TRADING MODE - swaps will move real funds");
    }
    tracing::info!("Mirroring {} source wallet(s) into {}", sources.len(), follower);

    orchestrator.run().await;
    tracing::info!("Shadowfolio stopped");
    Ok(())
}

async fn plan_command(cmd: PlanCmd) -> Result<()> {
    let config = load_config(&cmd.config)
        .context("Failed to load configuration")?;

    let solana = SolanaClient::new_with_commitment(
        config.solana.get_rpc_url(),
        &config.solana.commitment,
    );
    let prices = build_price_stack(&config)?;
    let snapshots: Arc<dyn SnapshotProvider> =
        Arc::new(RpcSnapshotProvider::new(solana, Arc::clone(&prices)));

    let follower = match cmd.wallet {
        Some(address) => address,
        None => {
            let keypair_path = shellexpand::tilde(&config.solana.get_keypair_path()).to_string();
            load_wallet_with_context(&keypair_path, false)?.public_key()
        }
    };

    // Plan-only cycles never reach the executor
    let executor: Arc<dyn SwapExecutor> =
        Arc::new(PaperSwapExecutor::new().with_funding_mint(&config.tokens.funding_mint));

    let orchestrator = MirrorOrchestrator::new(
        snapshots,
        executor,
        config.risk_limits().context("Invalid [risk] settings")?,
        follower.clone(),
        config.sources.get_wallets(),
    )
    .with_blend(config.blend_strategy().context("Invalid [sources] settings")?)
    .with_mints(&config.tokens.native_mint, &config.tokens.funding_mint)
    .with_plan_only(true);

    let report = orchestrator.run_cycle().await.context("Reconcile cycle failed")?;

    println!("Follower: {}", follower);
    println!("Portfolio value: ${}", report.follower_value_usd.round_dp(2));
    println!("Sources blended: {}", report.sources_blended);
    println!();

    println!("Target allocation:");
    for (mint, weight) in report.target.iter() {
        println!("  {:>7}%  {}", (weight * Decimal::ONE_HUNDRED).round_dp(2), mint);
    }
    println!();

    if report.plan.is_empty() {
        println!("Planned actions: none (within tolerance)");
    } else {
        println!("Planned actions:");
        for action in report.plan.actions() {
            println!(
                "  {} {} ${} (deviation {})",
                action.direction,
                action.symbol,
                action.notional_usd.round_dp(2),
                action.deviation.round_dp(4)
            );
        }
    }

    Ok(())
}

async fn status_command(cmd: StatusCmd) -> Result<()> {
    let config = load_config(&cmd.config)
        .context("Failed to load configuration")?;

    let solana = SolanaClient::new_with_commitment(
        config.solana.get_rpc_url(),
        &config.solana.commitment,
    );
    let prices = build_price_stack(&config)?;
    let snapshots = RpcSnapshotProvider::new(solana, prices);

    let owner = match cmd.wallet {
        Some(address) => address,
        None => {
            let keypair_path = shellexpand::tilde(&config.solana.get_keypair_path()).to_string();
            load_wallet_with_context(&keypair_path, false)?.public_key()
        }
    };

    let snapshot = snapshots
        .snapshot(&owner)
        .await
        .context("Failed to fetch wallet snapshot")?;

    println!("Wallet: {}", snapshot.owner);
    println!("Total value: ${}", snapshot.total_value_usd.round_dp(2));
    println!();
    for holding in snapshot.holdings() {
        println!(
            "  {:<10} {:>18}  ${:>12}  {:>6}%",
            holding.symbol,
            holding.ui_amount().round_dp(4),
            holding.usd_value.round_dp(2),
            (snapshot.weight_of(&holding.mint) * Decimal::ONE_HUNDRED).round_dp(2)
        );
    }

    // One-shot peek, so sources fetch serially; failures only shrink the blend
    let mut source_snapshots = Vec::new();
    for source in config.sources.get_wallets() {
        match snapshots.snapshot(&source).await {
            Ok(snap) => source_snapshots.push(snap),
            Err(err) => tracing::warn!("Skipping source {}: {}", source, err),
        }
    }

    let blend = config.blend_strategy().context("Invalid [sources] settings")?;
    let limits = config.risk_limits().context("Invalid [risk] settings")?;

    println!();
    match TargetBuilder::new(blend).build(&source_snapshots, &limits) {
        Ok(target) => {
            println!("Blended target ({} source(s)):", source_snapshots.len());
            for (mint, weight) in target.iter() {
                println!("  {:>7}%  {}", (weight * Decimal::ONE_HUNDRED).round_dp(2), mint);
            }
        }
        Err(err) => println!("Blended target: unavailable ({})", err),
    }

    Ok(())
}

fn keygen_command(cmd: KeygenCmd) -> Result<()> {
    let output = shellexpand::tilde(&cmd.output.display().to_string()).to_string();
    let path = Path::new(&output);

    if path.exists() && !cmd.force {
        bail!("Refusing to overwrite existing keypair at {} (use --force)", output);
    }

    let wallet = WalletManager::new_random();
    wallet
        .save_to_file(path)
        .context("Failed to write keypair file")?;

    println!("Wrote new keypair to {}", output);
    println!("Public key: {}", wallet.public_key());
    Ok(())
}

fn build_price_stack(config: &Config) -> Result<Arc<dyn PriceProvider>> {
    let jupiter = JupiterPriceProvider::new(
        config.jupiter.price_api_url.clone(),
        config.jupiter.get_api_key(),
    )
    .context("Failed to create Jupiter price provider")?;

    // Birdeye backs Jupiter up when an API key is configured
    match config.birdeye.get_api_key() {
        Some(api_key) => {
            let birdeye = BirdeyeClient::new(config.birdeye.api_url.clone(), api_key)
                .context("Failed to create Birdeye client")?;
            Ok(Arc::new(FallbackPriceProvider::new(
                Arc::new(jupiter),
                Arc::new(birdeye),
            )))
        }
        None => Ok(Arc::new(jupiter)),
    }
}

/// Load wallet with helpful error messages
fn load_wallet_with_context(keypair_path: &str, is_paper_mode: bool) -> Result<WalletManager> {
    // A key in the environment wins over the file
    let env_key_set = std::env::var("WALLET_PRIVATE_KEY")
        .map(|v| !v.trim().is_empty())
        .unwrap_or(false);
    if env_key_set {
        return WalletManager::from_env_or_file(keypair_path).map_err(|e| {
            anyhow::anyhow!("Failed to load wallet from WALLET_PRIVATE_KEY: {}", e)
        });
    }

    let path = Path::new(keypair_path);

    // Check if file exists first for a clearer error message
    if !path.exists() {
        let mode_hint = if is_paper_mode {
            "In paper mode, a random wallet will be used instead."
        } else {
            "A wallet is required for live trading."
        };

        bail!(
            "Wallet file not found: {}\n\n\
             {}\n\n\
             To create a new wallet, run:\n  \
             shadowfolio keygen --output {}\n\n\
             Or if you have an existing wallet, update 'keypair_path' in your config.toml",
            keypair_path,
            mode_hint,
            keypair_path
        );
    }

    // Check if file is readable
    if let Err(e) = std::fs::metadata(path) {
        bail!(
            "Cannot access wallet file '{}': {}\n\n\
             Check file permissions and ensure the path is correct.",
            keypair_path,
            e
        );
    }

    // Try to load the wallet
    WalletManager::from_file(keypair_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load wallet from '{}': {}\n\n\
             The file exists but may be corrupted or in the wrong format.\n\
             Expected format: JSON array of bytes (e.g., [1,2,3,...])\n\n\
             To create a new wallet, run:\n  \
             shadowfolio keygen --output {}",
            keypair_path,
            e,
            keypair_path
        )
    })
}
