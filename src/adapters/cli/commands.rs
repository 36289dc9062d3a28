//! CLI Command Definitions
//!
//! Argument surface for the shadowfolio binary. Only parsing lives here;
//! the handlers sit in main where the component stack is assembled.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Shadowfolio - Copy-Trading Portfolio Mirror for Solana
#[derive(Parser, Debug)]
#[command(
    name = "shadowfolio",
    version = env!("CARGO_PKG_VERSION"),
    author = env!("CARGO_PKG_AUTHORS"),
    about = "Copy-trading portfolio mirror for Solana/Jupiter",
    long_about = "Shadowfolio watches a set of source wallets, blends their allocations \
                  into a single target portfolio, and rebalances the follower wallet \
                  toward it with risk-bounded Jupiter swaps."
)]
pub struct CliApp {
    /// The command to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the mirror loop
    Run(RunCmd),

    /// Compute one cycle's trade plan without executing it
    Plan(PlanCmd),

    /// Show a wallet's holdings and allocation weights
    Status(StatusCmd),

    /// Generate a new follower wallet keypair
    Keygen(KeygenCmd),
}

/// Start the mirror loop
#[derive(Parser, Debug)]
pub struct RunCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mirror.toml")]
    pub config: PathBuf,

    /// Run in paper trading mode (no real transactions)
    #[arg(short, long)]
    pub paper: bool,

    /// Enable live mainnet trading (requires --i-accept-losses)
    #[arg(long, help = "Enable live mainnet trading")]
    pub live: bool,

    /// Acknowledge risk of financial loss (required for --live)
    #[arg(long, help = "Acknowledge risk of financial loss")]
    pub i_accept_losses: bool,

    /// Override RPC URL
    #[arg(long, value_name = "URL")]
    pub rpc_url: Option<String>,

    /// Override keypair path
    #[arg(long, value_name = "FILE")]
    pub keypair: Option<PathBuf>,
}

/// Compute one cycle's trade plan
#[derive(Parser, Debug)]
pub struct PlanCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mirror.toml")]
    pub config: PathBuf,

    /// Plan for this follower address instead of the configured wallet
    #[arg(long, value_name = "ADDRESS")]
    pub wallet: Option<String>,
}

/// Show wallet holdings
#[derive(Parser, Debug)]
pub struct StatusCmd {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config/mirror.toml")]
    pub config: PathBuf,

    /// Inspect this address instead of the configured wallet
    #[arg(long, value_name = "ADDRESS")]
    pub wallet: Option<String>,
}

/// Generate a new keypair
#[derive(Parser, Debug)]
pub struct KeygenCmd {
    /// Where to write the keypair file
    #[arg(short, long, value_name = "FILE", default_value = "wallet.json")]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}
