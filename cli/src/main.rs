//! Aerospacer CLI - operator tool for the Aerospacer lending protocol
//!
//! Drives the client library end to end against a cluster: inspects the
//! ICR-sorted trove list, manages the signer's trove and stake, liquidates
//! and redeems, and runs a liquidation keeper.

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod client;
mod config;
mod keeper;
mod liquidation;
mod stability;
mod trove;
mod troves;

use config::NetworkConfig;

#[derive(Parser)]
#[command(name = "aerospacer")]
#[command(about = "Aerospacer Protocol CLI - manage troves, stake and liquidations", long_about = None)]
#[command(version)]
struct Cli {
    /// Network to connect to (localnet, devnet, mainnet-beta)
    #[arg(short, long, default_value = "devnet")]
    network: String,

    /// RPC URL (overrides network default)
    #[arg(short, long)]
    url: Option<String>,

    /// Path to keypair file
    #[arg(short, long)]
    keypair: Option<PathBuf>,

    /// TOML file overriding program ids and protocol accounts
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Collateral denom (overrides config file)
    #[arg(long, global = true)]
    denom: Option<String>,

    /// Simulate only; print payload and accounts without sending
    #[arg(long, global = true)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect the ICR-sorted trove list
    Troves {
        #[command(subcommand)]
        command: TroveCommands,
    },

    /// Open a trove: deposit collateral and borrow stablecoin
    Open {
        /// Collateral to deposit (e.g. 1.5)
        #[arg(long)]
        collateral: String,

        /// Stablecoin to borrow
        #[arg(long)]
        loan: String,

        /// Collateral price in USD, used to place the trove in the sorted list
        #[arg(long)]
        price: String,
    },

    /// Add collateral to the signer's trove
    AddCollateral {
        amount: String,

        #[arg(long)]
        price: String,
    },

    /// Withdraw collateral from the signer's trove
    RemoveCollateral {
        amount: String,

        #[arg(long)]
        price: String,
    },

    /// Borrow more stablecoin against the signer's trove
    Borrow {
        amount: String,

        #[arg(long)]
        price: String,
    },

    /// Repay stablecoin debt
    Repay {
        amount: String,

        #[arg(long)]
        price: String,
    },

    /// Stake stablecoin in the stability pool
    Stake { amount: String },

    /// Unstake stablecoin from the stability pool
    Unstake { amount: String },

    /// Withdraw collateral gains earned by the stability pool stake
    WithdrawGains,

    /// Liquidate undercollateralized troves
    Liquidate {
        /// Trove owners to liquidate
        owners: Vec<String>,

        /// Pick every trove below the threshold from a fresh snapshot
        #[arg(long, conflicts_with = "owners")]
        auto: bool,

        /// Liquidation threshold in percent
        #[arg(long, default_value = "110")]
        threshold: String,

        /// Maximum troves per transaction
        #[arg(long, default_value = "5")]
        max: usize,
    },

    /// Redeem stablecoin for collateral from the riskiest troves
    Redeem {
        #[arg(long)]
        amount: String,

        /// Maximum troves to draw from
        #[arg(long, default_value = "3")]
        max_targets: usize,
    },

    /// Keeper operations
    Keeper {
        #[command(subcommand)]
        command: KeeperCommands,
    },
}

#[derive(Subcommand)]
enum TroveCommands {
    /// List live troves, riskiest first
    List {
        /// Show at most this many
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one trove (defaults to the signer's)
    Show { owner: Option<String> },

    /// Resolve the neighbor hints for a hypothetical trove
    Neighbors {
        /// Trove owner (defaults to the signer)
        #[arg(long)]
        owner: Option<String>,

        #[arg(long)]
        collateral: String,

        #[arg(long)]
        debt: String,

        #[arg(long)]
        price: String,
    },

    /// List troves below a threshold
    Liquidatable {
        /// Threshold in percent
        #[arg(long, default_value = "110")]
        threshold: String,
    },
}

#[derive(Subcommand)]
enum KeeperCommands {
    /// Watch the sorted list and liquidate troves below the threshold
    Run {
        /// Seconds between checks
        #[arg(short, long, default_value = "30")]
        interval: u64,

        /// Only report liquidatable troves
        #[arg(long)]
        monitor_only: bool,

        /// Liquidation threshold in percent
        #[arg(long, default_value = "110")]
        threshold: String,

        /// Maximum troves per liquidation transaction
        #[arg(long, default_value = "5")]
        batch: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    // Initialize network configuration
    let mut config = NetworkConfig::new(
        &cli.network,
        cli.url.clone(),
        cli.keypair.clone(),
        cli.config.clone(),
    )?;
    if let Some(denom) = cli.denom {
        config.collateral_denom = denom;
    }

    if cli.verbose {
        println!("{} {}", "Network:".bright_cyan(), config.network);
        println!("{} {}", "RPC URL:".bright_cyan(), config.rpc_url);
        println!("{} {}", "WS URL:".bright_cyan(), config.ws_url);
        println!("{} {}", "Keypair:".bright_cyan(), config.keypair_path.display());
        println!("{} {}", "Program:".bright_cyan(), config.protocol_program_id);
        println!("{} {}", "Denom:".bright_cyan(), config.collateral_denom);
    }

    let dry_run = cli.dry_run;

    // Execute command
    match cli.command {
        Commands::Troves { command } => match command {
            TroveCommands::List { limit } => {
                troves::list_troves(&config, limit).await?;
            }
            TroveCommands::Show { owner } => {
                troves::show_trove(&config, owner).await?;
            }
            TroveCommands::Neighbors { owner, collateral, debt, price } => {
                troves::show_neighbors(&config, owner, collateral, debt, price).await?;
            }
            TroveCommands::Liquidatable { threshold } => {
                troves::list_liquidatable(&config, threshold).await?;
            }
        },
        Commands::Open { collateral, loan, price } => {
            trove::open_trove(&config, collateral, loan, price, dry_run).await?;
        }
        Commands::AddCollateral { amount, price } => {
            trove::adjust(&config, trove::Adjustment::AddCollateral, amount, price, dry_run).await?;
        }
        Commands::RemoveCollateral { amount, price } => {
            trove::adjust(&config, trove::Adjustment::RemoveCollateral, amount, price, dry_run).await?;
        }
        Commands::Borrow { amount, price } => {
            trove::adjust(&config, trove::Adjustment::Borrow, amount, price, dry_run).await?;
        }
        Commands::Repay { amount, price } => {
            trove::adjust(&config, trove::Adjustment::Repay, amount, price, dry_run).await?;
        }
        Commands::Stake { amount } => {
            stability::stake(&config, amount, dry_run).await?;
        }
        Commands::Unstake { amount } => {
            stability::unstake(&config, amount, dry_run).await?;
        }
        Commands::WithdrawGains => {
            stability::withdraw_gains(&config, dry_run).await?;
        }
        Commands::Liquidate { owners, auto, threshold, max } => {
            liquidation::liquidate(&config, owners, auto, threshold, max, dry_run).await?;
        }
        Commands::Redeem { amount, max_targets } => {
            liquidation::redeem(&config, amount, max_targets, dry_run).await?;
        }
        Commands::Keeper { command } => match command {
            KeeperCommands::Run { interval, monitor_only, threshold, batch } => {
                keeper::run_keeper(&config, interval, monitor_only, threshold, batch, dry_run).await?;
            }
        },
    }

    Ok(())
}
