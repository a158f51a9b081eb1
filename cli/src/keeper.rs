//! Liquidation keeper loop

use aerospacer_client::{find_liquidatable, sort_positions};
use anyhow::Result;
use colored::Colorize;
use std::time::Duration;
use tokio::time::sleep;

use crate::client::{self, format_pubkey, format_ratio, Outcome};
use crate::config::NetworkConfig;
use crate::liquidation::{liquidate_batch, Selection};
use crate::troves::parse_percent;

pub async fn run_keeper(
    config: &NetworkConfig,
    interval: u64,
    monitor_only: bool,
    threshold: String,
    batch: usize,
    dry_run: bool,
) -> Result<()> {
    let threshold = parse_percent(&threshold)?;
    if batch == 0 {
        anyhow::bail!("--batch must be at least 1");
    }

    println!("{}", "=== Starting Keeper Bot ===".bright_green().bold());
    println!("{} {}", "Denom:".bright_cyan(), config.collateral_denom);
    println!("{} {}", "Threshold:".bright_cyan(), format_ratio(threshold));
    println!("{} {}s", "Interval:".bright_cyan(), interval);
    println!("{} {}", "Monitor Only:".bright_cyan(), if monitor_only { "Yes" } else { "No" });

    println!("\n{}", "Keeper is running...".bright_green());
    println!("{}", "(Press Ctrl+C to stop)".dimmed());

    let rpc = client::create_rpc_client(config);
    let ctx = client::load_context(config, &rpc).await?;
    let interval_duration = Duration::from_secs(interval);

    loop {
        println!(
            "\n{}",
            format!("[{}] Checking for liquidations...", chrono::Local::now().format("%H:%M:%S")).dimmed()
        );

        // A failed pass is logged and retried on the next tick
        if let Err(e) = run_pass(config, &rpc, &ctx, threshold, batch, monitor_only, dry_run).await {
            log::warn!("keeper pass failed: {:#}", e);
            println!("  {} {:#}", "✗".red(), e);
        }

        sleep(interval_duration).await;
    }
}

async fn run_pass(
    config: &NetworkConfig,
    rpc: &solana_client::nonblocking::rpc_client::RpcClient,
    ctx: &aerospacer_client::ProtocolContext,
    threshold: u64,
    batch: usize,
    monitor_only: bool,
    dry_run: bool,
) -> Result<()> {
    let snapshot = client::load_snapshot(config, rpc).await?;
    let sorted = sort_positions(snapshot.positions);
    let at_risk = find_liquidatable(&sorted, threshold);

    println!("  {} {} troves, {} below threshold", "ℹ".blue(), sorted.len(), at_risk.len());
    if at_risk.is_empty() {
        println!("  {} No liquidatable troves found", "✓".green());
        return Ok(());
    }

    for p in at_risk {
        println!("  {} {} ({})", "├─".dimmed(), format_pubkey(&p.owner), format_ratio(p.health_ratio));
    }
    if monitor_only {
        return Ok(());
    }

    // Only the first batch per pass; later troves are picked up on the next tick
    // against a fresh snapshot.
    let targets = at_risk.iter().take(batch).map(|p| p.owner).collect::<Vec<_>>();
    let count = targets.len();
    let selection = Selection::Auto { threshold, max: batch };
    match liquidate_batch(config, rpc, ctx, selection, targets, dry_run).await? {
        Outcome::Sent(_) => println!("  {} Liquidated {} trove(s)", "✓".green(), count),
        Outcome::Simulated => println!("  {} Simulated liquidation of {} trove(s)", "ℹ".blue(), count),
        Outcome::Rejected(rejection) => {
            log::warn!("liquidation rejected: {}", rejection);
            println!("  {} Liquidation rejected: {}", "✗".red(), rejection);
        }
    }

    Ok(())
}
