//! Liquidation and redemption against the riskiest troves

use aerospacer_client::constants::STABLECOIN_DECIMALS;
use aerospacer_client::{
    find_liquidatable, parse_units_u64, select_redemption_targets, sort_positions, Operation, Position,
    ProtocolContext, RedemptionPlan, Trailing,
};
use anyhow::{Context, Result};
use colored::Colorize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::client::{self, format_pubkey, format_ratio, Attempt, Outcome};
use crate::config::NetworkConfig;
use crate::troves::{format_collateral, format_debt, parse_percent};

/// Keep the requested owners in sorted (ascending ICR) order
///
/// The program walks the list expecting non-decreasing ICRs, so the order
/// given on the command line is not trusted.
pub fn order_targets(sorted: &[Position], owners: &[Pubkey]) -> Result<Vec<Pubkey>> {
    let missing: Vec<String> = owners
        .iter()
        .filter(|owner| !sorted.iter().any(|p| &p.owner == *owner))
        .map(|owner| owner.to_string())
        .collect();
    if !missing.is_empty() {
        anyhow::bail!("No live trove for: {}", missing.join(", "));
    }

    Ok(sorted
        .iter()
        .filter(|p| owners.contains(&p.owner))
        .map(|p| p.owner)
        .collect())
}

/// Which troves a liquidation goes after
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    /// Troves below `threshold`, riskiest first, at most `max`
    Auto { threshold: u64, max: usize },
    /// These owners, in ICR order
    Owners(&'a [Pubkey]),
}

impl Selection<'_> {
    pub fn select(&self, sorted: &[Position]) -> Result<Vec<Pubkey>> {
        match *self {
            Selection::Auto { threshold, max } => Ok(find_liquidatable(sorted, threshold)
                .iter()
                .take(max)
                .map(|p| p.owner)
                .collect()),
            Selection::Owners(owners) => order_targets(sorted, owners),
        }
    }
}

fn liquidation_attempt(config: &NetworkConfig, ctx: &ProtocolContext, targets: Vec<Pubkey>) -> Result<Attempt> {
    let op = Operation::liquidate_troves(targets, &config.collateral_denom);
    let prepared = ctx.prepare(&config.pubkey(), &op, Trailing::None)?;
    Ok(Attempt { setup: Vec::new(), prepared })
}

/// Submit one liquidation transaction for `targets`
///
/// If the program rejects the list as out of order, targets are selected
/// again from a fresh snapshot and submitted once more.
pub async fn liquidate_batch(
    config: &NetworkConfig,
    rpc: &RpcClient,
    ctx: &ProtocolContext,
    selection: Selection<'_>,
    targets: Vec<Pubkey>,
    dry_run: bool,
) -> Result<Outcome> {
    let first = liquidation_attempt(config, ctx, targets)?;
    client::execute_with_retry(config, rpc, first, dry_run, || async move {
        let snapshot = client::load_snapshot(config, rpc).await?;
        let sorted = sort_positions(snapshot.positions);
        let targets = selection.select(&sorted)?;
        if targets.is_empty() {
            anyhow::bail!("No liquidatable troves left after refreshing the snapshot");
        }
        log::info!("reselected {} liquidation target(s)", targets.len());
        liquidation_attempt(config, ctx, targets)
    })
    .await
}

pub async fn liquidate(
    config: &NetworkConfig,
    owners: Vec<String>,
    auto: bool,
    threshold: String,
    max: usize,
    dry_run: bool,
) -> Result<()> {
    println!("{}", "=== Liquidate Troves ===".bright_green().bold());
    let threshold = parse_percent(&threshold)?;
    println!("{} {}", "Threshold:".bright_cyan(), format_ratio(threshold));

    if !auto && owners.is_empty() {
        anyhow::bail!("Pass trove owners to liquidate, or --auto");
    }
    let owners = owners
        .iter()
        .map(|o| Pubkey::from_str(o).with_context(|| format!("Invalid owner address: {}", o)))
        .collect::<Result<Vec<_>>>()?;
    let selection = if auto {
        Selection::Auto { threshold, max }
    } else {
        Selection::Owners(&owners)
    };

    let rpc = client::create_rpc_client(config);
    let ctx = client::load_context(config, &rpc).await?;
    let snapshot = client::load_snapshot(config, &rpc).await?;
    let sorted = sort_positions(snapshot.positions);
    let at_risk = find_liquidatable(&sorted, threshold);

    let targets = selection.select(&sorted)?;
    if !auto {
        for owner in &targets {
            if !at_risk.iter().any(|p| &p.owner == owner) {
                println!("{} {} is above the threshold", "⚠".yellow(), format_pubkey(owner));
            }
        }
    }

    if targets.is_empty() {
        println!("\n{}", "No liquidatable troves found".dimmed());
        return Ok(());
    }

    println!("\n{} {}", "Targets:".bright_yellow(), targets.len());
    for owner in &targets {
        if let Some(p) = sorted.iter().find(|p| &p.owner == owner) {
            println!("  {} {} ({})", "├─".dimmed(), format_pubkey(owner), format_ratio(p.health_ratio));
        }
    }
    if auto && at_risk.len() > targets.len() {
        println!("  {}", format!("... {} more left for the next run", at_risk.len() - targets.len()).dimmed());
    }

    liquidate_batch(config, &rpc, &ctx, selection, targets, dry_run).await?.finish()
}

/// Walk the riskiest troves for `amount`, refusing a partial plan
fn plan_redemption(
    config: &NetworkConfig,
    ctx: &ProtocolContext,
    sorted: &[Position],
    amount: u64,
    max_targets: usize,
) -> Result<(RedemptionPlan, Attempt)> {
    let user = config.pubkey();
    let plan = select_redemption_targets(sorted, amount as u128, max_targets);
    if !plan.is_complete(amount as u128) {
        anyhow::bail!(
            "The {} riskiest trove(s) only cover {} of {}",
            plan.targets.len(),
            format_debt(plan.covered),
            format_debt(amount as u128)
        );
    }

    let setup = vec![client::create_ata_idempotent(&user, &user, &ctx.collateral_mint)];
    let op = Operation::redeem(amount, &config.collateral_denom);
    let prepared = ctx.prepare(&user, &op, Trailing::Targets(&plan.targets))?;
    Ok((plan, Attempt { setup, prepared }))
}

pub async fn redeem(config: &NetworkConfig, amount: String, max_targets: usize, dry_run: bool) -> Result<()> {
    println!("{}", "=== Redeem ===".bright_green().bold());
    let amount = parse_units_u64(&amount, STABLECOIN_DECIMALS).context("Invalid redeem amount")?;
    println!("{} {}", "Amount:".bright_cyan(), format_debt(amount as u128));

    let rpc = client::create_rpc_client(config);
    let ctx = client::load_context(config, &rpc).await?;

    let snapshot = client::load_snapshot(config, &rpc).await?;
    let sorted = sort_positions(snapshot.positions);
    let (plan, first) = plan_redemption(config, &ctx, &sorted, amount, max_targets)?;

    println!("{} {}", "Targets:".bright_cyan(), plan.targets.len());
    for owner in &plan.targets {
        println!("  {} {}", "├─".dimmed(), format_pubkey(owner));
    }
    let estimate = u64::try_from(plan.estimated_collateral).unwrap_or(u64::MAX);
    println!(
        "{} ~{} {} (before fees)",
        "Expected collateral:".bright_cyan(),
        format_collateral(estimate),
        config.collateral_denom
    );

    let rpc = &rpc;
    let ctx = &ctx;
    client::execute_with_retry(config, rpc, first, dry_run, || async move {
        let snapshot = client::load_snapshot(config, rpc).await?;
        let sorted = sort_positions(snapshot.positions);
        let (plan, attempt) = plan_redemption(config, ctx, &sorted, amount, max_targets)?;
        log::info!("redeeming against {} refreshed target(s)", plan.targets.len());
        Ok::<_, anyhow::Error>(attempt)
    })
    .await?
    .finish()
}
