//! Read-only views of the ICR-sorted trove list

use aerospacer_client::constants::{SOL_DECIMALS, STABLECOIN_DECIMALS};
use aerospacer_client::{
    find_liquidatable, format_units, hypothetical_position, parse_units, parse_units_u64, ratio_price,
    resolve_neighbors, snapshot, sort_positions, Position,
};
use anyhow::{Context, Result};
use colored::Colorize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::client::{self, format_pubkey, format_ratio};
use crate::config::NetworkConfig;

/// Percent string ("110", "112.5") to micro-percent
pub fn parse_percent(value: &str) -> Result<u64> {
    parse_units_u64(value, 6).with_context(|| format!("Invalid percentage: {}", value))
}

/// USD price string to the factor `health_ratio` expects
pub fn parse_price(value: &str) -> Result<u64> {
    let micros = parse_units_u64(value, 6).with_context(|| format!("Invalid price: {}", value))?;
    if micros == 0 {
        anyhow::bail!("Price must be positive");
    }
    Ok(ratio_price(micros, SOL_DECIMALS, STABLECOIN_DECIMALS))
}

pub fn parse_owner(config: &NetworkConfig, owner: Option<String>) -> Result<Pubkey> {
    match owner {
        Some(owner) => Pubkey::from_str(&owner).with_context(|| format!("Invalid owner address: {}", owner)),
        None => Ok(config.pubkey()),
    }
}

pub fn format_collateral(raw: u64) -> String {
    format_units(raw as u128, SOL_DECIMALS, 4)
}

pub fn format_debt(raw: u128) -> String {
    format_units(raw, STABLECOIN_DECIMALS, 4)
}

fn print_trove_row(rank: usize, position: &Position) {
    println!(
        "  {:>4}  {}  {:>10}  {:>14}  {:>18}",
        rank,
        format_pubkey(&position.owner),
        format_ratio(position.health_ratio),
        format_collateral(position.collateral_amount),
        format_debt(position.debt_amount),
    );
}

fn print_header() {
    println!(
        "  {:>4}  {:<19}  {:>10}  {:>14}  {:>18}",
        "#".dimmed(),
        "Owner".dimmed(),
        "ICR".dimmed(),
        "Collateral".dimmed(),
        "Debt".dimmed()
    );
}

pub async fn list_troves(config: &NetworkConfig, limit: Option<usize>) -> Result<()> {
    println!("{}", "=== Troves ===".bright_green().bold());
    println!("{} {}", "Denom:".bright_cyan(), config.collateral_denom);

    let rpc = client::create_rpc_client(config);
    let snapshot = client::load_snapshot(config, &rpc).await?;
    let sorted = sort_positions(snapshot.positions);

    println!("{} {}\n", "Live troves:".bright_cyan(), sorted.len());
    if sorted.is_empty() {
        println!("{}", "No troves found".dimmed());
        return Ok(());
    }

    print_header();
    let shown = limit.unwrap_or(sorted.len());
    for (i, position) in sorted.iter().take(shown).enumerate() {
        print_trove_row(i, position);
    }
    if shown < sorted.len() {
        println!("  {}", format!("... {} more", sorted.len() - shown).dimmed());
    }

    Ok(())
}

pub async fn show_trove(config: &NetworkConfig, owner: Option<String>) -> Result<()> {
    println!("{}", "=== Trove ===".bright_green().bold());
    let owner = parse_owner(config, owner)?;
    println!("{} {}", "Owner:".bright_cyan(), owner);

    let rpc = client::create_rpc_client(config);
    let position = snapshot::fetch_position(&rpc, &config.protocol_program_id, &owner, &config.collateral_denom)
        .await
        .context("Failed to read trove")?;

    let Some(position) = position else {
        println!("\n{}", "No open trove".yellow());
        return Ok(());
    };

    println!("{} {} {}", "Collateral:".bright_cyan(), format_collateral(position.collateral_amount), position.collateral_denom);
    println!("{} {}", "Debt:".bright_cyan(), format_debt(position.debt_amount));
    println!("{} {}", "ICR:".bright_cyan(), format_ratio(position.health_ratio));

    println!("\n{}", "Records:".bright_yellow());
    println!("  {} {}", "Debt:".bright_cyan(), position.debt_record);
    println!("  {} {}", "Collateral:".bright_cyan(), position.collateral_record);
    println!("  {} {}", "Threshold:".bright_cyan(), position.threshold_record);

    Ok(())
}

pub async fn show_neighbors(
    config: &NetworkConfig,
    owner: Option<String>,
    collateral: String,
    debt: String,
    price: String,
) -> Result<()> {
    println!("{}", "=== Neighbor Hints ===".bright_green().bold());

    let owner = parse_owner(config, owner)?;
    let collateral = parse_units_u64(&collateral, SOL_DECIMALS).context("Invalid collateral amount")?;
    let debt = parse_units(&debt, STABLECOIN_DECIMALS).context("Invalid debt amount")?;
    let price = parse_price(&price)?;

    let target = hypothetical_position(
        &config.protocol_program_id,
        owner,
        debt,
        collateral,
        &config.collateral_denom,
        price,
    );
    println!("{} {}", "Owner:".bright_cyan(), owner);
    println!("{} {}", "ICR:".bright_cyan(), format_ratio(target.health_ratio));

    let rpc = client::create_rpc_client(config);
    let snapshot = client::load_snapshot(config, &rpc).await?;
    let sorted = sort_positions(snapshot.positions);
    let proof = resolve_neighbors(&target, &sorted);

    println!("{} {}", "Insert index:".bright_cyan(), proof.index);
    match &proof.prev {
        Some(prev) => println!("{} {} ({})", "Prev:".bright_cyan(), format_pubkey(&prev.owner), format_ratio(prev.health_ratio)),
        None => println!("{} {}", "Prev:".bright_cyan(), "none (head of list)".dimmed()),
    }
    match &proof.next {
        Some(next) => println!("{} {} ({})", "Next:".bright_cyan(), format_pubkey(&next.owner), format_ratio(next.health_ratio)),
        None => println!("{} {}", "Next:".bright_cyan(), "none (tail of list)".dimmed()),
    }

    let hints = proof.accounts();
    println!("\n{} {}", "Hint accounts:".bright_yellow(), hints.len());
    for hint in hints {
        println!("  {} {}", "└─".dimmed(), hint);
    }

    Ok(())
}

pub async fn list_liquidatable(config: &NetworkConfig, threshold: String) -> Result<()> {
    println!("{}", "=== Liquidatable Troves ===".bright_green().bold());
    let threshold = parse_percent(&threshold)?;
    println!("{} {}", "Threshold:".bright_cyan(), format_ratio(threshold));

    let rpc = client::create_rpc_client(config);
    let snapshot = client::load_snapshot(config, &rpc).await?;
    let sorted = sort_positions(snapshot.positions);
    let at_risk = find_liquidatable(&sorted, threshold);

    if at_risk.is_empty() {
        println!("\n{}", "No liquidatable troves found".dimmed());
        return Ok(());
    }

    println!();
    print_header();
    for (i, position) in at_risk.iter().enumerate() {
        print_trove_row(i, position);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_percent() {
        assert_eq!(parse_percent("110").unwrap(), 110_000_000);
        assert_eq!(parse_percent("112.5").unwrap(), 112_500_000);
        assert!(parse_percent("abc").is_err());
    }

    #[test]
    fn test_parse_price_scales_to_micro_percent() {
        let price = parse_price("100").unwrap();
        let ratio = aerospacer_client::health_ratio(1_000_000_000, price, 50 * 10u128.pow(18));
        assert_eq!(ratio, 200_000_000);
        assert!(parse_price("0").is_err());
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(format_collateral(1_500_000_000), "1.5");
        assert_eq!(format_debt(25 * 10u128.pow(17)), "2.5");
    }
}
