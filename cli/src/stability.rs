//! Stability pool: stake, unstake and liquidation gains

use aerospacer_client::constants::STABLECOIN_DECIMALS;
use aerospacer_client::pda::{derive_user_stake_amount, get_associated_token_address};
use aerospacer_client::{parse_units_u64, Operation, Trailing};
use anyhow::{Context, Result};
use colored::Colorize;

use crate::client;
use crate::config::NetworkConfig;
use crate::troves::format_debt;

pub async fn stake(config: &NetworkConfig, amount: String, dry_run: bool) -> Result<()> {
    println!("{}", "=== Stake ===".bright_green().bold());
    let amount = parse_units_u64(&amount, STABLECOIN_DECIMALS).context("Invalid stake amount")?;
    println!("{} {}", "Amount:".bright_cyan(), format_debt(amount as u128));

    let rpc = client::create_rpc_client(config);
    let ctx = client::load_context(config, &rpc).await?;
    let user = config.pubkey();

    println!(
        "{} {}",
        "Stake record:".bright_cyan(),
        derive_user_stake_amount(&user, &ctx.program_id)
    );

    let prepared = ctx.prepare(&user, &Operation::Stake { amount }, Trailing::None)?;
    client::execute(config, &rpc, Vec::new(), prepared, dry_run).await?.finish()
}

pub async fn unstake(config: &NetworkConfig, amount: String, dry_run: bool) -> Result<()> {
    println!("{}", "=== Unstake ===".bright_green().bold());
    let amount = parse_units_u64(&amount, STABLECOIN_DECIMALS).context("Invalid unstake amount")?;
    println!("{} {}", "Amount:".bright_cyan(), format_debt(amount as u128));

    let rpc = client::create_rpc_client(config);
    let ctx = client::load_context(config, &rpc).await?;
    let user = config.pubkey();

    let setup = vec![client::create_ata_idempotent(&user, &user, &ctx.stablecoin_mint)];
    let prepared = ctx.prepare(&user, &Operation::Unstake { amount }, Trailing::None)?;
    client::execute(config, &rpc, setup, prepared, dry_run).await?.finish()
}

pub async fn withdraw_gains(config: &NetworkConfig, dry_run: bool) -> Result<()> {
    println!("{}", "=== Withdraw Liquidation Gains ===".bright_green().bold());
    println!("{} {}", "Denom:".bright_cyan(), config.collateral_denom);

    let rpc = client::create_rpc_client(config);
    let ctx = client::load_context(config, &rpc).await?;
    let user = config.pubkey();

    println!(
        "{} {}",
        "Destination:".bright_cyan(),
        get_associated_token_address(&user, &ctx.collateral_mint)
    );

    let setup = vec![client::create_ata_idempotent(&user, &user, &ctx.collateral_mint)];
    let op = Operation::withdraw_liquidation_gains(&config.collateral_denom);
    let prepared = ctx.prepare(&user, &op, Trailing::None)?;
    client::execute(config, &rpc, setup, prepared, dry_run).await?.finish()
}
