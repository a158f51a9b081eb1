//! Trove management: open, collateral adjustments, borrow and repay
//!
//! Every operation here moves the signer's trove in the ICR order, so each
//! attempt fetches a fresh snapshot, resolves neighbor hints for the trove's
//! new ICR and simulates. A stale-hint rejection is retried once from scratch.

use aerospacer_client::constants::{SOL_DECIMALS, STABLECOIN_DECIMALS, WSOL_MINT};
use aerospacer_client::{
    hypothetical_position, parse_units_u64, resolve_neighbors, snapshot, sort_positions, Operation,
    Position, ProtocolContext, Trailing,
};
use anyhow::{Context, Result};
use colored::Colorize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::instruction::Instruction;

use crate::client::{self, format_ratio, Attempt};
use crate::config::NetworkConfig;
use crate::troves::{format_collateral, format_debt, parse_price};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    AddCollateral,
    RemoveCollateral,
    Borrow,
    Repay,
}

impl Adjustment {
    fn title(self) -> &'static str {
        match self {
            Adjustment::AddCollateral => "=== Add Collateral ===",
            Adjustment::RemoveCollateral => "=== Remove Collateral ===",
            Adjustment::Borrow => "=== Borrow ===",
            Adjustment::Repay => "=== Repay ===",
        }
    }

    fn decimals(self) -> u32 {
        match self {
            Adjustment::AddCollateral | Adjustment::RemoveCollateral => SOL_DECIMALS,
            Adjustment::Borrow | Adjustment::Repay => STABLECOIN_DECIMALS,
        }
    }

    fn operation(self, amount: u64, denom: &str) -> Operation {
        match self {
            Adjustment::AddCollateral => Operation::add_collateral(amount, denom),
            Adjustment::RemoveCollateral => Operation::remove_collateral(amount, denom),
            Adjustment::Borrow => Operation::borrow_loan(amount, denom),
            Adjustment::Repay => Operation::repay_loan(amount, denom),
        }
    }

    /// Debt and collateral after applying `amount` to `current`
    pub fn apply(self, current: &Position, amount: u64) -> Result<(u128, u64)> {
        let debt = current.debt_amount;
        let collateral = current.collateral_amount;
        match self {
            Adjustment::AddCollateral => {
                let collateral = collateral.checked_add(amount).context("Collateral overflow")?;
                Ok((debt, collateral))
            }
            Adjustment::RemoveCollateral => {
                let Some(collateral) = collateral.checked_sub(amount) else {
                    anyhow::bail!(
                        "Cannot remove {} collateral, trove holds {}",
                        format_collateral(amount),
                        format_collateral(current.collateral_amount)
                    );
                };
                Ok((debt, collateral))
            }
            Adjustment::Borrow => Ok((debt + amount as u128, collateral)),
            Adjustment::Repay => {
                if amount as u128 > debt {
                    anyhow::bail!(
                        "Cannot repay {}, trove owes {}",
                        format_debt(amount as u128),
                        format_debt(debt)
                    );
                }
                Ok((debt - amount as u128, collateral))
            }
        }
    }
}

pub async fn open_trove(
    config: &NetworkConfig,
    collateral: String,
    loan: String,
    price: String,
    dry_run: bool,
) -> Result<()> {
    println!("{}", "=== Open Trove ===".bright_green().bold());

    let collateral = parse_units_u64(&collateral, SOL_DECIMALS).context("Invalid collateral amount")?;
    let loan = parse_units_u64(&loan, STABLECOIN_DECIMALS).context("Invalid loan amount")?;
    let price = parse_price(&price)?;

    println!("{} {} {}", "Collateral:".bright_cyan(), format_collateral(collateral), config.collateral_denom);
    println!("{} {}", "Loan:".bright_cyan(), format_debt(loan as u128));

    let rpc = client::create_rpc_client(config);
    let ctx = client::load_context(config, &rpc).await?;
    let user = config.pubkey();

    let mut setup = Vec::new();
    if ctx.collateral_mint == WSOL_MINT {
        setup.extend(client::wrap_sol(&user, collateral)?);
    }
    setup.push(client::create_ata_idempotent(&user, &user, &ctx.stablecoin_mint));

    let op = Operation::open_trove(loan, &config.collateral_denom, collateral);
    submit_with_hints(config, &rpc, &ctx, &op, setup, price, dry_run, |current| {
        if current.is_some() {
            anyhow::bail!("Trove already open; use add-collateral or borrow");
        }
        Ok((loan as u128, collateral))
    })
    .await
}

pub async fn adjust(
    config: &NetworkConfig,
    adjustment: Adjustment,
    amount: String,
    price: String,
    dry_run: bool,
) -> Result<()> {
    println!("{}", adjustment.title().bright_green().bold());

    let amount = parse_units_u64(&amount, adjustment.decimals()).context("Invalid amount")?;
    let price = parse_price(&price)?;

    let rpc = client::create_rpc_client(config);
    let ctx = client::load_context(config, &rpc).await?;
    let user = config.pubkey();

    let mut setup = Vec::new();
    match adjustment {
        Adjustment::AddCollateral if ctx.collateral_mint == WSOL_MINT => {
            setup.extend(client::wrap_sol(&user, amount)?);
        }
        Adjustment::RemoveCollateral => {
            setup.push(client::create_ata_idempotent(&user, &user, &ctx.collateral_mint));
        }
        Adjustment::Borrow => {
            setup.push(client::create_ata_idempotent(&user, &user, &ctx.stablecoin_mint));
        }
        _ => {}
    }

    let op = adjustment.operation(amount, &config.collateral_denom);
    submit_with_hints(config, &rpc, &ctx, &op, setup, price, dry_run, |current| {
        let Some(current) = current else {
            anyhow::bail!("No open trove for {}", user);
        };
        adjustment.apply(&current, amount)
    })
    .await
}

/// Resolve hints against a fresh snapshot, simulate and send
///
/// `target` maps the signer's current trove (if any) to its debt and
/// collateral after the operation.
#[allow(clippy::too_many_arguments)]
async fn submit_with_hints<F>(
    config: &NetworkConfig,
    rpc: &RpcClient,
    ctx: &ProtocolContext,
    op: &Operation,
    setup: Vec<Instruction>,
    price: u64,
    dry_run: bool,
    target: F,
) -> Result<()>
where
    F: Fn(Option<Position>) -> Result<(u128, u64)>,
{
    let first = prepare_with_hints(config, rpc, ctx, op, &setup, price, &target).await?;
    client::execute_with_retry(config, rpc, first, dry_run, || {
        prepare_with_hints(config, rpc, ctx, op, &setup, price, &target)
    })
    .await?
    .finish()
}

async fn prepare_with_hints<F>(
    config: &NetworkConfig,
    rpc: &RpcClient,
    ctx: &ProtocolContext,
    op: &Operation,
    setup: &[Instruction],
    price: u64,
    target: &F,
) -> Result<Attempt>
where
    F: Fn(Option<Position>) -> Result<(u128, u64)>,
{
    let user = config.pubkey();
    let program_id = &config.protocol_program_id;
    let denom = &config.collateral_denom;

    let current = snapshot::fetch_position(rpc, program_id, &user, denom)
        .await
        .context("Failed to read current trove")?;
    let (debt, collateral) = target(current)?;
    let position = hypothetical_position(program_id, user, debt, collateral, denom, price);

    let snapshot = client::load_snapshot(config, rpc).await?;
    let sorted = sort_positions(snapshot.positions);
    let proof = resolve_neighbors(&position, &sorted);
    let hints = proof.accounts();

    println!("{} {}", "New ICR:".bright_cyan(), format_ratio(position.health_ratio));
    println!(
        "{} {} of {} ({} hint account(s))",
        "Position:".bright_cyan(),
        proof.index,
        sorted.len(),
        hints.len()
    );

    let prepared = ctx.prepare(&user, op, Trailing::Hints(&hints))?;
    Ok(Attempt { setup: setup.to_vec(), prepared })
}

#[cfg(test)]
mod tests {
    use super::*;
    use aerospacer_client::constants::PROTOCOL_PROGRAM_ID;
    use solana_sdk::pubkey::Pubkey;

    fn trove(debt: u128, collateral: u64) -> Position {
        Position::new(&PROTOCOL_PROGRAM_ID, Pubkey::new_unique(), debt, collateral, "SOL", 0)
    }

    #[test]
    fn test_apply_adjustments() {
        let current = trove(1_000, 500);
        assert_eq!(Adjustment::AddCollateral.apply(&current, 100).unwrap(), (1_000, 600));
        assert_eq!(Adjustment::RemoveCollateral.apply(&current, 500).unwrap(), (1_000, 0));
        assert_eq!(Adjustment::Borrow.apply(&current, 1).unwrap(), (1_001, 500));
        assert_eq!(Adjustment::Repay.apply(&current, 1_000).unwrap(), (0, 500));
    }

    #[test]
    fn test_apply_rejects_overdraw() {
        let current = trove(1_000, 500);
        assert!(Adjustment::RemoveCollateral.apply(&current, 501).is_err());
        assert!(Adjustment::Repay.apply(&current, 1_001).is_err());
    }

    #[test]
    fn test_adjustment_operations() {
        assert_eq!(Adjustment::Borrow.operation(5, "SOL"), Operation::borrow_loan(5, "SOL"));
        assert_eq!(Adjustment::Repay.decimals(), STABLECOIN_DECIMALS);
        assert_eq!(Adjustment::AddCollateral.decimals(), SOL_DECIMALS);
    }
}
