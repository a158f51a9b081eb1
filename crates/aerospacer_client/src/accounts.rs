//! Account lists for protocol instructions
//!
//! The core accounts of each instruction follow the program's `Accounts`
//! struct field by field. After them come either neighbor hints (read-only)
//! or one writable group per target trove for the batch instructions.

use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::{system_program, sysvar};

use crate::constants::*;
use crate::error::EncodeError;
use crate::instruction::Operation;
use crate::layout::ProtocolState;
use crate::pda::*;

/// Accounts per target trove in liquidate and redeem
pub const TARGET_GROUP_LEN: usize = 4;

/// Externally configured accounts the program checks against its state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolContext {
    pub program_id: Pubkey,
    pub collateral_denom: String,
    pub collateral_mint: Pubkey,
    pub stablecoin_mint: Pubkey,
    pub oracle_program: Pubkey,
    pub oracle_state: Pubkey,
    pub fees_program: Pubkey,
    pub fees_state: Pubkey,
    pub price_feed: Pubkey,
    pub stability_pool_owner: Pubkey,
    pub fee_address_1: Pubkey,
    pub fee_address_2: Pubkey,
}

impl ProtocolContext {
    /// Build a context from the decoded state account and the vault's mint
    pub fn from_state(
        program_id: Pubkey,
        collateral_denom: &str,
        state: &ProtocolState,
        collateral_mint: Pubkey,
    ) -> Self {
        Self {
            program_id,
            collateral_denom: collateral_denom.to_string(),
            collateral_mint,
            stablecoin_mint: state.stablecoin_mint,
            oracle_program: state.oracle_program,
            oracle_state: state.oracle_state,
            fees_program: state.fees_program,
            fees_state: state.fees_state,
            price_feed: SOL_PYTH_PRICE_FEED,
            stability_pool_owner: STABILITY_POOL_OWNER,
            fee_address_1: FEE_ADDRESS_1,
            fee_address_2: FEE_ADDRESS_2,
        }
    }

    fn stablecoin_ata(&self, owner: &Pubkey) -> Pubkey {
        get_associated_token_address(owner, &self.stablecoin_mint)
    }

    fn collateral_ata(&self, owner: &Pubkey) -> Pubkey {
        get_associated_token_address(owner, &self.collateral_mint)
    }

    /// Encode `op` and assemble its accounts for `user`
    pub fn prepare(
        &self,
        user: &Pubkey,
        op: &Operation,
        trailing: Trailing<'_>,
    ) -> Result<PreparedOperation, EncodeError> {
        let data = op.encode()?;
        let denom = op.collateral_denom().unwrap_or(&self.collateral_denom);
        let ctx = Resolved::new(self, user, denom);

        let mut accounts = match op {
            Operation::OpenTrove { .. } => ctx.open_trove(),
            Operation::AddCollateral { .. } | Operation::RemoveCollateral { .. } => ctx.adjust_collateral(),
            Operation::BorrowLoan { .. } => ctx.borrow_loan(),
            Operation::RepayLoan { .. } => ctx.repay_loan(),
            Operation::Stake { .. } => ctx.stake(),
            Operation::Unstake { .. } => ctx.unstake(),
            Operation::LiquidateTroves { .. } => ctx.liquidate_troves(),
            Operation::Redeem { .. } => ctx.redeem(),
            Operation::WithdrawLiquidationGains { .. } => ctx.withdraw_liquidation_gains(),
        };

        match (op, trailing) {
            (_, Trailing::None) => {}
            (op, Trailing::Hints(hints)) if op.takes_neighbor_hints() => {
                accounts.extend(hints.iter().map(|h| AccountMeta::new_readonly(*h, false)));
            }
            (Operation::Redeem { .. }, Trailing::Targets(owners)) => {
                accounts.extend(owners.iter().flat_map(|o| ctx.target_group(o)));
            }
            (op, Trailing::Hints(_)) => {
                return Err(EncodeError::UnexpectedTrailing {
                    operation: op.name(),
                    trailing: "neighbor hints",
                })
            }
            (op, Trailing::Targets(_)) => {
                return Err(EncodeError::UnexpectedTrailing {
                    operation: op.name(),
                    trailing: "target troves",
                })
            }
        }

        // Liquidation targets live in the payload; the groups must follow the same order
        if let Operation::LiquidateTroves { liquidation_list, .. } = op {
            accounts.extend(liquidation_list.iter().flat_map(|o| ctx.target_group(o)));
        }

        log::debug!("{}: {} bytes, {} accounts", op.name(), data.len(), accounts.len());

        Ok(PreparedOperation {
            program_id: self.program_id,
            data,
            accounts,
        })
    }
}

/// Accounts appended after the core list
#[derive(Debug, Clone, Copy, Default)]
pub enum Trailing<'a> {
    #[default]
    None,
    /// Threshold records of the neighbor troves, `prev` then `next`
    Hints(&'a [Pubkey]),
    /// Owners of the troves a redemption draws from
    Targets(&'a [Pubkey]),
}

/// Payload plus accounts, ready to simulate or sign
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedOperation {
    pub program_id: Pubkey,
    pub data: Vec<u8>,
    pub accounts: Vec<AccountMeta>,
}

impl PreparedOperation {
    pub fn into_instruction(self) -> Instruction {
        Instruction {
            program_id: self.program_id,
            accounts: self.accounts,
            data: self.data,
        }
    }
}

/// Addresses derived once per call
struct Resolved<'a> {
    ctx: &'a ProtocolContext,
    user: Pubkey,
    denom: &'a str,
    protocol: ProtocolAddresses,
    trove: TroveAddresses,
}

impl<'a> Resolved<'a> {
    fn new(ctx: &'a ProtocolContext, user: &Pubkey, denom: &'a str) -> Self {
        Self {
            ctx,
            user: *user,
            denom,
            protocol: ProtocolAddresses::derive(&ctx.program_id, denom),
            trove: TroveAddresses::derive(&ctx.program_id, user, denom),
        }
    }

    fn target_group(&self, owner: &Pubkey) -> [AccountMeta; TARGET_GROUP_LEN] {
        let records = TroveAddresses::derive(&self.ctx.program_id, owner, self.denom);
        [
            AccountMeta::new(records.debt, false),
            AccountMeta::new(records.collateral, false),
            AccountMeta::new(records.threshold, false),
            AccountMeta::new(self.ctx.collateral_ata(owner), false),
        ]
    }

    fn fee_accounts(&self) -> [AccountMeta; 5] {
        let ctx = self.ctx;
        [
            AccountMeta::new_readonly(ctx.fees_program, false), // fees_program
            AccountMeta::new(ctx.fees_state, false),            // fees_state
            AccountMeta::new(ctx.stablecoin_ata(&ctx.stability_pool_owner), false), // stability_pool_token_account
            AccountMeta::new(ctx.stablecoin_ata(&ctx.fee_address_1), false), // fee_address_1_token_account
            AccountMeta::new(ctx.stablecoin_ata(&ctx.fee_address_2), false), // fee_address_2_token_account
        ]
    }

    fn open_trove(&self) -> Vec<AccountMeta> {
        let ctx = self.ctx;
        let mut accounts = vec![
            AccountMeta::new(self.user, true),                                // user
            AccountMeta::new(self.trove.debt, false),                         // user_debt_amount
            AccountMeta::new(self.trove.threshold, false),                    // liquidity_threshold
            AccountMeta::new(self.trove.collateral, false),                   // user_collateral_amount
            AccountMeta::new(ctx.collateral_ata(&self.user), false),          // user_collateral_account
            AccountMeta::new_readonly(ctx.collateral_mint, false),            // collateral_mint
            AccountMeta::new(self.protocol.collateral_vault, false),          // protocol_collateral_vault
            AccountMeta::new(self.protocol.total_collateral, false),          // total_collateral_amount
            AccountMeta::new(self.protocol.state, false),                     // state
            AccountMeta::new(ctx.stablecoin_ata(&self.user), false),          // user_stablecoin_account
            AccountMeta::new(self.protocol.stablecoin_vault, false),          // protocol_stablecoin_vault
            AccountMeta::new(ctx.stablecoin_mint, false),                     // stable_coin_mint
            AccountMeta::new_readonly(ctx.oracle_program, false),             // oracle_program
            AccountMeta::new(ctx.oracle_state, false),                        // oracle_state
            AccountMeta::new_readonly(ctx.price_feed, false),                 // pyth_price_account
            AccountMeta::new_readonly(sysvar::clock::id(), false),            // clock
        ];
        accounts.extend(self.fee_accounts());
        accounts.push(AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false));
        accounts.push(AccountMeta::new_readonly(system_program::id(), false));
        accounts
    }

    fn adjust_collateral(&self) -> Vec<AccountMeta> {
        let ctx = self.ctx;
        vec![
            AccountMeta::new(self.user, true),                       // user
            AccountMeta::new(self.trove.debt, false),                // user_debt_amount
            AccountMeta::new(self.trove.collateral, false),          // user_collateral_amount
            AccountMeta::new(self.trove.threshold, false),           // liquidity_threshold
            AccountMeta::new(self.protocol.state, false),            // state
            AccountMeta::new(ctx.collateral_ata(&self.user), false), // user_collateral_account
            AccountMeta::new_readonly(ctx.collateral_mint, false),   // collateral_mint
            AccountMeta::new(self.protocol.collateral_vault, false), // protocol_collateral_vault
            AccountMeta::new(self.protocol.total_collateral, false), // total_collateral_amount
            AccountMeta::new_readonly(ctx.oracle_program, false),    // oracle_program
            AccountMeta::new(ctx.oracle_state, false),               // oracle_state
            AccountMeta::new_readonly(ctx.price_feed, false),        // pyth_price_account
            AccountMeta::new_readonly(sysvar::clock::id(), false),   // clock
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),      // token_program
            AccountMeta::new_readonly(system_program::id(), false),  // system_program
        ]
    }

    fn borrow_loan(&self) -> Vec<AccountMeta> {
        let ctx = self.ctx;
        let mut accounts = vec![
            AccountMeta::new(self.user, true),                       // user
            AccountMeta::new(self.trove.debt, false),                // user_debt_amount
            AccountMeta::new(self.trove.threshold, false),           // liquidity_threshold
            AccountMeta::new(self.protocol.state, false),            // state
            AccountMeta::new(ctx.stablecoin_ata(&self.user), false), // user_stablecoin_account
            AccountMeta::new(ctx.stablecoin_mint, false),            // stable_coin_mint
            AccountMeta::new(self.protocol.stablecoin_vault, false), // protocol_stablecoin_vault
            AccountMeta::new(self.trove.collateral, false),          // user_collateral_amount
            AccountMeta::new(ctx.collateral_ata(&self.user), false), // user_collateral_account
            AccountMeta::new_readonly(ctx.collateral_mint, false),   // collateral_mint
            AccountMeta::new(self.protocol.collateral_vault, false), // protocol_collateral_vault
            AccountMeta::new(self.protocol.total_collateral, false), // total_collateral_amount
            // borrow_loan declares the oracle program mutable
            AccountMeta::new(ctx.oracle_program, false),             // oracle_program
            AccountMeta::new(ctx.oracle_state, false),               // oracle_state
            AccountMeta::new_readonly(ctx.price_feed, false),        // pyth_price_account
            AccountMeta::new_readonly(sysvar::clock::id(), false),   // clock
        ];
        accounts.extend(self.fee_accounts());
        accounts.push(AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false));
        accounts.push(AccountMeta::new_readonly(system_program::id(), false));
        accounts
    }

    fn repay_loan(&self) -> Vec<AccountMeta> {
        let ctx = self.ctx;
        vec![
            AccountMeta::new(self.user, true),                       // user
            AccountMeta::new(self.trove.debt, false),                // user_debt_amount
            AccountMeta::new(self.trove.collateral, false),          // user_collateral_amount
            AccountMeta::new(self.trove.threshold, false),           // liquidity_threshold
            AccountMeta::new(self.protocol.state, false),            // state
            AccountMeta::new(ctx.stablecoin_ata(&self.user), false), // user_stablecoin_account
            AccountMeta::new(ctx.collateral_ata(&self.user), false), // user_collateral_account
            AccountMeta::new_readonly(ctx.collateral_mint, false),   // collateral_mint
            AccountMeta::new(self.protocol.collateral_vault, false), // protocol_collateral_vault
            AccountMeta::new(ctx.stablecoin_mint, false),            // stable_coin_mint
            AccountMeta::new(self.protocol.total_collateral, false), // total_collateral_amount
            AccountMeta::new_readonly(ctx.oracle_program, false),    // oracle_program
            AccountMeta::new(ctx.oracle_state, false),               // oracle_state
            AccountMeta::new_readonly(ctx.price_feed, false),        // pyth_price_account
            AccountMeta::new_readonly(sysvar::clock::id(), false),   // clock
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),      // token_program
            AccountMeta::new_readonly(system_program::id(), false),  // system_program
        ]
    }

    fn stake(&self) -> Vec<AccountMeta> {
        let mut accounts = self.unstake();
        accounts.push(AccountMeta::new_readonly(system_program::id(), false));
        accounts
    }

    fn unstake(&self) -> Vec<AccountMeta> {
        let ctx = self.ctx;
        vec![
            AccountMeta::new(self.user, true), // user
            AccountMeta::new(derive_user_stake_amount(&self.user, &ctx.program_id), false), // user_stake_amount
            AccountMeta::new(self.protocol.state, false),                // state
            AccountMeta::new(ctx.stablecoin_ata(&self.user), false),     // user_stablecoin_account
            AccountMeta::new(self.protocol.stablecoin_vault, false),     // protocol_stablecoin_vault
            AccountMeta::new_readonly(ctx.stablecoin_mint, false),       // stable_coin_mint
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),          // token_program
        ]
    }

    fn liquidate_troves(&self) -> Vec<AccountMeta> {
        let ctx = self.ctx;
        vec![
            AccountMeta::new(self.user, true),                       // liquidator
            AccountMeta::new(self.protocol.state, false),            // state
            AccountMeta::new(ctx.stablecoin_mint, false),            // stable_coin_mint
            AccountMeta::new(self.protocol.stablecoin_vault, false), // protocol_stablecoin_vault
            AccountMeta::new(self.protocol.collateral_vault, false), // protocol_collateral_vault
            AccountMeta::new(self.protocol.total_collateral, false), // total_collateral_amount
            AccountMeta::new(ctx.oracle_program, false),             // oracle_program
            AccountMeta::new(ctx.oracle_state, false),               // oracle_state
            AccountMeta::new_readonly(ctx.price_feed, false),        // pyth_price_account
            AccountMeta::new_readonly(sysvar::clock::id(), false),   // clock
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),      // token_program
            AccountMeta::new_readonly(system_program::id(), false),  // system_program
        ]
    }

    fn redeem(&self) -> Vec<AccountMeta> {
        let ctx = self.ctx;
        let mut accounts = vec![
            AccountMeta::new(self.user, true),                       // user
            AccountMeta::new(self.protocol.state, false),            // state
            AccountMeta::new(self.trove.debt, false),                // user_debt_amount
            AccountMeta::new(self.trove.threshold, false),           // liquidity_threshold
            AccountMeta::new(ctx.stablecoin_ata(&self.user), false), // user_stablecoin_account
            AccountMeta::new(self.trove.collateral, false),          // user_collateral_amount
            AccountMeta::new(ctx.collateral_ata(&self.user), false), // user_collateral_account
            AccountMeta::new(self.protocol.stablecoin_vault, false), // protocol_stablecoin_vault
            AccountMeta::new(self.protocol.collateral_vault, false), // protocol_collateral_vault
            AccountMeta::new(ctx.stablecoin_mint, false),            // stable_coin_mint
            AccountMeta::new(self.protocol.total_collateral, false), // total_collateral_amount
            AccountMeta::new(ctx.oracle_program, false),             // oracle_program
            AccountMeta::new(ctx.oracle_state, false),               // oracle_state
        ];
        accounts.extend(self.fee_accounts());
        accounts.push(AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false));
        accounts
    }

    fn withdraw_liquidation_gains(&self) -> Vec<AccountMeta> {
        let ctx = self.ctx;
        let program_id = &ctx.program_id;
        vec![
            AccountMeta::new(self.user, true),                                        // user
            AccountMeta::new(derive_user_stake_amount(&self.user, program_id), false), // user_stake_amount
            AccountMeta::new(derive_user_collateral_snapshot(&self.user, self.denom, program_id), false), // user_collateral_snapshot
            AccountMeta::new(derive_stability_pool_snapshot(self.denom, program_id), false), // stability_pool_snapshot
            AccountMeta::new(self.protocol.state, false),                             // state
            AccountMeta::new(ctx.collateral_ata(&self.user), false),                  // user_collateral_account
            AccountMeta::new(self.protocol.collateral_vault, false),                  // protocol_collateral_vault
            AccountMeta::new(self.protocol.total_collateral, false),                  // total_collateral_amount
            AccountMeta::new_readonly(TOKEN_PROGRAM_ID, false),                       // token_program
            AccountMeta::new_readonly(system_program::id(), false),                   // system_program
        ]
    }
}
