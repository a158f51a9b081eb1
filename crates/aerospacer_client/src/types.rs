//! Position model shared by the indexer, sorter and neighbor resolver

use solana_sdk::pubkey::Pubkey;

use crate::pda::TroveAddresses;

/// One live trove for one collateral denom, as read from the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub owner: Pubkey,
    /// Debt in stablecoin base units; zero means the trove is closed
    pub debt_amount: u128,
    pub collateral_amount: u64,
    pub collateral_denom: String,
    /// ICR in micro-percent (150% = 150_000_000)
    pub health_ratio: u64,
    pub debt_record: Pubkey,
    pub collateral_record: Pubkey,
    pub threshold_record: Pubkey,
}

impl Position {
    /// Build a position whose record addresses are derived from the owner
    pub fn new(
        program_id: &Pubkey,
        owner: Pubkey,
        debt_amount: u128,
        collateral_amount: u64,
        collateral_denom: &str,
        health_ratio: u64,
    ) -> Self {
        let records = TroveAddresses::derive(program_id, &owner, collateral_denom);
        Self {
            owner,
            debt_amount,
            collateral_amount,
            collateral_denom: collateral_denom.to_string(),
            health_ratio,
            debt_record: records.debt,
            collateral_record: records.collateral,
            threshold_record: records.threshold,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.debt_amount == 0
    }
}
