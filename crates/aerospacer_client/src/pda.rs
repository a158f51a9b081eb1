//! Derived account addresses used by the protocol program
//!
//! Every helper matches a `seeds = [...]` constraint in the program; a single
//! byte of drift here produces an address the program will reject.

use solana_sdk::pubkey::Pubkey;
pub use spl_associated_token_account::get_associated_token_address;

use crate::constants::*;

pub fn derive_user_debt_amount(owner: &Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[SEED_USER_DEBT_AMOUNT, owner.as_ref()], program_id).0
}

pub fn derive_liquidity_threshold(owner: &Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[SEED_LIQUIDITY_THRESHOLD, owner.as_ref()], program_id).0
}

pub fn derive_user_collateral_amount(owner: &Pubkey, denom: &str, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[SEED_USER_COLLATERAL_AMOUNT, owner.as_ref(), denom.as_bytes()],
        program_id,
    )
    .0
}

pub fn derive_user_stake_amount(owner: &Pubkey, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[SEED_USER_STAKE_AMOUNT, owner.as_ref()], program_id).0
}

pub fn derive_user_collateral_snapshot(owner: &Pubkey, denom: &str, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[SEED_USER_COLLATERAL_SNAPSHOT, owner.as_ref(), denom.as_bytes()],
        program_id,
    )
    .0
}

pub fn derive_stability_pool_snapshot(denom: &str, program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[SEED_STABILITY_POOL_SNAPSHOT, denom.as_bytes()], program_id).0
}

/// The three per-owner records that make up one trove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TroveAddresses {
    pub debt: Pubkey,
    pub collateral: Pubkey,
    pub threshold: Pubkey,
}

impl TroveAddresses {
    pub fn derive(program_id: &Pubkey, owner: &Pubkey, denom: &str) -> Self {
        Self {
            debt: derive_user_debt_amount(owner, program_id),
            collateral: derive_user_collateral_amount(owner, denom, program_id),
            threshold: derive_liquidity_threshold(owner, program_id),
        }
    }
}

/// Protocol-level records for one collateral denom
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolAddresses {
    pub state: Pubkey,
    pub collateral_vault: Pubkey,
    pub total_collateral: Pubkey,
    pub stablecoin_vault: Pubkey,
}

impl ProtocolAddresses {
    pub fn derive(program_id: &Pubkey, denom: &str) -> Self {
        Self {
            state: Pubkey::find_program_address(&[SEED_STATE], program_id).0,
            collateral_vault: Pubkey::find_program_address(
                &[SEED_PROTOCOL_COLLATERAL_VAULT, denom.as_bytes()],
                program_id,
            )
            .0,
            total_collateral: Pubkey::find_program_address(
                &[SEED_TOTAL_COLLATERAL_AMOUNT, denom.as_bytes()],
                program_id,
            )
            .0,
            stablecoin_vault: Pubkey::find_program_address(
                &[SEED_PROTOCOL_STABLECOIN_VAULT],
                program_id,
            )
            .0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trove_addresses_are_distinct_and_stable() {
        let owner = Pubkey::new_unique();
        let a = TroveAddresses::derive(&PROTOCOL_PROGRAM_ID, &owner, "SOL");
        let b = TroveAddresses::derive(&PROTOCOL_PROGRAM_ID, &owner, "SOL");

        assert_eq!(a, b);
        assert_ne!(a.debt, a.collateral);
        assert_ne!(a.debt, a.threshold);
        assert_ne!(a.collateral, a.threshold);
    }

    #[test]
    fn test_collateral_record_depends_on_denom() {
        let owner = Pubkey::new_unique();
        let sol = TroveAddresses::derive(&PROTOCOL_PROGRAM_ID, &owner, "SOL");
        let other = TroveAddresses::derive(&PROTOCOL_PROGRAM_ID, &owner, "mSOL");

        assert_ne!(sol.collateral, other.collateral);
        // Debt and threshold records are per owner, not per denom
        assert_eq!(sol.debt, other.debt);
        assert_eq!(sol.threshold, other.threshold);
    }

    #[test]
    fn test_stablecoin_vault_shared_across_denoms() {
        let sol = ProtocolAddresses::derive(&PROTOCOL_PROGRAM_ID, "SOL");
        let other = ProtocolAddresses::derive(&PROTOCOL_PROGRAM_ID, "mSOL");

        assert_eq!(sol.state, other.state);
        assert_eq!(sol.stablecoin_vault, other.stablecoin_vault);
        assert_ne!(sol.collateral_vault, other.collateral_vault);
        assert_ne!(sol.total_collateral, other.total_collateral);
    }

    #[test]
    fn test_ata_uses_token_program_seeds() {
        let owner = Pubkey::new_unique();
        let ata = get_associated_token_address(&owner, &WSOL_MINT);
        let (expected, _) = Pubkey::find_program_address(
            &[owner.as_ref(), TOKEN_PROGRAM_ID.as_ref(), WSOL_MINT.as_ref()],
            &ASSOCIATED_TOKEN_PROGRAM_ID,
        );
        assert_eq!(ata, expected);
        assert_ne!(ata, get_associated_token_address(&Pubkey::new_unique(), &WSOL_MINT));
    }
}
