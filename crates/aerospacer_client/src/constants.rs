//! Program ids, PDA seeds and record discriminators
//!
//! Everything in this module is fixed by the deployed protocol program and
//! must match it byte for byte.

use solana_sdk::pubkey::Pubkey;

/// Aerospacer protocol program
pub const PROTOCOL_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("HQbV7SKnWuWPHEci5eejsnJG7qwYuQkGzJHJ6nhLZhxk");
/// Price oracle program invoked by the protocol
pub const ORACLE_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("8Fu4YnUkfmrGQ3PTVoPfsAGjQ6NistGsiKpBEkPhzA2K");
/// Fee distribution program invoked by the protocol
pub const FEES_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("FyBGDrxVAdTnwKeXFrhQR1UyyJhqbfQmZrXWqZuhYkAj");

/// Pyth SOL/USD price feed (devnet)
pub const SOL_PYTH_PRICE_FEED: Pubkey =
    solana_sdk::pubkey!("J83w4HKfqxwcq3BEMMkPFSppX3gqekLyLJBexebFVkix");

pub const FEE_ADDRESS_1: Pubkey =
    solana_sdk::pubkey!("8Lv4UrYHTrzvg9jPVVGNmxWyMrMvrZnCQLWucBzfJyyR");
pub const FEE_ADDRESS_2: Pubkey =
    solana_sdk::pubkey!("GcNwV1nA5bityjNYsWwPLHykpKuuhPzK1AQFBbrPopnX");
pub const STABILITY_POOL_OWNER: Pubkey =
    solana_sdk::pubkey!("5oMxbgjPWkBYRKbsh3yKrrEC5Ut8y3azHKc787YHY9Ar");

/// Wrapped SOL, the default collateral mint
pub const WSOL_MINT: Pubkey = spl_token::native_mint::ID;

pub const TOKEN_PROGRAM_ID: Pubkey = spl_token::ID;
pub const ASSOCIATED_TOKEN_PROGRAM_ID: Pubkey = spl_associated_token_account::ID;

pub const DEFAULT_COLLATERAL_DENOM: &str = "SOL";

pub const SOL_DECIMALS: u32 = 9;
pub const STABLECOIN_DECIMALS: u32 = 18;

/// ICR values stored on chain are percentages scaled by 1e6
pub const ICR_SCALE: u64 = 1_000_000;

// ============================================================================
// PDA seeds
// ============================================================================

pub const SEED_USER_DEBT_AMOUNT: &[u8] = b"user_debt_amount";
pub const SEED_LIQUIDITY_THRESHOLD: &[u8] = b"liquidity_threshold";
pub const SEED_USER_COLLATERAL_AMOUNT: &[u8] = b"user_collateral_amount";
pub const SEED_USER_STAKE_AMOUNT: &[u8] = b"user_stake_amount";
pub const SEED_USER_COLLATERAL_SNAPSHOT: &[u8] = b"user_collateral_snapshot";
pub const SEED_STABILITY_POOL_SNAPSHOT: &[u8] = b"stability_pool_snapshot";
pub const SEED_STATE: &[u8] = b"state";
pub const SEED_PROTOCOL_COLLATERAL_VAULT: &[u8] = b"protocol_collateral_vault";
pub const SEED_TOTAL_COLLATERAL_AMOUNT: &[u8] = b"total_collateral_amount";
pub const SEED_PROTOCOL_STABLECOIN_VAULT: &[u8] = b"protocol_stablecoin_vault";

// ============================================================================
// Account discriminators
// ============================================================================

pub const USER_DEBT_AMOUNT_DISCRIMINATOR: [u8; 8] = [102, 237, 238, 206, 72, 254, 116, 219];
pub const LIQUIDITY_THRESHOLD_DISCRIMINATOR: [u8; 8] = [130, 0, 84, 160, 128, 62, 185, 75];
pub const USER_COLLATERAL_AMOUNT_DISCRIMINATOR: [u8; 8] = [26, 219, 87, 11, 62, 102, 67, 77];

/// UserDebtAmount: 8 discriminator + 32 owner + 8 amount + 8 padding
pub const USER_DEBT_AMOUNT_SIZE: u64 = 56;
