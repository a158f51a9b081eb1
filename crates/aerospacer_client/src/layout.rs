//! Decoding of protocol records read from the ledger
//!
//! Layouts (all little-endian, after an 8-byte discriminator):
//! - UserDebtAmount: owner[32] | amount u64
//! - LiquidityThreshold: owner[32] | ratio u64 (micro-percent)
//! - UserCollateralAmount: owner[32] | denom (u32 len + bytes) | amount u64
//! - StateAccount: admin | oracle program | oracle state | fees program |
//!   fees state (5 x 32) | min ratio u64 | protocol fee u8 | stablecoin mint |
//!   code id u64 | total debt u64 | total stake u64 | p factor u128 | epoch u64

use solana_sdk::pubkey::Pubkey;
use spl_token::solana_program::program_pack::Pack;
use spl_token::state::Account as TokenAccount;

use crate::constants::*;
use crate::error::DecodeError;

const DISC_LEN: usize = 8;
const OWNER_END: usize = DISC_LEN + 32;

/// Minimal cursor over record bytes
struct Reader<'a> {
    record: &'static str,
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(record: &'static str, data: &'a [u8]) -> Self {
        Self { record, data, offset: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.offset + n;
        if end > self.data.len() {
            return Err(DecodeError::TooShort {
                record: self.record,
                len: self.data.len(),
                min: end,
            });
        }
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn discriminator(&mut self, expected: &[u8; 8]) -> Result<(), DecodeError> {
        if self.take(DISC_LEN)? != expected {
            return Err(DecodeError::Discriminator { record: self.record });
        }
        Ok(())
    }

    fn skip_discriminator(&mut self) -> Result<(), DecodeError> {
        self.take(DISC_LEN).map(|_| ())
    }

    fn pubkey(&mut self) -> Result<Pubkey, DecodeError> {
        let mut key = [0u8; 32];
        key.copy_from_slice(self.take(32)?);
        Ok(Pubkey::new_from_array(key))
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(b))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        let mut b = [0u8; 8];
        b.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(b))
    }

    fn u128(&mut self) -> Result<u128, DecodeError> {
        let mut b = [0u8; 16];
        b.copy_from_slice(self.take(16)?);
        Ok(u128::from_le_bytes(b))
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| DecodeError::InvalidDenom { record: self.record })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserDebtAmount {
    pub owner: Pubkey,
    pub amount: u64,
}

impl UserDebtAmount {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new("UserDebtAmount", data);
        r.discriminator(&USER_DEBT_AMOUNT_DISCRIMINATOR)?;
        Ok(Self { owner: r.pubkey()?, amount: r.u64()? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiquidityThreshold {
    pub owner: Pubkey,
    pub ratio: u64,
}

impl LiquidityThreshold {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new("LiquidityThreshold", data);
        r.discriminator(&LIQUIDITY_THRESHOLD_DISCRIMINATOR)?;
        Ok(Self { owner: r.pubkey()?, ratio: r.u64()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCollateralAmount {
    pub owner: Pubkey,
    pub denom: String,
    pub amount: u64,
}

impl UserCollateralAmount {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new("UserCollateralAmount", data);
        r.discriminator(&USER_COLLATERAL_AMOUNT_DISCRIMINATOR)?;
        Ok(Self {
            owner: r.pubkey()?,
            denom: r.string()?,
            amount: r.u64()?,
        })
    }
}

/// Protocol-wide configuration stored in the `state` PDA
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolState {
    pub admin: Pubkey,
    pub oracle_program: Pubkey,
    pub oracle_state: Pubkey,
    pub fees_program: Pubkey,
    pub fees_state: Pubkey,
    pub minimum_collateral_ratio: u64,
    pub protocol_fee: u8,
    pub stablecoin_mint: Pubkey,
    pub stablecoin_code_id: u64,
    pub total_debt_amount: u64,
    pub total_stake_amount: u64,
    pub p_factor: u128,
    pub epoch: u64,
}

impl ProtocolState {
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new("StateAccount", data);
        r.skip_discriminator()?;
        Ok(Self {
            admin: r.pubkey()?,
            oracle_program: r.pubkey()?,
            oracle_state: r.pubkey()?,
            fees_program: r.pubkey()?,
            fees_state: r.pubkey()?,
            minimum_collateral_ratio: r.u64()?,
            protocol_fee: r.u8()?,
            stablecoin_mint: r.pubkey()?,
            stablecoin_code_id: r.u64()?,
            total_debt_amount: r.u64()?,
            total_stake_amount: r.u64()?,
            p_factor: r.u128()?,
            epoch: r.u64()?,
        })
    }
}

/// Mint of an initialized SPL token account
pub fn token_account_mint(data: &[u8]) -> Result<Pubkey, DecodeError> {
    TokenAccount::unpack(data)
        .map(|account| account.mint)
        .map_err(|e| DecodeError::TokenAccount(e.to_string()))
}

/// Owner field shared by the per-trove records
pub fn record_owner(data: &[u8]) -> Option<Pubkey> {
    data.get(DISC_LEN..OWNER_END)
        .and_then(|b| <[u8; 32]>::try_from(b).ok())
        .map(Pubkey::new_from_array)
}

#[cfg(test)]
pub(crate) mod test_data {
    //! Builders for record bytes, shared by unit tests
    use super::*;

    pub fn debt_record(owner: &Pubkey, amount: u64) -> Vec<u8> {
        let mut data = USER_DEBT_AMOUNT_DISCRIMINATOR.to_vec();
        data.extend_from_slice(owner.as_ref());
        data.extend_from_slice(&amount.to_le_bytes());
        data.extend_from_slice(&[0u8; 8]);
        data
    }

    pub fn threshold_record(owner: &Pubkey, ratio: u64) -> Vec<u8> {
        let mut data = LIQUIDITY_THRESHOLD_DISCRIMINATOR.to_vec();
        data.extend_from_slice(owner.as_ref());
        data.extend_from_slice(&ratio.to_le_bytes());
        data
    }

    pub fn collateral_record(owner: &Pubkey, denom: &str, amount: u64) -> Vec<u8> {
        let mut data = USER_COLLATERAL_AMOUNT_DISCRIMINATOR.to_vec();
        data.extend_from_slice(owner.as_ref());
        data.extend_from_slice(&(denom.len() as u32).to_le_bytes());
        data.extend_from_slice(denom.as_bytes());
        data.extend_from_slice(&amount.to_le_bytes());
        data
    }
}

#[cfg(test)]
mod tests {
    use super::test_data::*;
    use super::*;

    #[test]
    fn test_debt_record_roundtrip_with_padding() {
        let owner = Pubkey::new_unique();
        let data = debt_record(&owner, 777);
        assert_eq!(data.len() as u64, USER_DEBT_AMOUNT_SIZE);

        let decoded = UserDebtAmount::decode(&data).unwrap();
        assert_eq!(decoded.owner, owner);
        assert_eq!(decoded.amount, 777);
    }

    #[test]
    fn test_wrong_discriminator_rejected() {
        let owner = Pubkey::new_unique();
        let data = threshold_record(&owner, 1);
        assert_eq!(
            UserDebtAmount::decode(&data),
            Err(DecodeError::Discriminator { record: "UserDebtAmount" })
        );
    }

    #[test]
    fn test_short_threshold_rejected() {
        let owner = Pubkey::new_unique();
        let data = threshold_record(&owner, 150_000_000);
        let err = LiquidityThreshold::decode(&data[..44]).unwrap_err();
        assert_eq!(err, DecodeError::TooShort { record: "LiquidityThreshold", len: 44, min: 48 });
    }

    #[test]
    fn test_collateral_record_with_denom() {
        let owner = Pubkey::new_unique();
        let data = collateral_record(&owner, "SOL", 5_000_000_000);
        let decoded = UserCollateralAmount::decode(&data).unwrap();

        assert_eq!(decoded.owner, owner);
        assert_eq!(decoded.denom, "SOL");
        assert_eq!(decoded.amount, 5_000_000_000);
        assert_eq!(record_owner(&data), Some(owner));
    }

    #[test]
    fn test_collateral_denom_length_overrun() {
        let owner = Pubkey::new_unique();
        let mut data = collateral_record(&owner, "SOL", 1);
        // Claim a denom longer than the buffer
        data[40..44].copy_from_slice(&200u32.to_le_bytes());
        assert!(matches!(
            UserCollateralAmount::decode(&data),
            Err(DecodeError::TooShort { .. })
        ));
    }

    #[test]
    fn test_protocol_state_layout() {
        let keys: Vec<Pubkey> = (0..6).map(|_| Pubkey::new_unique()).collect();
        let mut data = vec![0u8; 8];
        for key in &keys[..5] {
            data.extend_from_slice(key.as_ref());
        }
        data.extend_from_slice(&115_000_000u64.to_le_bytes());
        data.push(5);
        data.extend_from_slice(keys[5].as_ref());
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(&2u64.to_le_bytes());
        data.extend_from_slice(&3u64.to_le_bytes());
        data.extend_from_slice(&(1u128 << 64).to_le_bytes());
        data.extend_from_slice(&9u64.to_le_bytes());

        let state = ProtocolState::decode(&data).unwrap();
        assert_eq!(state.oracle_program, keys[1]);
        assert_eq!(state.fees_state, keys[4]);
        assert_eq!(state.minimum_collateral_ratio, 115_000_000);
        assert_eq!(state.protocol_fee, 5);
        assert_eq!(state.stablecoin_mint, keys[5]);
        assert_eq!(state.total_stake_amount, 3);
        assert_eq!(state.p_factor, 1u128 << 64);
        assert_eq!(state.epoch, 9);
    }

    #[test]
    fn test_vault_mint_from_token_account() {
        let mint = Pubkey::new_unique();
        let vault = TokenAccount {
            mint,
            owner: Pubkey::new_unique(),
            amount: 42,
            state: spl_token::state::AccountState::Initialized,
            ..Default::default()
        };
        let mut data = vec![0u8; TokenAccount::LEN];
        TokenAccount::pack(vault, &mut data).unwrap();

        assert_eq!(token_account_mint(&data), Ok(mint));
    }

    #[test]
    fn test_uninitialized_token_account_rejected() {
        let data = vec![0u8; TokenAccount::LEN];
        assert!(matches!(token_account_mint(&data), Err(DecodeError::TokenAccount(_))));
        assert!(matches!(token_account_mint(&data[..64]), Err(DecodeError::TokenAccount(_))));
    }
}
