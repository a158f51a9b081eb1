//! Protocol instruction payloads
//!
//! One variant per program instruction. Field order inside each variant is the
//! order the program deserializes in; it is positional, not keyed.

use solana_sdk::pubkey::Pubkey;

use crate::codec::*;
use crate::error::EncodeError;

pub const OPEN_TROVE_SELECTOR: [u8; 8] = [0xcb, 0xe8, 0x40, 0x6d, 0x23, 0x53, 0x4a, 0x6d];
pub const ADD_COLLATERAL_SELECTOR: [u8; 8] = [0x7f, 0x52, 0x79, 0x2a, 0xa1, 0xb0, 0xf9, 0xce];
pub const REMOVE_COLLATERAL_SELECTOR: [u8; 8] = [0x56, 0xde, 0x82, 0x56, 0x5c, 0x14, 0x48, 0x41];
pub const BORROW_LOAN_SELECTOR: [u8; 8] = [0x66, 0x68, 0xa7, 0x7f, 0xd1, 0xf5, 0xfb, 0xc2];
pub const REPAY_LOAN_SELECTOR: [u8; 8] = [0xe0, 0x5d, 0x90, 0x4d, 0x3d, 0x11, 0x89, 0x36];
pub const STAKE_SELECTOR: [u8; 8] = [0xce, 0xb0, 0xca, 0x12, 0xc8, 0xd1, 0xb3, 0x6c];
pub const UNSTAKE_SELECTOR: [u8; 8] = [0x5a, 0x5f, 0x6b, 0x2a, 0xcd, 0x7c, 0x32, 0xe1];
pub const LIQUIDATE_TROVES_SELECTOR: [u8; 8] = [0x97, 0xcc, 0xe6, 0x00, 0x7f, 0xcb, 0x39, 0x1c];
pub const REDEEM_SELECTOR: [u8; 8] = [0xb8, 0x0c, 0x56, 0x95, 0x46, 0xc4, 0x61, 0xe1];
pub const WITHDRAW_LIQUIDATION_GAINS_SELECTOR: [u8; 8] =
    [0x1d, 0x74, 0x2d, 0xb6, 0x8f, 0x07, 0x3b, 0xda];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    OpenTrove {
        loan_amount: u64,
        collateral_denom: String,
        collateral_amount: u64,
    },
    AddCollateral {
        amount: u64,
        collateral_denom: String,
        prev_node_id: Option<Pubkey>,
        next_node_id: Option<Pubkey>,
    },
    RemoveCollateral {
        amount: u64,
        collateral_denom: String,
        prev_node_id: Option<Pubkey>,
        next_node_id: Option<Pubkey>,
    },
    BorrowLoan {
        loan_amount: u64,
        collateral_denom: String,
        prev_node_id: Option<Pubkey>,
        next_node_id: Option<Pubkey>,
    },
    RepayLoan {
        amount: u64,
        collateral_denom: String,
        prev_node_id: Option<Pubkey>,
        next_node_id: Option<Pubkey>,
    },
    Stake {
        amount: u64,
    },
    Unstake {
        amount: u64,
    },
    LiquidateTroves {
        liquidation_list: Vec<Pubkey>,
        collateral_denom: String,
    },
    Redeem {
        amount: u64,
        collateral_denom: String,
    },
    WithdrawLiquidationGains {
        collateral_denom: String,
    },
}

impl Operation {
    // The program receives neighbor hints through trailing accounts, so the
    // node id options are always sent as None.

    pub fn open_trove(loan_amount: u64, collateral_denom: &str, collateral_amount: u64) -> Self {
        Self::OpenTrove {
            loan_amount,
            collateral_denom: collateral_denom.to_string(),
            collateral_amount,
        }
    }

    pub fn add_collateral(amount: u64, collateral_denom: &str) -> Self {
        Self::AddCollateral {
            amount,
            collateral_denom: collateral_denom.to_string(),
            prev_node_id: None,
            next_node_id: None,
        }
    }

    pub fn remove_collateral(amount: u64, collateral_denom: &str) -> Self {
        Self::RemoveCollateral {
            amount,
            collateral_denom: collateral_denom.to_string(),
            prev_node_id: None,
            next_node_id: None,
        }
    }

    pub fn borrow_loan(loan_amount: u64, collateral_denom: &str) -> Self {
        Self::BorrowLoan {
            loan_amount,
            collateral_denom: collateral_denom.to_string(),
            prev_node_id: None,
            next_node_id: None,
        }
    }

    pub fn repay_loan(amount: u64, collateral_denom: &str) -> Self {
        Self::RepayLoan {
            amount,
            collateral_denom: collateral_denom.to_string(),
            prev_node_id: None,
            next_node_id: None,
        }
    }

    pub fn liquidate_troves(liquidation_list: Vec<Pubkey>, collateral_denom: &str) -> Self {
        Self::LiquidateTroves {
            liquidation_list,
            collateral_denom: collateral_denom.to_string(),
        }
    }

    pub fn redeem(amount: u64, collateral_denom: &str) -> Self {
        Self::Redeem {
            amount,
            collateral_denom: collateral_denom.to_string(),
        }
    }

    pub fn withdraw_liquidation_gains(collateral_denom: &str) -> Self {
        Self::WithdrawLiquidationGains {
            collateral_denom: collateral_denom.to_string(),
        }
    }

    /// Instruction name as the program knows it
    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenTrove { .. } => "open_trove",
            Self::AddCollateral { .. } => "add_collateral",
            Self::RemoveCollateral { .. } => "remove_collateral",
            Self::BorrowLoan { .. } => "borrow_loan",
            Self::RepayLoan { .. } => "repay_loan",
            Self::Stake { .. } => "stake",
            Self::Unstake { .. } => "unstake",
            Self::LiquidateTroves { .. } => "liquidate_troves",
            Self::Redeem { .. } => "redeem",
            Self::WithdrawLiquidationGains { .. } => "withdraw_liquidation_gains",
        }
    }

    pub fn selector(&self) -> [u8; 8] {
        match self {
            Self::OpenTrove { .. } => OPEN_TROVE_SELECTOR,
            Self::AddCollateral { .. } => ADD_COLLATERAL_SELECTOR,
            Self::RemoveCollateral { .. } => REMOVE_COLLATERAL_SELECTOR,
            Self::BorrowLoan { .. } => BORROW_LOAN_SELECTOR,
            Self::RepayLoan { .. } => REPAY_LOAN_SELECTOR,
            Self::Stake { .. } => STAKE_SELECTOR,
            Self::Unstake { .. } => UNSTAKE_SELECTOR,
            Self::LiquidateTroves { .. } => LIQUIDATE_TROVES_SELECTOR,
            Self::Redeem { .. } => REDEEM_SELECTOR,
            Self::WithdrawLiquidationGains { .. } => WITHDRAW_LIQUIDATION_GAINS_SELECTOR,
        }
    }

    /// Collateral denom the operation touches, if any
    pub fn collateral_denom(&self) -> Option<&str> {
        match self {
            Self::OpenTrove { collateral_denom, .. }
            | Self::AddCollateral { collateral_denom, .. }
            | Self::RemoveCollateral { collateral_denom, .. }
            | Self::BorrowLoan { collateral_denom, .. }
            | Self::RepayLoan { collateral_denom, .. }
            | Self::LiquidateTroves { collateral_denom, .. }
            | Self::Redeem { collateral_denom, .. }
            | Self::WithdrawLiquidationGains { collateral_denom } => Some(collateral_denom),
            Self::Stake { .. } | Self::Unstake { .. } => None,
        }
    }

    /// Whether the program checks the trove's ICR position against neighbor hints
    pub fn takes_neighbor_hints(&self) -> bool {
        matches!(
            self,
            Self::OpenTrove { .. }
                | Self::AddCollateral { .. }
                | Self::RemoveCollateral { .. }
                | Self::BorrowLoan { .. }
                | Self::RepayLoan { .. }
        )
    }

    /// Payload length derived from the field layout alone
    pub fn expected_len(&self) -> usize {
        let body = match self {
            Self::OpenTrove { collateral_denom, .. } => {
                U64_LEN + U32_LEN + collateral_denom.len() + U64_LEN
            }
            Self::AddCollateral { collateral_denom, prev_node_id, next_node_id, .. }
            | Self::RemoveCollateral { collateral_denom, prev_node_id, next_node_id, .. }
            | Self::BorrowLoan { collateral_denom, prev_node_id, next_node_id, .. }
            | Self::RepayLoan { collateral_denom, prev_node_id, next_node_id, .. } => {
                U64_LEN
                    + U32_LEN
                    + collateral_denom.len()
                    + option_pubkey_len(prev_node_id.as_ref())
                    + option_pubkey_len(next_node_id.as_ref())
            }
            Self::Stake { .. } | Self::Unstake { .. } => U64_LEN,
            Self::LiquidateTroves { liquidation_list, collateral_denom } => {
                U32_LEN + liquidation_list.len() * PUBKEY_LEN + U32_LEN + collateral_denom.len()
            }
            Self::Redeem { collateral_denom, .. } => U64_LEN + U32_LEN + collateral_denom.len(),
            Self::WithdrawLiquidationGains { collateral_denom } => {
                U32_LEN + collateral_denom.len()
            }
        };
        SELECTOR_LEN + body
    }

    /// Serialize into the program's instruction data
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let expected = self.expected_len();
        let mut w = LengthCheckedWriter::new(self.name(), self.selector(), expected);

        match self {
            Self::OpenTrove { loan_amount, collateral_denom, collateral_amount } => {
                w.put_u64(*loan_amount);
                w.put_string(collateral_denom)?;
                w.put_u64(*collateral_amount);
            }
            Self::AddCollateral { amount, collateral_denom, prev_node_id, next_node_id }
            | Self::RemoveCollateral { amount, collateral_denom, prev_node_id, next_node_id }
            | Self::BorrowLoan { loan_amount: amount, collateral_denom, prev_node_id, next_node_id }
            | Self::RepayLoan { amount, collateral_denom, prev_node_id, next_node_id } => {
                w.put_u64(*amount);
                w.put_string(collateral_denom)?;
                w.put_option_pubkey(prev_node_id.as_ref());
                w.put_option_pubkey(next_node_id.as_ref());
            }
            Self::Stake { amount } | Self::Unstake { amount } => {
                w.put_u64(*amount);
            }
            Self::LiquidateTroves { liquidation_list, collateral_denom } => {
                w.put_pubkey_list(liquidation_list)?;
                w.put_string(collateral_denom)?;
            }
            Self::Redeem { amount, collateral_denom } => {
                w.put_u64(*amount);
                w.put_string(collateral_denom)?;
            }
            Self::WithdrawLiquidationGains { collateral_denom } => {
                w.put_string(collateral_denom)?;
            }
        }

        let data = w.finish(expected)?;
        log::debug!("encoded {} payload: {} bytes", self.name(), data.len());
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stake_layout() {
        let amount = 1_000_000_000_000_000u64;
        let data = Operation::Stake { amount }.encode().unwrap();

        assert_eq!(data.len(), 16);
        assert_eq!(&data[..8], &STAKE_SELECTOR);
        assert_eq!(&data[8..], &amount.to_le_bytes());
    }

    #[test]
    fn test_liquidate_three_targets_sol() {
        let list = vec![Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()];
        let op = Operation::liquidate_troves(list.clone(), "SOL");
        let data = op.encode().unwrap();

        assert_eq!(data.len(), 8 + 4 + 96 + 4 + 3);
        assert_eq!(data.len(), 115);
        assert_eq!(&data[8..12], &3u32.to_le_bytes());
        for (i, key) in list.iter().enumerate() {
            let start = 12 + i * 32;
            assert_eq!(&data[start..start + 32], key.as_ref());
        }
        assert_eq!(&data[108..112], &3u32.to_le_bytes());
        assert_eq!(&data[112..], b"SOL");
    }

    #[test]
    fn test_liquidate_empty_list_and_empty_denom() {
        let data = Operation::liquidate_troves(vec![], "").encode().unwrap();
        assert_eq!(data.len(), 16);
        assert_eq!(&data[8..], &[0u8; 8]);
    }

    #[test]
    fn test_modify_ops_send_absent_node_ids() {
        for op in [
            Operation::add_collateral(5, "SOL"),
            Operation::remove_collateral(5, "SOL"),
            Operation::borrow_loan(5, "SOL"),
            Operation::repay_loan(5, "SOL"),
        ] {
            let data = op.encode().unwrap();
            assert_eq!(data.len(), 8 + 8 + 4 + 3 + 1 + 1);
            assert_eq!(&data[data.len() - 2..], &[0, 0]);
            assert!(op.takes_neighbor_hints());
        }
    }

    #[test]
    fn test_present_node_id_grows_payload() {
        let node = Pubkey::new_unique();
        let op = Operation::AddCollateral {
            amount: 1,
            collateral_denom: "SOL".into(),
            prev_node_id: Some(node),
            next_node_id: None,
        };
        let data = op.encode().unwrap();
        assert_eq!(data.len(), op.expected_len());
        assert_eq!(data[23], 1);
        assert_eq!(&data[24..56], node.as_ref());
        assert_eq!(data[56], 0);
    }

    #[test]
    fn test_selectors_are_unique() {
        let ops = [
            Operation::open_trove(1, "SOL", 1),
            Operation::add_collateral(1, "SOL"),
            Operation::remove_collateral(1, "SOL"),
            Operation::borrow_loan(1, "SOL"),
            Operation::repay_loan(1, "SOL"),
            Operation::Stake { amount: 1 },
            Operation::Unstake { amount: 1 },
            Operation::liquidate_troves(vec![], "SOL"),
            Operation::redeem(1, "SOL"),
            Operation::withdraw_liquidation_gains("SOL"),
        ];
        for (i, a) in ops.iter().enumerate() {
            for b in ops.iter().skip(i + 1) {
                assert_ne!(a.selector(), b.selector(), "{} vs {}", a.name(), b.name());
            }
        }
    }
}
