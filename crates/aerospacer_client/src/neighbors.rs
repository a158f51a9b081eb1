//! Neighbor hints for ICR-ordered trove insertion
//!
//! The program never stores the sorted trove list. Instead, an instruction
//! that changes a trove's ICR carries the threshold records of the troves
//! immediately before and after its new position, and the program checks
//! `prev_icr <= icr <= next_icr` against its own current state.
//!
//! Resolution is pure. The snapshot may be stale by the time the hints reach
//! the program; the program rejects stale hints and the caller retries with a
//! fresh snapshot.

use solana_sdk::pubkey::Pubkey;
use std::cmp::Ordering;

use crate::sort::rank_cmp;
use crate::types::Position;

/// ICR of a trove: `collateral * price * 100 / debt`
///
/// `price` must be scaled so the result lands in the same unit as on-chain
/// ratios (see [`ratio_price`]). Zero debt is an infinite ratio and sorts last.
pub fn health_ratio(collateral_amount: u64, price: u64, debt_amount: u128) -> u64 {
    if debt_amount == 0 {
        return u64::MAX;
    }
    let value = (collateral_amount as u128)
        .saturating_mul(price as u128)
        .saturating_mul(100);
    u64::try_from(value / debt_amount).unwrap_or(u64::MAX)
}

/// Price factor for [`health_ratio`] giving micro-percent ICRs
///
/// `usd_price_micros` is the collateral price in USD scaled by 1e6; the
/// decimals are those of the collateral token and of the stablecoin debt.
pub fn ratio_price(usd_price_micros: u64, collateral_decimals: u32, debt_decimals: u32) -> u64 {
    let shift = debt_decimals.saturating_sub(collateral_decimals);
    10u64
        .checked_pow(shift)
        .and_then(|scale| usd_price_micros.checked_mul(scale))
        .unwrap_or(u64::MAX)
}

/// A trove as it would look after an operation, for hint resolution
pub fn hypothetical_position(
    program_id: &Pubkey,
    owner: Pubkey,
    debt_amount: u128,
    collateral_amount: u64,
    collateral_denom: &str,
    price: u64,
) -> Position {
    let ratio = health_ratio(collateral_amount, price, debt_amount);
    Position::new(program_id, owner, debt_amount, collateral_amount, collateral_denom, ratio)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeighborProof {
    pub prev: Option<Position>,
    pub next: Option<Position>,
    /// Insertion index of the target among the other live troves
    pub index: usize,
}

impl NeighborProof {
    /// Threshold records to pass as trailing accounts, `prev` then `next`,
    /// whichever exist
    pub fn accounts(&self) -> Vec<Pubkey> {
        self.prev
            .iter()
            .chain(self.next.iter())
            .map(|p| p.threshold_record)
            .collect()
    }
}

/// Find where `target` belongs in an already sorted snapshot
///
/// Any entry for the target's own owner is ignored, since the operation
/// replaces it. Closed troves are skipped. The input is not modified.
pub fn resolve_neighbors(target: &Position, sorted: &[Position]) -> NeighborProof {
    let mut proof = NeighborProof::default();

    for position in sorted
        .iter()
        .filter(|p| p.owner != target.owner && !p.is_closed())
    {
        if rank_cmp(position, target) == Ordering::Greater {
            proof.next = Some(position.clone());
            break;
        }
        proof.prev = Some(position.clone());
        proof.index += 1;
    }

    log::debug!(
        "trove {} resolves to index {} (prev: {}, next: {})",
        target.owner,
        proof.index,
        proof.prev.is_some(),
        proof.next.is_some()
    );

    proof
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::*;
    use crate::sort::sort_positions;

    fn pos(ratio: u64, debt: u128) -> Position {
        Position::new(&PROTOCOL_PROGRAM_ID, Pubkey::new_unique(), debt, 1_000, "SOL", ratio)
    }

    #[test]
    fn test_empty_list_has_no_neighbors() {
        let target = pos(150, 10);
        let proof = resolve_neighbors(&target, &[]);
        assert_eq!(proof.prev, None);
        assert_eq!(proof.next, None);
        assert_eq!(proof.index, 0);
        assert!(proof.accounts().is_empty());
    }

    #[test]
    fn test_insert_before_single_existing() {
        let existing = pos(200_000_000, 10);
        let target = pos(150_000_000, 10);
        let proof = resolve_neighbors(&target, &[existing.clone()]);

        assert_eq!(proof.prev, None);
        assert_eq!(proof.index, 0);
        assert_eq!(proof.accounts(), vec![existing.threshold_record]);
        assert_eq!(proof.next, Some(existing));
    }

    #[test]
    fn test_insert_at_tail() {
        let a = pos(100, 10);
        let b = pos(120, 10);
        let target = pos(500, 10);
        let proof = resolve_neighbors(&target, &[a, b.clone()]);

        assert_eq!(proof.prev, Some(b.clone()));
        assert_eq!(proof.next, None);
        assert_eq!(proof.index, 2);
        assert_eq!(proof.accounts(), vec![b.threshold_record]);
    }

    #[test]
    fn test_insert_in_middle() {
        let a = pos(100, 10);
        let b = pos(200, 10);
        let c = pos(300, 10);
        let target = pos(250, 10);
        let proof = resolve_neighbors(&target, &[a, b.clone(), c.clone()]);

        assert_eq!(proof.prev.as_ref(), Some(&b));
        assert_eq!(proof.next.as_ref(), Some(&c));
        assert_eq!(proof.accounts(), vec![b.threshold_record, c.threshold_record]);
    }

    #[test]
    fn test_equal_ratio_follows_debt_tie_break() {
        let bigger = pos(150, 100);
        let smaller = pos(150, 20);
        let sorted = sort_positions(vec![smaller.clone(), bigger.clone()]);

        let target = pos(150, 50);
        let proof = resolve_neighbors(&target, &sorted);
        assert_eq!(proof.prev, Some(bigger));
        assert_eq!(proof.next, Some(smaller));
    }

    #[test]
    fn test_own_entry_is_ignored() {
        let a = pos(100, 10);
        let b = pos(300, 10);
        let old_self = pos(200, 10);
        let mut target = pos(400, 5);
        target.owner = old_self.owner;

        let proof = resolve_neighbors(&target, &[a, old_self, b.clone()]);
        assert_eq!(proof.prev, Some(b));
        assert_eq!(proof.next, None);
        assert_eq!(proof.index, 2);
    }

    #[test]
    fn test_zero_debt_sorts_last() {
        assert_eq!(health_ratio(1_000, 100, 0), u64::MAX);
        let a = pos(u64::MAX - 1, 10);
        let target = hypothetical_position(&PROTOCOL_PROGRAM_ID, Pubkey::new_unique(), 0, 1, "SOL", 100);
        // closed troves never appear in snapshots; a zero-debt target goes to the end
        let proof = resolve_neighbors(&target, &[a.clone()]);
        assert_eq!(proof.prev, Some(a));
        assert_eq!(proof.next, None);
    }

    #[test]
    fn test_health_ratio_micro_percent() {
        // 1 SOL at $100 against 50 aUSD is 200%
        let price = ratio_price(100_000_000, SOL_DECIMALS, STABLECOIN_DECIMALS);
        let ratio = health_ratio(1_000_000_000, price, 50 * 10u128.pow(18));
        assert_eq!(ratio, 200 * ICR_SCALE);
    }

    #[test]
    fn test_health_ratio_saturates() {
        assert_eq!(health_ratio(u64::MAX, u64::MAX, 1), u64::MAX);
    }
}
