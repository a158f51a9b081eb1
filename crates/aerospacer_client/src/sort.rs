//! Deterministic ordering of troves by ICR
//!
//! Order: ascending ICR, ties broken by larger debt first, remaining ties keep
//! their input order. The order is recomputed from each snapshot and never
//! stored.

use solana_sdk::pubkey::Pubkey;
use std::cmp::Ordering;

use crate::types::Position;

/// Rank comparison used by both the sorter and the neighbor resolver
pub fn rank_cmp(a: &Position, b: &Position) -> Ordering {
    a.health_ratio
        .cmp(&b.health_ratio)
        .then_with(|| b.debt_amount.cmp(&a.debt_amount))
}

/// Sort live positions, riskiest first. Closed positions are dropped.
pub fn sort_positions(positions: Vec<Position>) -> Vec<Position> {
    let mut live: Vec<Position> = positions.into_iter().filter(|p| !p.is_closed()).collect();
    // sort_by is stable
    live.sort_by(rank_cmp);
    live
}

/// Leading run of positions whose ICR is strictly below `threshold`
pub fn find_liquidatable(sorted: &[Position], threshold: u64) -> &[Position] {
    let end = sorted.partition_point(|p| p.health_ratio < threshold);
    &sorted[..end]
}

/// Troves a redemption of `amount` would draw from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RedemptionPlan {
    pub targets: Vec<Pubkey>,
    /// Portion of the amount the selected troves can absorb
    pub covered: u128,
    /// Collateral expected back, pro rata to the debt taken from each trove
    pub estimated_collateral: u128,
}

impl RedemptionPlan {
    pub fn is_complete(&self, amount: u128) -> bool {
        self.covered >= amount
    }
}

/// Walk the sorted list from the riskiest end until `amount` is covered
pub fn select_redemption_targets(sorted: &[Position], amount: u128, max_targets: usize) -> RedemptionPlan {
    let mut plan = RedemptionPlan::default();
    let mut remaining = amount;

    for position in sorted {
        if remaining == 0 || plan.targets.len() >= max_targets {
            break;
        }
        if position.is_closed() {
            continue;
        }

        let take = remaining.min(position.debt_amount);
        plan.estimated_collateral += (position.collateral_amount as u128)
            .saturating_mul(take)
            / position.debt_amount;
        plan.covered += take;
        plan.targets.push(position.owner);
        remaining -= take;
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PROTOCOL_PROGRAM_ID;

    fn pos(ratio: u64, debt: u128) -> Position {
        Position::new(&PROTOCOL_PROGRAM_ID, Pubkey::new_unique(), debt, 1_000, "SOL", ratio)
    }

    #[test]
    fn test_ascending_ratio() {
        let a = pos(300, 10);
        let b = pos(100, 10);
        let c = pos(200, 10);
        let sorted = sort_positions(vec![a.clone(), b.clone(), c.clone()]);
        assert_eq!(sorted, vec![b, c, a]);
    }

    #[test]
    fn test_equal_ratio_larger_debt_first() {
        let small = pos(150, 50);
        let big = pos(150, 100);
        let sorted = sort_positions(vec![small.clone(), big.clone()]);
        assert_eq!(sorted[0], big);
        assert_eq!(sorted[1], small);
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let first = pos(150, 100);
        let second = pos(150, 100);
        let sorted = sort_positions(vec![first.clone(), second.clone()]);
        assert_eq!(sorted, vec![first.clone(), second.clone()]);

        let sorted = sort_positions(vec![second.clone(), first.clone()]);
        assert_eq!(sorted, vec![second, first]);
    }

    #[test]
    fn test_closed_positions_excluded() {
        let live = pos(150, 100);
        let closed = pos(10, 0);
        let sorted = sort_positions(vec![closed, live.clone()]);
        assert_eq!(sorted, vec![live]);
    }

    #[test]
    fn test_find_liquidatable_stops_at_first_safe() {
        let sorted = sort_positions(vec![
            pos(100_000_000, 1),
            pos(105_000_000, 1),
            pos(110_000_000, 1),
            pos(200_000_000, 1),
        ]);
        let liq = find_liquidatable(&sorted, 110_000_000);
        assert_eq!(liq.len(), 2);
        assert!(liq.iter().all(|p| p.health_ratio < 110_000_000));
        assert!(find_liquidatable(&[], 110_000_000).is_empty());
    }

    #[test]
    fn test_redemption_walks_riskiest_first() {
        let mut a = pos(120, 100);
        a.collateral_amount = 1_000;
        let mut b = pos(130, 300);
        b.collateral_amount = 600;
        let c = pos(140, 500);
        let sorted = sort_positions(vec![c.clone(), b.clone(), a.clone()]);

        let plan = select_redemption_targets(&sorted, 250, 3);
        assert_eq!(plan.targets, vec![a.owner, b.owner]);
        assert_eq!(plan.covered, 250);
        assert!(plan.is_complete(250));
        // all of a (1000) plus half of b (150/300 * 600)
        assert_eq!(plan.estimated_collateral, 1_000 + 300);
    }

    #[test]
    fn test_redemption_respects_target_cap() {
        let sorted = sort_positions(vec![pos(120, 10), pos(130, 10), pos(140, 10)]);
        let plan = select_redemption_targets(&sorted, 1_000, 2);
        assert_eq!(plan.targets.len(), 2);
        assert_eq!(plan.covered, 20);
        assert!(!plan.is_complete(1_000));
    }
}
