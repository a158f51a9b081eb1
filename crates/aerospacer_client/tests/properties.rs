//! Property tests for the encoder, sorter and neighbor resolver

use aerospacer_client::sort::rank_cmp;
use aerospacer_client::*;
use proptest::prelude::*;
use solana_sdk::pubkey::Pubkey;
use std::cmp::Ordering;

// ============================================================================
// STRATEGIES
// ============================================================================

fn pubkey_strategy() -> impl Strategy<Value = Pubkey> {
    any::<[u8; 32]>().prop_map(Pubkey::new_from_array)
}

/// Positions with cheap fake record addresses; small ranges force ties
fn position_strategy() -> impl Strategy<Value = Position> {
    (pubkey_strategy(), 0u128..5, 1u64..1_000, 0u64..6).prop_map(|(owner, debt, collateral, ratio)| {
        Position {
            owner,
            debt_amount: debt,
            collateral_amount: collateral,
            collateral_denom: "SOL".to_string(),
            health_ratio: ratio * 10_000_000,
            debt_record: owner,
            collateral_record: owner,
            threshold_record: Pubkey::new_from_array(owner.to_bytes().map(|b| !b)),
        }
    })
}

fn denom_strategy() -> impl Strategy<Value = String> {
    prop_oneof![Just("SOL".to_string()), "[A-Za-z]{0,12}"]
}

fn operation_strategy() -> impl Strategy<Value = Operation> {
    prop_oneof![
        (any::<u64>(), denom_strategy(), any::<u64>())
            .prop_map(|(l, d, c)| Operation::open_trove(l, &d, c)),
        (any::<u64>(), denom_strategy()).prop_map(|(a, d)| Operation::add_collateral(a, &d)),
        (any::<u64>(), denom_strategy()).prop_map(|(a, d)| Operation::remove_collateral(a, &d)),
        (any::<u64>(), denom_strategy()).prop_map(|(a, d)| Operation::borrow_loan(a, &d)),
        (
            any::<u64>(),
            denom_strategy(),
            proptest::option::of(pubkey_strategy()),
            proptest::option::of(pubkey_strategy())
        )
            .prop_map(|(amount, collateral_denom, prev_node_id, next_node_id)| {
                Operation::RepayLoan { amount, collateral_denom, prev_node_id, next_node_id }
            }),
        any::<u64>().prop_map(|amount| Operation::Stake { amount }),
        any::<u64>().prop_map(|amount| Operation::Unstake { amount }),
        (prop::collection::vec(pubkey_strategy(), 0..8), denom_strategy())
            .prop_map(|(list, d)| Operation::liquidate_troves(list, &d)),
        (any::<u64>(), denom_strategy()).prop_map(|(a, d)| Operation::redeem(a, &d)),
        denom_strategy().prop_map(|d| Operation::withdraw_liquidation_gains(&d)),
    ]
}

// ============================================================================
// ENCODER
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn encoded_length_matches_layout(op in operation_strategy()) {
        let data = op.encode().unwrap();
        prop_assert_eq!(data.len(), op.expected_len());
        prop_assert_eq!(&data[..8], &op.selector());
    }

    #[test]
    fn encoding_is_deterministic(op in operation_strategy()) {
        prop_assert_eq!(op.encode().unwrap(), op.clone().encode().unwrap());
    }
}

// ============================================================================
// SORTER
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn sort_orders_live_positions(positions in prop::collection::vec(position_strategy(), 0..40)) {
        let live = positions.iter().filter(|p| !p.is_closed()).count();
        let sorted = sort_positions(positions);

        prop_assert_eq!(sorted.len(), live);
        prop_assert!(sorted.iter().all(|p| !p.is_closed()));
        for pair in sorted.windows(2) {
            prop_assert!(rank_cmp(&pair[0], &pair[1]) != Ordering::Greater);
        }
    }

    #[test]
    fn sort_is_idempotent(positions in prop::collection::vec(position_strategy(), 0..40)) {
        let once = sort_positions(positions);
        let twice = sort_positions(once.clone());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn sort_keeps_input_order_on_full_ties(positions in prop::collection::vec(position_strategy(), 0..40)) {
        let indexed: Vec<(usize, Position)> = positions
            .iter()
            .filter(|p| !p.is_closed())
            .cloned()
            .enumerate()
            .collect();
        let sorted = sort_positions(positions);

        for pair in sorted.windows(2) {
            if rank_cmp(&pair[0], &pair[1]) == Ordering::Equal {
                let first = indexed.iter().position(|(_, p)| p == &pair[0]);
                let second = indexed.iter().rposition(|(_, p)| p == &pair[1]);
                prop_assert!(first <= second);
            }
        }
    }

    #[test]
    fn liquidatable_prefix_is_exact(
        positions in prop::collection::vec(position_strategy(), 0..40),
        threshold in 0u64..60_000_000,
    ) {
        let sorted = sort_positions(positions);
        let head = find_liquidatable(&sorted, threshold);

        prop_assert!(head.iter().all(|p| p.health_ratio < threshold));
        prop_assert!(sorted[head.len()..].iter().all(|p| p.health_ratio >= threshold));
    }
}

// ============================================================================
// NEIGHBOR RESOLVER
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn neighbors_bracket_the_target(
        positions in prop::collection::vec(position_strategy(), 0..40),
        target in position_strategy(),
    ) {
        prop_assume!(!target.is_closed());
        let sorted = sort_positions(positions);
        let others: Vec<&Position> = sorted.iter().filter(|p| p.owner != target.owner).collect();
        let proof = resolve_neighbors(&target, &sorted);

        prop_assert!(proof.index <= others.len());
        if let Some(prev) = &proof.prev {
            prop_assert!(rank_cmp(prev, &target) != Ordering::Greater);
            prop_assert_eq!(others[proof.index - 1], prev);
        } else {
            prop_assert_eq!(proof.index, 0);
        }
        if let Some(next) = &proof.next {
            prop_assert_eq!(rank_cmp(next, &target), Ordering::Greater);
            prop_assert_eq!(others[proof.index], next);
        } else {
            prop_assert_eq!(proof.index, others.len());
        }
    }

    #[test]
    fn hint_accounts_are_prev_then_next(
        positions in prop::collection::vec(position_strategy(), 0..40),
        target in position_strategy(),
    ) {
        let sorted = sort_positions(positions);
        let proof = resolve_neighbors(&target, &sorted);

        let expected: Vec<Pubkey> = proof
            .prev
            .iter()
            .chain(proof.next.iter())
            .map(|p| p.threshold_record)
            .collect();
        prop_assert_eq!(proof.accounts(), expected);
    }

    #[test]
    fn resolution_does_not_touch_input(
        positions in prop::collection::vec(position_strategy(), 0..20),
        target in position_strategy(),
    ) {
        let sorted = sort_positions(positions);
        let before = sorted.clone();
        let _ = resolve_neighbors(&target, &sorted);
        prop_assert_eq!(before, sorted);
    }
}
