mod common;

use common::TestNet;
use proptest::prelude::*;
use rusty_masternode::BlockPayees;

/// Winner a strict `>` scan over insertion order must pick: among the
/// candidates with the highest final weight, the one inserted first.
fn expected_winner(order: &[u8]) -> u8 {
    let mut inserted: Vec<(u8, u32)> = Vec::new();
    for candidate in order {
        match inserted.iter_mut().find(|(c, _)| c == candidate) {
            Some((_, votes)) => *votes += 1,
            None => inserted.push((*candidate, 1)),
        }
    }
    let max = inserted.iter().map(|(_, votes)| *votes).max().unwrap();
    inserted.iter().find(|(_, votes)| *votes == max).unwrap().0
}

proptest! {
    #[test]
    fn test_winner_follows_insertion_order(order in prop::collection::vec(0u8..4, 1..40)) {
        let mut tally = BlockPayees::new(100);
        for candidate in &order {
            tally.add_vote(&[*candidate], 1, 1);
        }
        let expected = [expected_winner(&order)];
        prop_assert_eq!(tally.resolve_winner(1), Some(&expected[..]));
    }

    #[test]
    fn test_equal_weights_any_permutation(order in Just(vec![0u8, 0, 1, 1, 2, 2]).prop_shuffle()) {
        let mut tally = BlockPayees::new(100);
        for candidate in &order {
            tally.add_vote(&[*candidate], 1, 1);
        }
        // Every candidate ends with two votes: the first one seen wins.
        let first_seen = [order[0]];
        prop_assert_eq!(tally.resolve_winner(1), Some(&first_seen[..]));
    }

    #[test]
    fn test_other_tiers_do_not_interfere(votes in prop::collection::vec((0u8..3, 1u32..3), 1..30)) {
        let mut tally = BlockPayees::new(100);
        let mut tier_one = Vec::new();
        for (candidate, tier) in &votes {
            tally.add_vote(&[*candidate], *tier, 1);
            if *tier == 1 {
                tier_one.push(*candidate);
            }
        }
        if tier_one.is_empty() {
            prop_assert_eq!(tally.resolve_winner(1), None);
        } else {
            let expected = [expected_winner(&tier_one)];
            prop_assert_eq!(tally.resolve_winner(1), Some(&expected[..]));
        }
    }
}

#[test]
fn test_ledger_tie_break_by_arrival() {
    // Two ledgers see the same votes in a different order and end up with
    // different winners while no candidate is confirmed.
    let first = TestNet::new();
    let second = TestNet::new();
    let votes = [first.vote(0, 1_004, 12), first.vote(1, 1_004, 13)];

    for vote in votes.iter() {
        assert_eq!(first.ledger.admit(vote.clone()), Ok(true));
    }
    for vote in votes.iter().rev() {
        assert_eq!(second.ledger.admit(vote.clone()), Ok(true));
    }

    assert_eq!(first.ledger.resolve_payee(1_004, 1), Some(first.script(12)));
    assert_eq!(second.ledger.resolve_payee(1_004, 1), Some(first.script(13)));

    // A third vote settles it the same way on both.
    let decider = first.vote(2, 1_004, 13);
    assert_eq!(first.ledger.admit(decider.clone()), Ok(true));
    assert_eq!(second.ledger.admit(decider), Ok(true));
    assert_eq!(first.ledger.resolve_payee(1_004, 1), second.ledger.resolve_payee(1_004, 1));
}
