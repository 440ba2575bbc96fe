//! Read-only views of the payment ledger for RPC and operator tooling.

use rusty_shared_types::UNKNOWN_TIER;
use serde::Serialize;

use crate::context::PaymentWinner;
use crate::policy::BlockPayeePolicy;

pub const UNKNOWN_WINNER: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeightWinners {
    pub height: u64,
    pub winners: Vec<PaymentWinner>,
}

/// Scheduled payments from `last_n` blocks behind the tip up to the end of the
/// future vote window. Heights nobody voted on carry a single "Unknown" entry.
/// `filter` keeps only heights whose payees contain it. Returns `None` while
/// the chain tip is unavailable.
pub fn winners(policy: &BlockPayeePolicy, last_n: u64, filter: Option<&str>) -> Option<Vec<HeightWinners>> {
    let ledger = policy.ledger();
    let tip = ledger.context().chain.try_tip_height()?;
    let first = tip.saturating_sub(last_n);
    let end = tip + ledger.config().future_vote_window;

    let mut result = Vec::new();
    for height in first..end {
        let mut winners = policy.required_payments(height);
        if winners.is_empty() {
            winners.push(PaymentWinner {
                address: UNKNOWN_WINNER.to_string(),
                votes: 0,
                tier: UNKNOWN_TIER,
            });
        }

        if let Some(filter) = filter {
            if !winners.iter().any(|w| w.address.contains(filter)) {
                continue;
            }
        }
        result.push(HeightWinners { height, winners });
    }
    Some(result)
}

/// Current winner of every tier at the next block.
pub fn next_winners(policy: &BlockPayeePolicy) -> Option<Vec<(u32, Vec<u8>)>> {
    let ledger = policy.ledger();
    let ctx = ledger.context();
    let height = ctx.chain.try_tip_height()? + 1;
    Some(
        (1..=ctx.schedule.tier_count(height))
            .filter_map(|tier| ledger.resolve_payee(height, tier).map(|script| (tier, script)))
            .collect(),
    )
}
