use rusty_masternode::{LedgerSnapshot, LedgerSummary, PaymentWinner};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HeightReport {
    pub height: u64,
    pub payees: Vec<PaymentWinner>,
    pub voters: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct SnapshotReport {
    pub summary: String,
    pub votes: usize,
    pub blocks: usize,
    pub oldest_block: Option<u64>,
    pub newest_block: Option<u64>,
    pub heights: Vec<HeightReport>,
}

/// Describes a snapshot, listing the candidates of the newest `last` heights (all if `None`).
pub fn build_report(snapshot: &LedgerSnapshot, last: Option<usize>) -> SnapshotReport {
    let summary = LedgerSummary { votes: snapshot.votes.len(), blocks: snapshot.blocks.len() };
    let skip = last.map_or(0, |last| snapshot.blocks.len().saturating_sub(last));

    let heights = snapshot
        .blocks
        .iter()
        .skip(skip)
        .map(|(height, tally)| {
            let mut voters: Vec<String> = snapshot
                .votes
                .values()
                .filter(|vote| vote.block_height == *height)
                .map(|vote| vote.voter.to_string())
                .collect();
            voters.sort();
            HeightReport { height: *height, payees: tally.required_payments(), voters }
        })
        .collect();

    SnapshotReport {
        summary: summary.to_string(),
        votes: summary.votes,
        blocks: summary.blocks,
        oldest_block: snapshot.blocks.keys().next().copied(),
        newest_block: snapshot.blocks.keys().next_back().copied(),
        heights,
    }
}
