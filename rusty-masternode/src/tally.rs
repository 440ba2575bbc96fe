use log::{debug, warn};
use rusty_shared_types::{script_to_string, Tier, Transaction};
use serde::{Deserialize, Serialize};

use crate::context::{PaymentWinner, RewardSchedule};

/// A candidate payee at one height, with the weight voted for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayeeVotes {
    pub script_pubkey: Vec<u8>,
    pub tier: Tier,
    pub votes: u32,
}

/// Inputs for checking a reward transaction against a tally.
pub struct PaymentRules<'a> {
    pub tier_count: u32,
    pub block_reward: u64,
    pub drift_count: usize,
    pub signatures_required: u32,
    pub schedule: &'a dyn RewardSchedule,
}

/// Vote weight per candidate for one block height. Candidates stay in
/// insertion order; that order decides ties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPayees {
    pub block_height: u64,
    pub payees: Vec<PayeeVotes>,
}

impl BlockPayees {
    pub fn new(block_height: u64) -> Self {
        BlockPayees { block_height, payees: Vec::new() }
    }

    pub fn add_vote(&mut self, script_pubkey: &[u8], tier: Tier, weight: u32) {
        if let Some(existing) = self
            .payees
            .iter_mut()
            .find(|p| p.tier == tier && p.script_pubkey == script_pubkey)
        {
            existing.votes += weight;
            return;
        }

        self.payees.push(PayeeVotes { script_pubkey: script_pubkey.to_vec(), tier, votes: weight });
    }

    /// Candidate with the strictly greatest weight in `tier`. On a tie the
    /// earlier-inserted candidate keeps the lead.
    pub fn winner(&self, tier: Tier) -> Option<&PayeeVotes> {
        let mut best: Option<&PayeeVotes> = None;
        for candidate in self.payees.iter().filter(|p| p.tier == tier) {
            if best.map_or(true, |b| candidate.votes > b.votes) {
                best = Some(candidate);
            }
        }
        best
    }

    pub fn resolve_winner(&self, tier: Tier) -> Option<&[u8]> {
        self.winner(tier).map(|p| p.script_pubkey.as_slice())
    }

    pub fn max_votes(&self, tier: Tier) -> u32 {
        self.payees.iter().filter(|p| p.tier == tier).map(|p| p.votes).max().unwrap_or(0)
    }

    pub fn has_payee_with_votes(&self, script_pubkey: &[u8], required: u32) -> bool {
        self.payees
            .iter()
            .any(|p| p.votes >= required && p.script_pubkey == script_pubkey)
    }

    pub fn total_votes(&self) -> u64 {
        self.payees.iter().map(|p| p.votes as u64).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.payees.is_empty()
    }

    /// A tier only constrains the transaction once one of its candidates has
    /// `signatures_required` votes; then some such candidate must be paid at
    /// least the scheduled amount.
    pub fn is_transaction_valid(&self, tx: &Transaction, rules: &PaymentRules<'_>) -> bool {
        for tier in 1..=rules.tier_count {
            if self.max_votes(tier) < rules.signatures_required {
                debug!(target: "mnpayments", "height {} tier {}: no payee confirmed yet", self.block_height, tier);
                continue;
            }

            let required_payment = rules.schedule.masternode_payment(
                self.block_height,
                tier,
                rules.block_reward,
                rules.drift_count,
            );

            let mut possible_payees = Vec::new();
            let mut paid = false;
            for candidate in self.payees.iter().filter(|p| p.tier == tier && p.votes >= rules.signatures_required) {
                let found = tx
                    .get_outputs()
                    .iter()
                    .any(|out| out.script_pubkey == candidate.script_pubkey && out.value >= required_payment);
                if found {
                    paid = true;
                    break;
                }
                possible_payees.push(script_to_string(&candidate.script_pubkey));
            }

            if !paid {
                warn!(
                    target: "mnpayments",
                    "Missing required payment for tier {} at height {}: {} of {}",
                    tier,
                    self.block_height,
                    possible_payees.join(","),
                    required_payment
                );
                return false;
            }
        }

        true
    }

    pub fn required_payments(&self) -> Vec<PaymentWinner> {
        self.payees
            .iter()
            .map(|p| PaymentWinner {
                address: script_to_string(&p.script_pubkey),
                votes: p.votes,
                tier: p.tier,
            })
            .collect()
    }
}
