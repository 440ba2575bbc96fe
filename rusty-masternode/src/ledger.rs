//! The payment ledger: every admitted vote and the per-height tallies built from them.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use rusty_shared_types::p2p::SyncItem;
use rusty_shared_types::{script_to_string, Hash, MasternodeID, Tier, Transaction};
use serde::{Deserialize, Serialize};

use crate::config::PaymentsConfig;
use crate::context::{MasternodeInfo, PaymentContext, PaymentWinner, PeerHandle, Spork};
use crate::error::PaymentError;
use crate::messages::PaymentMessage;
use crate::tally::{BlockPayees, PaymentRules};
use crate::vote::{ActiveMasternode, Payee, PaymentVote};

/// Owned copy of the ledger contents, as persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub votes: BTreeMap<Hash, PaymentVote>,
    pub blocks: BTreeMap<u64, BlockPayees>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    pub votes: usize,
    pub blocks: usize,
}

impl fmt::Display for LedgerSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Votes: {}, Blocks: {}", self.votes, self.blocks)
    }
}

#[derive(Default)]
struct VoteStore {
    by_identity: BTreeMap<Hash, PaymentVote>,
    /// (voter, payee tier, height) of every admitted vote
    cast: HashSet<(MasternodeID, Tier, u64)>,
}

/// Shared store of payment votes and tallies.
///
/// Locks are always taken votes first, then blocks. Chain tip reads happen
/// before either is taken and never block.
pub struct PaymentLedger {
    config: PaymentsConfig,
    ctx: PaymentContext,
    votes: RwLock<VoteStore>,
    blocks: RwLock<BTreeMap<u64, BlockPayees>>,
    last_block_height: Mutex<u64>,
}

impl PaymentLedger {
    pub fn new(config: PaymentsConfig, ctx: PaymentContext) -> Self {
        PaymentLedger {
            config,
            ctx,
            votes: RwLock::new(VoteStore::default()),
            blocks: RwLock::new(BTreeMap::new()),
            last_block_height: Mutex::new(0),
        }
    }

    pub fn config(&self) -> &PaymentsConfig {
        &self.config
    }

    pub fn context(&self) -> &PaymentContext {
        &self.ctx
    }

    /// Minimum protocol a masternode needs to vote or be paid.
    pub fn min_payments_protocol(&self) -> u32 {
        if self.ctx.sporks.is_active(Spork::PayUpdatedNodes) {
            self.config.network.active_protocol_version
        } else {
            self.config.network.min_protocol_before_enforcement
        }
    }

    /// Admits a vote. `Ok(false)` means the same vote was already known.
    pub fn admit(&self, vote: PaymentVote) -> Result<bool, PaymentError> {
        match self.try_admit(vote) {
            Ok(_) => Ok(true),
            Err(PaymentError::DuplicateVote(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Runs the full admission pipeline, reporting duplicates as an error.
    pub fn try_admit(&self, vote: PaymentVote) -> Result<Hash, PaymentError> {
        let identity = vote.identity();
        if self.votes.read().by_identity.contains_key(&identity) {
            return Err(PaymentError::DuplicateVote(identity));
        }

        let height = vote.block_height;
        let voter = self
            .ctx
            .registry
            .find(&vote.voter, height)
            .ok_or_else(|| PaymentError::UnknownVoter(vote.voter.clone()))?;

        let script = self
            .ctx
            .payee_script(&vote.payee, height)
            .ok_or_else(|| PaymentError::UnknownPayee(vote.payee.clone()))?;
        let tier = self
            .ctx
            .payee_tier(&vote.payee, &script, height)
            .ok_or_else(|| PaymentError::UnknownPayee(vote.payee.clone()))?;

        let tip = self.ctx.chain.try_tip_height().ok_or(PaymentError::ChainBusy)?;
        self.check_window(height, tier, tip)?;
        self.check_eligibility(&voter, height)?;

        let key = (vote.voter.clone(), tier, height);
        if self.votes.read().cast.contains(&key) {
            return Err(PaymentError::ReplayOrDoubleVote { voter: vote.voter.clone(), tier, height });
        }

        if !vote.verify_signature(&voter.operator_public_key) {
            return Err(PaymentError::BadSignature(vote.voter.clone()));
        }

        let reference = height.saturating_sub(self.config.rank_reference_offset);
        if self.ctx.chain.block_hash(reference).is_none() {
            return Err(PaymentError::UnknownBlock(reference));
        }

        debug!(target: "mnpayments", "admitting winning masternode vote {} ({})", vote, hex::encode(identity));

        let mut votes = self.votes.write();
        let mut blocks = self.blocks.write();
        if votes.by_identity.contains_key(&identity) {
            return Err(PaymentError::DuplicateVote(identity));
        }
        if !votes.cast.insert(key) {
            return Err(PaymentError::ReplayOrDoubleVote { voter: vote.voter.clone(), tier, height });
        }
        blocks
            .entry(height)
            .or_insert_with(|| BlockPayees::new(height))
            .add_vote(&script, tier, 1);
        votes.by_identity.insert(identity, vote);

        Ok(identity)
    }

    fn check_window(&self, height: u64, tier: Tier, tip: u64) -> Result<(), PaymentError> {
        let span = self.config.scaled_population(self.ctx.registry.count_enabled_in_tier(tier));
        let first = tip.saturating_sub(span);
        let last = tip + self.config.future_vote_window;
        if height < first || height > last {
            debug!(target: "mnpayments", "vote height {} out of range [{}, {}]", height, first, last);
            return Err(PaymentError::OutOfWindow { height, first, last });
        }
        Ok(())
    }

    fn check_eligibility(&self, voter: &MasternodeInfo, height: u64) -> Result<(), PaymentError> {
        let required = self.min_payments_protocol();
        if voter.protocol_version < required {
            return Err(PaymentError::ProtocolTooOld { version: voter.protocol_version, required });
        }

        let limit = self.config.signatures_total;
        let reference = height.saturating_sub(self.config.rank_reference_offset);
        let rank = self.ctx.registry.rank(&voter.id, reference, required);
        match rank {
            Some(rank) if rank <= limit => Ok(()),
            _ => {
                // Only nodes far outside the voting set are worth a log line; ranks
                // move around the boundary all the time.
                if rank.map_or(false, |r| r > limit * 2) {
                    debug!(target: "mnpayments", "Masternode {} not in the top {} ({:?})", voter.id, limit * 2, rank);
                }
                Err(PaymentError::NotEligible { voter: voter.id.clone(), rank, limit })
            }
        }
    }

    /// Script currently leading the vote for `height` in `tier`.
    pub fn resolve_payee(&self, height: u64, tier: Tier) -> Option<Vec<u8>> {
        self.blocks
            .read()
            .get(&height)
            .and_then(|tally| tally.resolve_winner(tier).map(<[u8]>::to_vec))
    }

    /// Whether `masternode` is already the winner of one of the next few blocks.
    /// `not_height` is left out of the scan.
    pub fn is_scheduled(&self, masternode: &MasternodeInfo, not_height: u64) -> bool {
        let tip = match self.ctx.chain.try_tip_height() {
            Some(tip) => tip,
            None => return false,
        };

        let script = masternode.payout_script();
        let in_tier = self.ctx.registry.count_enabled_in_tier(masternode.tier) as u64;
        let lookahead = self.config.schedule_lookahead;
        let upper = tip + lookahead;
        let lower = upper - lookahead.min(in_tier.saturating_sub(1));

        let blocks = self.blocks.read();
        (lower..upper)
            .filter(|h| *h != not_height)
            .filter_map(|h| blocks.get(&h))
            .any(|tally| tally.resolve_winner(masternode.tier) == Some(script.as_slice()))
    }

    /// Drops votes and tallies that fell behind the retention horizon of
    /// `current_height`. Returns the identities of the removed votes.
    pub fn prune(&self, current_height: u64) -> Vec<Hash> {
        let horizon = self.config.retention_horizon(self.ctx.registry.count_enabled());
        let cutoff = current_height.saturating_sub(horizon);

        let removed: Vec<Hash> = {
            let mut votes = self.votes.write();
            let mut blocks = self.blocks.write();

            let removed: Vec<Hash> = votes
                .by_identity
                .iter()
                .filter(|(_, vote)| vote.block_height < cutoff)
                .map(|(identity, _)| *identity)
                .collect();
            for identity in &removed {
                votes.by_identity.remove(identity);
            }
            votes.cast.retain(|(_, _, height)| *height >= cutoff);
            *blocks = blocks.split_off(&cutoff);
            removed
        };

        for identity in &removed {
            self.ctx.sync.forget_masternode_winner(identity);
        }
        if !removed.is_empty() {
            debug!(target: "mnpayments", "pruned {} votes below height {}", removed.len(), cutoff);
        }
        removed
    }

    /// Prunes relative to the chain tip. Does nothing if the tip is unavailable.
    pub fn clean_payment_list(&self) -> Vec<Hash> {
        match self.ctx.chain.try_tip_height() {
            Some(tip) => self.prune(tip),
            None => Vec::new(),
        }
    }

    /// Announces known votes to `peer`, at most `count_needed` blocks back, and
    /// ends with a sync-status count. Returns the number of announced votes.
    pub fn sync(&self, peer: &dyn PeerHandle, count_needed: u64) -> Option<u64> {
        let tip = self.ctx.chain.try_tip_height()?;

        let cap = self.config.scaled_population(self.ctx.registry.count_enabled());
        let count = count_needed.min(cap);
        let first = tip.saturating_sub(count);
        let last = tip + self.config.future_vote_window;

        let invs: Vec<_> = {
            let votes = self.votes.read();
            votes
                .by_identity
                .values()
                .filter(|vote| vote.block_height >= first && vote.block_height <= last)
                .map(PaymentVote::inv)
                .collect()
        };

        let sent = invs.len() as u64;
        for inv in invs {
            peer.push_inventory(inv);
        }
        peer.push_message(PaymentMessage::SyncStatusCount { item: SyncItem::MasternodeWinners, count: sent });
        info!(target: "mnpayments", "Sent {} masternode winners to peer {}", sent, peer.id());
        Some(sent)
    }

    /// Signs and admits this node's votes for `block_height`, one per tier.
    /// Returns the admitted votes so the caller can relay them once the ledger
    /// locks are released. A height is only processed once.
    pub fn produce_votes(&self, block_height: u64, active: &ActiveMasternode) -> Result<Vec<PaymentVote>, PaymentError> {
        let info = self
            .ctx
            .registry
            .find(&active.id, block_height)
            .ok_or(PaymentError::NotAMasternode)?;

        let limit = self.config.signatures_total;
        let reference = block_height.saturating_sub(self.config.rank_reference_offset);
        let rank = self.ctx.registry.rank(&active.id, reference, self.min_payments_protocol());
        match rank {
            Some(rank) if rank <= limit => {}
            _ => {
                debug!(target: "masternode", "not eligible to vote at {} (rank {:?})", block_height, rank);
                return Err(PaymentError::NotEligible { voter: active.id.clone(), rank, limit });
            }
        }

        let mut last_block_height = self.last_block_height.lock();
        if block_height <= *last_block_height {
            return Ok(Vec::new());
        }

        if self.ctx.budget.is_budget_payment_block(block_height) {
            debug!(target: "mnpayments", "height {} is paid by the budget", block_height);
            *last_block_height = block_height;
            return Ok(Vec::new());
        }

        let mut produced = Vec::new();
        for tier in 1..=self.ctx.schedule.tier_count(block_height) {
            let payee = match self.ctx.registry.next_in_payment_queue(block_height, tier) {
                Some(payee) => payee,
                None => {
                    info!(target: "masternode", "Failed to find masternode to pay in tier {} at {}", tier, block_height);
                    continue;
                }
            };

            let mut vote = PaymentVote::new(
                active.id.clone(),
                block_height,
                Payee::CollateralReference(payee.id.0.clone()),
            );
            if let Err(e) = vote.sign(&active.keypair, &info.operator_public_key) {
                warn!(target: "masternode", "could not sign payment vote: {}", e);
                continue;
            }

            info!(
                target: "masternode",
                "Payment winner for tier {} at {}: {}",
                tier,
                block_height,
                script_to_string(&payee.payout_script())
            );
            match self.try_admit(vote.clone()) {
                Ok(_) => produced.push(vote),
                Err(e) => debug!(target: "mnpayments", "own vote for tier {} rejected: {}", tier, e),
            }
        }

        if !produced.is_empty() {
            *last_block_height = block_height;
        }
        Ok(produced)
    }

    /// Checks the masternode outputs of a reward transaction against the tally
    /// for `height`. Heights without a tally are not enforced.
    pub fn is_transaction_valid(&self, tx: &Transaction, height: u64) -> bool {
        let registry_count = if self.ctx.sporks.is_active(Spork::MasternodePaymentEnforcement) {
            self.ctx.registry.stable_size()
        } else {
            self.ctx.registry.size()
        };
        let rules = PaymentRules {
            tier_count: self.ctx.schedule.tier_count(height),
            block_reward: self.ctx.chain.block_value(height),
            drift_count: registry_count + self.config.masternode_count_drift,
            signatures_required: self.config.signatures_required,
            schedule: self.ctx.schedule.as_ref(),
        };

        match self.blocks.read().get(&height) {
            Some(tally) => tally.is_transaction_valid(tx, &rules),
            None => true,
        }
    }

    pub fn required_payments(&self, height: u64) -> Vec<PaymentWinner> {
        self.blocks
            .read()
            .get(&height)
            .map(BlockPayees::required_payments)
            .unwrap_or_default()
    }

    pub fn has_vote(&self, identity: &Hash) -> bool {
        self.votes.read().by_identity.contains_key(identity)
    }

    pub fn get_vote(&self, identity: &Hash) -> Option<PaymentVote> {
        self.votes.read().by_identity.get(identity).cloned()
    }

    pub fn block_payees(&self, height: u64) -> Option<BlockPayees> {
        self.blocks.read().get(&height).cloned()
    }

    /// Votes for heights in `[from, to]`, ordered by height.
    pub fn votes_in_range(&self, from: u64, to: u64) -> Vec<PaymentVote> {
        let mut votes: Vec<PaymentVote> = self
            .votes
            .read()
            .by_identity
            .values()
            .filter(|vote| vote.block_height >= from && vote.block_height <= to)
            .cloned()
            .collect();
        votes.sort_by_key(|vote| vote.block_height);
        votes
    }

    pub fn vote_count(&self) -> usize {
        self.votes.read().by_identity.len()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn oldest_block(&self) -> Option<u64> {
        self.blocks.read().keys().next().copied()
    }

    pub fn newest_block(&self) -> Option<u64> {
        self.blocks.read().keys().next_back().copied()
    }

    pub fn summary(&self) -> LedgerSummary {
        let votes = self.votes.read();
        let blocks = self.blocks.read();
        LedgerSummary { votes: votes.by_identity.len(), blocks: blocks.len() }
    }

    pub fn clear(&self) {
        let mut votes = self.votes.write();
        let mut blocks = self.blocks.write();
        votes.by_identity.clear();
        votes.cast.clear();
        blocks.clear();
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let votes = self.votes.read();
        let blocks = self.blocks.read();
        LedgerSnapshot { votes: votes.by_identity.clone(), blocks: blocks.clone() }
    }

    /// Replaces the ledger contents with `snapshot`. Double-vote bookkeeping is
    /// rebuilt for every vote whose payee the registry can place.
    pub fn restore(&self, snapshot: LedgerSnapshot) {
        let cast: HashSet<_> = snapshot
            .votes
            .values()
            .filter_map(|vote| {
                let script = self.ctx.payee_script(&vote.payee, vote.block_height)?;
                let tier = self.ctx.payee_tier(&vote.payee, &script, vote.block_height)?;
                Some((vote.voter.clone(), tier, vote.block_height))
            })
            .collect();

        let mut votes = self.votes.write();
        let mut blocks = self.blocks.write();
        votes.by_identity = snapshot.votes;
        votes.cast = cast;
        *blocks = snapshot.blocks;
    }
}

impl fmt::Display for PaymentLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.summary().fmt(f)
    }
}
