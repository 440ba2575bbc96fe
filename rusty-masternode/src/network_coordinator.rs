//! Network side of masternode payments
//!
//! Dispatches `mnget`/`mnw` messages from peers into the payment ledger, relays
//! admitted votes and drives this node's own votes as new blocks arrive.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;
use rusty_shared_types::Hash;

use crate::context::{InventoryRelay, PeerHandle};
use crate::error::PaymentError;
use crate::ledger::PaymentLedger;
use crate::messages::{PaymentMessage, MSG_GET_PAYMENT_VOTES};
use crate::vote::{ActiveMasternode, Payee, PaymentVote};

/// Configuration for the payment network coordinator
#[derive(Debug, Clone)]
pub struct PaymentNetworkConfig {
    /// Own votes are cast this many blocks ahead of the new tip
    pub vote_ahead_blocks: u64,
}

impl Default for PaymentNetworkConfig {
    fn default() -> Self {
        Self { vote_ahead_blocks: 10 }
    }
}

/// Counters of processed payment traffic
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentNetworkStats {
    pub votes_admitted: u64,
    pub votes_duplicate: u64,
    pub votes_rejected: u64,
    pub own_votes: u64,
    pub sync_requests_served: u64,
    pub sync_requests_refused: u64,
}

pub struct PaymentNetworkCoordinator {
    ledger: Arc<PaymentLedger>,
    relay: Arc<dyn InventoryRelay>,
    active: Option<ActiveMasternode>,
    config: PaymentNetworkConfig,
    stats: Mutex<PaymentNetworkStats>,
}

impl PaymentNetworkCoordinator {
    pub fn new(ledger: Arc<PaymentLedger>, relay: Arc<dyn InventoryRelay>, config: PaymentNetworkConfig) -> Self {
        Self {
            ledger,
            relay,
            active: None,
            config,
            stats: Mutex::new(PaymentNetworkStats::default()),
        }
    }

    /// Makes this node cast its own payment votes as `active`.
    pub fn with_active_masternode(mut self, active: ActiveMasternode) -> Self {
        self.active = Some(active);
        self
    }

    pub fn ledger(&self) -> &Arc<PaymentLedger> {
        &self.ledger
    }

    /// Handle a payment message received from `peer`
    pub fn handle_message(&self, peer: &dyn PeerHandle, message: PaymentMessage) {
        let ctx = self.ledger.context();
        if self.ledger.config().lite_mode || !ctx.sync.is_blockchain_synced() {
            return;
        }

        match message {
            PaymentMessage::GetPaymentVotes { count_needed } => self.handle_get_votes(peer, count_needed),
            PaymentMessage::PaymentVote(vote) => self.handle_vote(peer, vote),
            PaymentMessage::SyncStatusCount { item, count } => {
                debug!(target: "mnpayments", "peer {} finished sync of {:?}: {} items", peer.id(), item, count);
            }
        }
    }

    fn handle_get_votes(&self, peer: &dyn PeerHandle, count_needed: u64) {
        let config = self.ledger.config();
        if config.network.is_main_network && peer.has_fulfilled_request(MSG_GET_PAYMENT_VOTES) {
            warn!(target: "mnpayments", "mnget - peer {} already asked me for the list", peer.id());
            peer.misbehaving(config.misbehaviour_score);
            self.stats.lock().sync_requests_refused += 1;
            return;
        }

        peer.fulfilled_request(MSG_GET_PAYMENT_VOTES);
        if self.ledger.sync(peer, count_needed).is_some() {
            self.stats.lock().sync_requests_served += 1;
        }
    }

    fn handle_vote(&self, peer: &dyn PeerHandle, vote: PaymentVote) {
        let ctx = self.ledger.context();
        let config = self.ledger.config();
        if peer.protocol_version() < config.network.active_protocol_version {
            return;
        }

        let inv = vote.inv();
        let identity = inv.hash;
        match self.ledger.admit(vote) {
            Ok(true) => {
                self.relay.relay_inventory(inv);
                ctx.sync.added_masternode_winner(&identity);
                self.stats.lock().votes_admitted += 1;
            }
            Ok(false) => {
                debug!(target: "mnpayments", "mnw - already seen {}", hex::encode(identity));
                ctx.sync.added_masternode_winner(&identity);
                self.stats.lock().votes_duplicate += 1;
            }
            Err(e) => {
                self.stats.lock().votes_rejected += 1;
                self.handle_rejection(peer, &identity, e);
            }
        }
    }

    fn handle_rejection(&self, peer: &dyn PeerHandle, identity: &Hash, error: PaymentError) {
        let ctx = self.ledger.context();
        let score = self.ledger.config().misbehaviour_score;
        match error {
            PaymentError::UnknownVoter(voter) => {
                debug!(target: "mnpayments", "mnw - unknown masternode {}, asking peer {}", voter, peer.id());
                peer.ask_for_masternode(voter.collateral());
            }
            PaymentError::UnknownPayee(Payee::CollateralReference(collateral)) => {
                debug!(target: "mnpayments", "mnw - unknown payee {}, asking peer {}", collateral, peer.id());
                peer.ask_for_masternode(&collateral);
            }
            PaymentError::BadSignature(voter) => {
                if ctx.sync.is_synced() {
                    warn!(target: "mnpayments", "mnw - invalid signature from {} via peer {}", voter, peer.id());
                    peer.misbehaving(score);
                }
                // The voter may have changed keys since our registry entry was made.
                peer.ask_for_masternode(voter.collateral());
            }
            other => {
                debug!(target: "mnpayments", "mnw - vote {} rejected: {}", hex::encode(identity), other);
            }
        }
    }

    /// Casts this node's votes for a block ahead of `tip_height` and relays them.
    /// Returns the number of votes relayed.
    pub fn update_block_height(&self, tip_height: u64) -> usize {
        let active = match &self.active {
            Some(active) => active,
            None => return 0,
        };
        if self.ledger.config().lite_mode {
            return 0;
        }

        let target = tip_height + self.config.vote_ahead_blocks;
        match self.ledger.produce_votes(target, active) {
            Ok(votes) => {
                // Ledger locks are released by now.
                for vote in &votes {
                    self.relay.relay_inventory(vote.inv());
                }
                if !votes.is_empty() {
                    info!(target: "masternode", "relayed {} own payment votes for height {}", votes.len(), target);
                }
                self.stats.lock().own_votes += votes.len() as u64;
                votes.len()
            }
            Err(e) => {
                debug!(target: "masternode", "no own votes for height {}: {}", target, e);
                0
            }
        }
    }

    /// Periodic cleanup of votes that left the retention horizon
    pub fn periodic_maintenance(&self) -> usize {
        let removed = self.ledger.clean_payment_list();
        if !removed.is_empty() {
            info!(target: "mnpayments", "maintenance removed {} payment votes, now {}", removed.len(), self.ledger.summary());
        }
        removed.len()
    }

    pub fn get_network_stats(&self) -> PaymentNetworkStats {
        self.stats.lock().clone()
    }
}
