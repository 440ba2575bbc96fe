//! Collaborators the payment engine consults but does not own: chain state,
//! the masternode registry, reward schedule, budget subsystem, sporks, sync
//! progress and the peer transport.

use std::sync::Arc;

use rusty_crypto::hash::hash160;
use rusty_shared_types::{p2pkh_script, Hash, Inv, MasternodeID, OutPoint, PublicKey, Tier, Transaction};
use serde::{Deserialize, Serialize};

use crate::messages::PaymentMessage;
use crate::vote::Payee;

/// Registry view of a masternode at a given height.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasternodeInfo {
    pub id: MasternodeID,
    pub protocol_version: u32,
    /// Key the masternode signs payment votes with
    pub operator_public_key: PublicKey,
    /// Key the collateral (and therefore the payout) belongs to
    pub collateral_public_key: PublicKey,
    pub tier: Tier,
}

impl MasternodeInfo {
    /// P2PKH script paying this masternode.
    pub fn payout_script(&self) -> Vec<u8> {
        p2pkh_script(&hash160(&self.collateral_public_key))
    }
}

/// One scheduled payment, as reported to RPC consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentWinner {
    pub address: String,
    pub votes: u32,
    pub tier: Tier,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Spork {
    SuperblocksEnabled,
    MasternodePaymentEnforcement,
    BudgetEnforcement,
    PayUpdatedNodes,
}

/// Outcome of checking a block against a finalized budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrxValidationStatus {
    Valid,
    Invalid,
    DoublePayment,
    /// Not enough votes on the budget to enforce it.
    VoteThreshold,
}

pub trait ChainView: Send + Sync {
    /// Current tip height. Returns `None` without blocking when the chain
    /// state is locked by someone else, or when there is no tip yet.
    fn try_tip_height(&self) -> Option<u64>;
    fn block_hash(&self, height: u64) -> Option<Hash>;
    fn height_of(&self, block_hash: &Hash) -> Option<u64>;
    /// Locking script of an output, looked up in the transaction index.
    fn output_script(&self, outpoint: &OutPoint) -> Option<Vec<u8>>;
    /// Total block value (subsidy) at `height`.
    fn block_value(&self, height: u64) -> u64;
}

pub trait MasternodeRegistry: Send + Sync {
    fn find(&self, id: &MasternodeID, height: u64) -> Option<MasternodeInfo>;
    fn find_by_script(&self, script: &[u8], height: u64) -> Option<MasternodeInfo>;
    /// 1-based rank among masternodes running at least `min_protocol`.
    fn rank(&self, id: &MasternodeID, height: u64, min_protocol: u32) -> Option<usize>;
    fn count_enabled(&self) -> usize;
    fn count_enabled_in_tier(&self, tier: Tier) -> usize;
    fn size(&self) -> usize;
    fn stable_size(&self) -> usize;
    /// Oldest-paid eligible masternode of `tier` for `height`.
    fn next_in_payment_queue(&self, height: u64, tier: Tier) -> Option<MasternodeInfo>;
    fn current_winner_in_tier(&self, tier: Tier, height: u64) -> Option<MasternodeInfo>;
}

pub trait RewardSchedule: Send + Sync {
    fn tier_count(&self, height: u64) -> u32;
    fn masternode_payment(&self, height: u64, tier: Tier, block_value: u64, drift_count: usize) -> u64;
}

pub trait BudgetView: Send + Sync {
    fn is_budget_payment_block(&self, height: u64) -> bool;
    fn is_transaction_valid(&self, tx: &Transaction, height: u64) -> TrxValidationStatus;
    fn fill_block_payee(&self, tx: &mut Transaction, fees: u64, is_proof_of_stake: bool);
    fn required_payments(&self, height: u64) -> Vec<PaymentWinner>;
}

pub trait SporkView: Send + Sync {
    fn is_active(&self, spork: Spork) -> bool;
}

pub trait SyncView: Send + Sync {
    fn is_blockchain_synced(&self) -> bool;
    fn is_synced(&self) -> bool;
    fn added_masternode_winner(&self, hash: &Hash);
    fn forget_masternode_winner(&self, hash: &Hash);
}

/// A connected peer, as seen by the payment message handlers.
pub trait PeerHandle: Send + Sync {
    fn id(&self) -> u64;
    fn protocol_version(&self) -> u32;
    fn has_fulfilled_request(&self, request: &str) -> bool;
    fn fulfilled_request(&self, request: &str);
    fn push_inventory(&self, inv: Inv);
    fn push_message(&self, message: PaymentMessage);
    fn misbehaving(&self, score: i32);
    fn ask_for_masternode(&self, collateral: &OutPoint);
}

pub trait InventoryRelay: Send + Sync {
    fn relay_inventory(&self, inv: Inv);
}

/// Handles to every collaborator, shared by the ledger and the block policy.
#[derive(Clone)]
pub struct PaymentContext {
    pub chain: Arc<dyn ChainView>,
    pub registry: Arc<dyn MasternodeRegistry>,
    pub schedule: Arc<dyn RewardSchedule>,
    pub budget: Arc<dyn BudgetView>,
    pub sporks: Arc<dyn SporkView>,
    pub sync: Arc<dyn SyncView>,
}

impl PaymentContext {
    /// Concrete script a payee resolves to, if it can be resolved yet.
    pub fn payee_script(&self, payee: &Payee, height: u64) -> Option<Vec<u8>> {
        match payee {
            Payee::DirectScript(script) => Some(script.clone()),
            Payee::CollateralReference(collateral) => {
                let id = MasternodeID(collateral.clone());
                match self.registry.find(&id, height) {
                    Some(info) => Some(info.payout_script()),
                    None => self.chain.output_script(collateral),
                }
            }
        }
    }

    /// Tier of the masternode a payee pays.
    pub fn payee_tier(&self, payee: &Payee, script: &[u8], height: u64) -> Option<Tier> {
        let info = match payee {
            Payee::CollateralReference(collateral) => self
                .registry
                .find(&MasternodeID(collateral.clone()), height)
                .or_else(|| self.registry.find_by_script(script, height)),
            Payee::DirectScript(_) => self.registry.find_by_script(script, height),
        };
        info.map(|info| info.tier)
    }
}
