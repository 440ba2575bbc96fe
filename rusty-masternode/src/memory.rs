//! In-memory collaborators, for tests and offline tooling.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock};
use rusty_crypto::hash::blake3_hash;
use rusty_shared_types::{Hash, Inv, MasternodeID, OutPoint, Tier, Transaction};

use crate::context::{
    BudgetView, ChainView, InventoryRelay, MasternodeInfo, MasternodeRegistry, PaymentWinner, PeerHandle,
    RewardSchedule, Spork, SporkView, SyncView, TrxValidationStatus,
};
use crate::messages::PaymentMessage;

/// Chain with synthetic block hashes for every height up to the tip.
pub struct MemoryChain {
    tip: Mutex<Option<u64>>,
    indexed_height: RwLock<Option<u64>>,
    blocks: RwLock<HashMap<u64, Hash>>,
    outputs: RwLock<HashMap<OutPoint, Vec<u8>>>,
    block_value: u64,
}

impl MemoryChain {
    pub fn new(block_value: u64) -> Self {
        MemoryChain {
            tip: Mutex::new(None),
            indexed_height: RwLock::new(None),
            blocks: RwLock::new(HashMap::new()),
            outputs: RwLock::new(HashMap::new()),
            block_value,
        }
    }

    pub fn synthetic_hash(height: u64) -> Hash {
        blake3_hash(&height.to_le_bytes())
    }

    pub fn set_tip(&self, height: u64) {
        *self.tip.lock() = Some(height);
        *self.indexed_height.write() = Some(height);
    }

    /// Records an explicit hash for `height`, overriding the synthetic one.
    pub fn insert_block(&self, height: u64, hash: Hash) {
        self.blocks.write().insert(height, hash);
    }

    pub fn insert_output(&self, outpoint: OutPoint, script: Vec<u8>) {
        self.outputs.write().insert(outpoint, script);
    }

    /// Holds the chain-state lock, as block processing would.
    pub fn lock_tip(&self) -> MutexGuard<'_, Option<u64>> {
        self.tip.lock()
    }
}

impl ChainView for MemoryChain {
    fn try_tip_height(&self) -> Option<u64> {
        self.tip.try_lock().and_then(|tip| *tip)
    }

    fn block_hash(&self, height: u64) -> Option<Hash> {
        if let Some(hash) = self.blocks.read().get(&height) {
            return Some(*hash);
        }
        match *self.indexed_height.read() {
            Some(indexed) if height <= indexed => Some(Self::synthetic_hash(height)),
            _ => None,
        }
    }

    fn height_of(&self, block_hash: &Hash) -> Option<u64> {
        if let Some((height, _)) = self.blocks.read().iter().find(|(_, hash)| *hash == block_hash) {
            return Some(*height);
        }
        let indexed = (*self.indexed_height.read())?;
        (0..=indexed).rev().find(|h| Self::synthetic_hash(*h) == *block_hash)
    }

    fn output_script(&self, outpoint: &OutPoint) -> Option<Vec<u8>> {
        self.outputs.read().get(outpoint).cloned()
    }

    fn block_value(&self, _height: u64) -> u64 {
        self.block_value
    }
}

#[derive(Debug, Clone)]
struct RegisteredMasternode {
    info: MasternodeInfo,
    enabled: bool,
    last_paid: u64,
}

/// Registry where rank is registration order among enabled, recent-enough nodes.
#[derive(Default)]
pub struct MemoryRegistry {
    nodes: RwLock<Vec<RegisteredMasternode>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, info: MasternodeInfo) {
        self.nodes.write().push(RegisteredMasternode { info, enabled: true, last_paid: 0 });
    }

    pub fn set_enabled(&self, id: &MasternodeID, enabled: bool) {
        if let Some(node) = self.nodes.write().iter_mut().find(|n| n.info.id == *id) {
            node.enabled = enabled;
        }
    }

    pub fn mark_paid(&self, id: &MasternodeID, height: u64) {
        if let Some(node) = self.nodes.write().iter_mut().find(|n| n.info.id == *id) {
            node.last_paid = height;
        }
    }
}

impl MasternodeRegistry for MemoryRegistry {
    fn find(&self, id: &MasternodeID, _height: u64) -> Option<MasternodeInfo> {
        self.nodes.read().iter().find(|n| n.info.id == *id).map(|n| n.info.clone())
    }

    fn find_by_script(&self, script: &[u8], _height: u64) -> Option<MasternodeInfo> {
        self.nodes
            .read()
            .iter()
            .find(|n| n.info.payout_script() == script)
            .map(|n| n.info.clone())
    }

    fn rank(&self, id: &MasternodeID, _height: u64, min_protocol: u32) -> Option<usize> {
        self.nodes
            .read()
            .iter()
            .filter(|n| n.enabled && n.info.protocol_version >= min_protocol)
            .position(|n| n.info.id == *id)
            .map(|position| position + 1)
    }

    fn count_enabled(&self) -> usize {
        self.nodes.read().iter().filter(|n| n.enabled).count()
    }

    fn count_enabled_in_tier(&self, tier: Tier) -> usize {
        self.nodes.read().iter().filter(|n| n.enabled && n.info.tier == tier).count()
    }

    fn size(&self) -> usize {
        self.nodes.read().len()
    }

    fn stable_size(&self) -> usize {
        self.count_enabled()
    }

    fn next_in_payment_queue(&self, _height: u64, tier: Tier) -> Option<MasternodeInfo> {
        self.nodes
            .read()
            .iter()
            .filter(|n| n.enabled && n.info.tier == tier)
            .min_by_key(|n| n.last_paid)
            .map(|n| n.info.clone())
    }

    fn current_winner_in_tier(&self, tier: Tier, _height: u64) -> Option<MasternodeInfo> {
        self.nodes
            .read()
            .iter()
            .find(|n| n.enabled && n.info.tier == tier)
            .map(|n| n.info.clone())
    }
}

/// Pays each tier a fixed percentage of the block value.
pub struct FlatRewardSchedule {
    shares_percent: Vec<u64>,
}

impl FlatRewardSchedule {
    /// One entry per tier, tier 1 first.
    pub fn new(shares_percent: Vec<u64>) -> Self {
        FlatRewardSchedule { shares_percent }
    }
}

impl RewardSchedule for FlatRewardSchedule {
    fn tier_count(&self, _height: u64) -> u32 {
        self.shares_percent.len() as u32
    }

    fn masternode_payment(&self, _height: u64, tier: Tier, block_value: u64, _drift_count: usize) -> u64 {
        let share = (tier as usize)
            .checked_sub(1)
            .and_then(|index| self.shares_percent.get(index))
            .copied()
            .unwrap_or(0);
        block_value * share / 100
    }
}

#[derive(Default)]
pub struct StaticSporks {
    active: RwLock<HashSet<Spork>>,
}

impl StaticSporks {
    pub fn new(active: &[Spork]) -> Self {
        StaticSporks { active: RwLock::new(active.iter().copied().collect()) }
    }

    pub fn set(&self, spork: Spork, active: bool) {
        let mut sporks = self.active.write();
        if active {
            sporks.insert(spork);
        } else {
            sporks.remove(&spork);
        }
    }
}

impl SporkView for StaticSporks {
    fn is_active(&self, spork: Spork) -> bool {
        self.active.read().contains(&spork)
    }
}

/// Sync state with a record of the winners the sync tracker was told about.
pub struct StaticSync {
    blockchain_synced: AtomicBool,
    synced: AtomicBool,
    seen: Mutex<HashSet<Hash>>,
}

impl StaticSync {
    pub fn new(blockchain_synced: bool, synced: bool) -> Self {
        StaticSync {
            blockchain_synced: AtomicBool::new(blockchain_synced),
            synced: AtomicBool::new(synced),
            seen: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_synced(&self, blockchain_synced: bool, synced: bool) {
        self.blockchain_synced.store(blockchain_synced, Ordering::SeqCst);
        self.synced.store(synced, Ordering::SeqCst);
    }

    pub fn has_seen(&self, hash: &Hash) -> bool {
        self.seen.lock().contains(hash)
    }
}

impl SyncView for StaticSync {
    fn is_blockchain_synced(&self) -> bool {
        self.blockchain_synced.load(Ordering::SeqCst)
    }

    fn is_synced(&self) -> bool {
        self.synced.load(Ordering::SeqCst)
    }

    fn added_masternode_winner(&self, hash: &Hash) {
        self.seen.lock().insert(*hash);
    }

    fn forget_masternode_winner(&self, hash: &Hash) {
        self.seen.lock().remove(hash);
    }
}

/// Budget subsystem with a fixed set of superblock heights.
pub struct MemoryBudget {
    budget_heights: HashSet<u64>,
    status: TrxValidationStatus,
    payee: Option<(Vec<u8>, u64)>,
}

impl MemoryBudget {
    pub fn none() -> Self {
        MemoryBudget { budget_heights: HashSet::new(), status: TrxValidationStatus::Valid, payee: None }
    }

    /// Superblocks at `heights`, validated with `status` and paying `payee` when filled.
    pub fn new(heights: &[u64], status: TrxValidationStatus, payee: Option<(Vec<u8>, u64)>) -> Self {
        MemoryBudget { budget_heights: heights.iter().copied().collect(), status, payee }
    }
}

impl BudgetView for MemoryBudget {
    fn is_budget_payment_block(&self, height: u64) -> bool {
        self.budget_heights.contains(&height)
    }

    fn is_transaction_valid(&self, _tx: &Transaction, _height: u64) -> TrxValidationStatus {
        self.status
    }

    fn fill_block_payee(&self, tx: &mut Transaction, _fees: u64, _is_proof_of_stake: bool) {
        if let Some((script, amount)) = &self.payee {
            tx.get_outputs_mut().push(rusty_shared_types::TxOutput::new(*amount, script.clone()));
        }
    }

    fn required_payments(&self, height: u64) -> Vec<PaymentWinner> {
        match &self.payee {
            Some((script, _)) if self.is_budget_payment_block(height) => vec![PaymentWinner {
                address: rusty_shared_types::script_to_string(script),
                votes: 0,
                tier: rusty_shared_types::UNKNOWN_TIER,
            }],
            _ => Vec::new(),
        }
    }
}

/// Peer that records everything sent to it.
pub struct RecordingPeer {
    id: u64,
    protocol_version: u32,
    fulfilled: Mutex<HashSet<String>>,
    inventory: Mutex<Vec<Inv>>,
    messages: Mutex<Vec<PaymentMessage>>,
    misbehaviour: AtomicI32,
    asked: Mutex<Vec<OutPoint>>,
}

impl RecordingPeer {
    pub fn new(id: u64, protocol_version: u32) -> Self {
        RecordingPeer {
            id,
            protocol_version,
            fulfilled: Mutex::new(HashSet::new()),
            inventory: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
            misbehaviour: AtomicI32::new(0),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub fn inventory(&self) -> Vec<Inv> {
        self.inventory.lock().clone()
    }

    pub fn messages(&self) -> Vec<PaymentMessage> {
        self.messages.lock().clone()
    }

    pub fn misbehaviour(&self) -> i32 {
        self.misbehaviour.load(Ordering::SeqCst)
    }

    pub fn asked(&self) -> Vec<OutPoint> {
        self.asked.lock().clone()
    }
}

impl PeerHandle for RecordingPeer {
    fn id(&self) -> u64 {
        self.id
    }

    fn protocol_version(&self) -> u32 {
        self.protocol_version
    }

    fn has_fulfilled_request(&self, request: &str) -> bool {
        self.fulfilled.lock().contains(request)
    }

    fn fulfilled_request(&self, request: &str) {
        self.fulfilled.lock().insert(request.to_string());
    }

    fn push_inventory(&self, inv: Inv) {
        self.inventory.lock().push(inv);
    }

    fn push_message(&self, message: PaymentMessage) {
        self.messages.lock().push(message);
    }

    fn misbehaving(&self, score: i32) {
        self.misbehaviour.fetch_add(score, Ordering::SeqCst);
    }

    fn ask_for_masternode(&self, collateral: &OutPoint) {
        self.asked.lock().push(collateral.clone());
    }
}

#[derive(Default)]
pub struct RecordingRelay {
    relayed: Mutex<Vec<Inv>>,
}

impl RecordingRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn relayed(&self) -> Vec<Inv> {
        self.relayed.lock().clone()
    }
}

impl InventoryRelay for RecordingRelay {
    fn relay_inventory(&self, inv: Inv) {
        self.relayed.lock().push(inv);
    }
}
