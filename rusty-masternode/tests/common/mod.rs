#![allow(dead_code)]

use std::sync::Arc;

use rusty_crypto::RustyKeyPair;
use rusty_masternode::context::{ChainView, PaymentContext};
use rusty_masternode::memory::{FlatRewardSchedule, MemoryBudget, MemoryChain, MemoryRegistry, StaticSporks, StaticSync};
use rusty_masternode::{
    ActiveMasternode, BlockPayeePolicy, MasternodeInfo, Payee, PaymentLedger, PaymentVote, PaymentsConfig, Spork,
};
use rusty_shared_types::{OutPoint, Tier};

pub const PROTOCOL: u32 = 70920;
pub const BLOCK_VALUE: u64 = 1_000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn operator_key(index: usize) -> RustyKeyPair {
    RustyKeyPair::from_secret_bytes(&[index as u8 + 1; 32]).unwrap()
}

pub fn collateral_key(index: usize) -> RustyKeyPair {
    RustyKeyPair::from_secret_bytes(&[index as u8 + 101; 32]).unwrap()
}

pub fn masternode(index: usize, tier: Tier, protocol_version: u32) -> MasternodeInfo {
    MasternodeInfo {
        id: OutPoint::new([index as u8 + 1; 32], 0).into(),
        protocol_version,
        operator_public_key: operator_key(index).public_key_bytes(),
        collateral_public_key: collateral_key(index).public_key_bytes(),
        tier,
    }
}

pub struct NetSpec {
    pub count: usize,
    pub tip: u64,
    pub tiers: u32,
    pub budget: MemoryBudget,
    pub config: PaymentsConfig,
    pub sporks: Vec<Spork>,
    pub synced: bool,
}

impl Default for NetSpec {
    fn default() -> Self {
        NetSpec {
            count: 16,
            tip: 1_000,
            tiers: 1,
            budget: MemoryBudget::none(),
            config: PaymentsConfig::default(),
            sporks: Vec::new(),
            synced: true,
        }
    }
}

/// A ledger wired to in-memory collaborators with `count` registered masternodes.
/// Node `i` ranks `i + 1` and sits in tier `i % tiers + 1`.
pub struct TestNet {
    pub chain: Arc<MemoryChain>,
    pub registry: Arc<MemoryRegistry>,
    pub sporks: Arc<StaticSporks>,
    pub sync: Arc<StaticSync>,
    pub ledger: Arc<PaymentLedger>,
    pub nodes: Vec<MasternodeInfo>,
}

impl TestNet {
    pub fn new() -> Self {
        Self::build(NetSpec::default())
    }

    pub fn build(spec: NetSpec) -> Self {
        init_logging();
        let chain = Arc::new(MemoryChain::new(BLOCK_VALUE));
        chain.set_tip(spec.tip);

        let registry = Arc::new(MemoryRegistry::new());
        let nodes: Vec<_> = (0..spec.count)
            .map(|i| masternode(i, i as u32 % spec.tiers + 1, PROTOCOL))
            .collect();
        for node in &nodes {
            registry.register(node.clone());
        }

        let sporks = Arc::new(StaticSporks::new(&spec.sporks));
        let sync = Arc::new(StaticSync::new(spec.synced, spec.synced));
        let ctx = PaymentContext {
            chain: chain.clone(),
            registry: registry.clone(),
            schedule: Arc::new(FlatRewardSchedule::new(vec![10; spec.tiers as usize])),
            budget: Arc::new(spec.budget),
            sporks: sporks.clone(),
            sync: sync.clone(),
        };
        let ledger = Arc::new(PaymentLedger::new(spec.config, ctx));

        TestNet { chain, registry, sporks, sync, ledger, nodes }
    }

    pub fn tip(&self) -> u64 {
        self.chain.try_tip_height().unwrap()
    }

    pub fn script(&self, index: usize) -> Vec<u8> {
        self.nodes[index].payout_script()
    }

    /// Vote by node `voter` to pay node `payee` at `height`, signed with the voter's key.
    pub fn vote(&self, voter: usize, height: u64, payee: usize) -> PaymentVote {
        let mut vote = PaymentVote::new(
            self.nodes[voter].id.clone(),
            height,
            Payee::CollateralReference(self.nodes[payee].id.0.clone()),
        );
        vote.sign(&operator_key(voter), &self.nodes[voter].operator_public_key).unwrap();
        vote
    }

    pub fn active(&self, index: usize) -> ActiveMasternode {
        ActiveMasternode { id: self.nodes[index].id.clone(), keypair: operator_key(index) }
    }

    pub fn policy(&self) -> BlockPayeePolicy {
        BlockPayeePolicy::new(self.ledger.clone())
    }
}
