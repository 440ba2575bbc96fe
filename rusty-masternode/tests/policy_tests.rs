mod common;

use common::{NetSpec, TestNet, BLOCK_VALUE};
use rusty_masternode::memory::{MemoryBudget, MemoryChain};
use rusty_masternode::query::{self, UNKNOWN_WINNER};
use rusty_masternode::{NetworkParams, PaymentsConfig, Spork, TrxValidationStatus};
use rusty_shared_types::opcodes::OP_ZEROCOINMINT;
use rusty_shared_types::{Block, BlockHeader, Transaction, TxOutput};

const PAYMENT: u64 = BLOCK_VALUE / 10;

fn coinbase(outputs: Vec<TxOutput>) -> Transaction {
    Transaction::Coinbase { version: 1, inputs: vec![], outputs, lock_time: 0 }
}

fn coinstake(outputs: Vec<TxOutput>) -> Transaction {
    Transaction::Coinstake { version: 1, inputs: vec![], outputs, lock_time: 0 }
}

/// Proof-of-stake block on top of `previous_height`.
fn block(previous_height: u64, reward: Vec<TxOutput>) -> Block {
    Block {
        header: BlockHeader {
            version: 1,
            previous_block_hash: MemoryChain::synthetic_hash(previous_height),
            merkle_root: [0u8; 32],
            timestamp: 0,
            nonce: 0,
        },
        transactions: vec![coinbase(vec![]), coinstake(reward)],
    }
}

fn confirm(net: &TestNet, height: u64, payee: usize) {
    for voter in 0..6 {
        assert_eq!(net.ledger.admit(net.vote(voter, height, payee)), Ok(true));
    }
}

#[test]
fn test_fill_pays_voted_winner_from_coinbase() {
    let net = TestNet::new();
    assert_eq!(net.ledger.admit(net.vote(0, 1_001, 12)), Ok(true));

    let mut tx = coinbase(vec![TxOutput::new(BLOCK_VALUE, vec![0x51])]);
    net.policy().fill_block_payee(&mut tx, 0, false);
    let outputs = tx.get_outputs();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[0].value, BLOCK_VALUE - PAYMENT);
    assert_eq!(outputs[1], TxOutput::new(PAYMENT, net.script(12)));
}

#[test]
fn test_fill_proof_of_stake_deducts_stake_output() {
    let net = TestNet::new();
    let mut tx = coinstake(vec![TxOutput::new(0, vec![]), TxOutput::new(5_000, vec![0x51])]);
    net.policy().fill_block_payee(&mut tx, 0, true);

    let outputs = tx.get_outputs();
    assert_eq!(outputs[0].value, 0);
    assert_eq!(outputs[1].value, 5_000 - PAYMENT);
    // No votes yet: the top masternode of the tier is paid.
    assert_eq!(outputs[2], TxOutput::new(PAYMENT, net.script(0)));
}

#[test]
fn test_fill_leaves_zerocoin_mint_untouched() {
    let net = TestNet::new();
    let mint = TxOutput::new(BLOCK_VALUE, vec![OP_ZEROCOINMINT, 0x01]);
    let mut tx = coinstake(vec![TxOutput::new(0, vec![]), mint.clone()]);
    net.policy().fill_block_payee(&mut tx, 0, true);
    assert_eq!(tx.get_outputs()[1], mint);
    assert_eq!(tx.get_outputs().len(), 3);
}

#[test]
fn test_fill_without_any_masternode() {
    let net = TestNet::new();
    for node in &net.nodes {
        net.registry.set_enabled(&node.id, false);
    }
    let mut tx = coinbase(vec![TxOutput::new(BLOCK_VALUE + 7, vec![0x51])]);
    net.policy().fill_block_payee(&mut tx, 7, false);
    assert_eq!(tx.get_outputs().len(), 1);
    assert_eq!(tx.get_outputs()[0].value, BLOCK_VALUE - PAYMENT);
}

#[test]
fn test_fill_every_tier() {
    let net = TestNet::build(NetSpec { count: 20, tiers: 2, ..NetSpec::default() });
    let mut tx = coinbase(vec![TxOutput::new(BLOCK_VALUE, vec![0x51])]);
    net.policy().fill_block_payee(&mut tx, 0, false);
    let outputs = tx.get_outputs();
    assert_eq!(outputs.len(), 3);
    assert_eq!(outputs[0].value, BLOCK_VALUE - 2 * PAYMENT);
    assert_eq!(outputs[1].script_pubkey, net.script(0));
    assert_eq!(outputs[2].script_pubkey, net.script(1));
}

#[test]
fn test_fill_superblock_delegates_to_budget() {
    let net = TestNet::build(NetSpec {
        budget: MemoryBudget::new(&[1_001], TrxValidationStatus::Valid, Some((vec![0x52], 77))),
        sporks: vec![Spork::SuperblocksEnabled],
        ..NetSpec::default()
    });
    let mut tx = coinbase(vec![TxOutput::new(BLOCK_VALUE, vec![0x51])]);
    net.policy().fill_block_payee(&mut tx, 0, false);
    assert_eq!(tx.get_outputs(), &[TxOutput::new(BLOCK_VALUE, vec![0x51]), TxOutput::new(77, vec![0x52])][..]);

    // Superblocks disabled: masternodes are paid as usual.
    net.sporks.set(Spork::SuperblocksEnabled, false);
    let mut tx = coinbase(vec![TxOutput::new(BLOCK_VALUE, vec![0x51])]);
    net.policy().fill_block_payee(&mut tx, 0, false);
    assert_eq!(tx.get_outputs()[1].script_pubkey, net.script(0));
}

#[test]
fn test_payee_enforcement() {
    let net = TestNet::new();
    let policy = net.policy();
    confirm(&net, 1_001, 12);

    let unpaid = block(1_000, vec![TxOutput::new(0, vec![]), TxOutput::new(5_000, vec![0x51])]);
    let paid = block(
        1_000,
        vec![TxOutput::new(0, vec![]), TxOutput::new(4_900, vec![0x51]), TxOutput::new(PAYMENT, net.script(12))],
    );

    assert!(policy.is_block_payee_valid(&unpaid, 1_001));
    net.sporks.set(Spork::MasternodePaymentEnforcement, true);
    assert!(!policy.is_block_payee_valid(&unpaid, 1_001));
    assert!(policy.is_block_payee_valid(&paid, 1_001));

    // Unconfirmed heights and unsynced nodes accept anything.
    assert!(policy.is_block_payee_valid(&unpaid, 1_002));
    net.sync.set_synced(true, false);
    assert!(policy.is_block_payee_valid(&unpaid, 1_001));
}

#[test]
fn test_block_without_reward_transaction() {
    let net = TestNet::new();
    let mut empty = block(1_000, vec![]);
    empty.transactions.truncate(1);
    assert!(!net.policy().is_block_payee_valid(&empty, 1_001));

    net.sporks.set(Spork::MasternodePaymentEnforcement, true);
    assert!(!net.policy().is_block_payee_valid(&empty, 1_001));
}

#[test]
fn test_budget_block_validation() {
    let budget_net = |status| {
        TestNet::build(NetSpec {
            budget: MemoryBudget::new(&[1_001], status, None),
            sporks: vec![Spork::SuperblocksEnabled, Spork::MasternodePaymentEnforcement],
            ..NetSpec::default()
        })
    };
    let reward = vec![TxOutput::new(0, vec![]), TxOutput::new(5_000, vec![0x51])];

    let net = budget_net(TrxValidationStatus::Valid);
    confirm(&net, 1_001, 12);
    assert!(net.policy().is_block_payee_valid(&block(1_000, reward.clone()), 1_001));

    let net = budget_net(TrxValidationStatus::Invalid);
    assert!(net.policy().is_block_payee_valid(&block(1_000, reward.clone()), 1_001));
    net.sporks.set(Spork::BudgetEnforcement, true);
    assert!(!net.policy().is_block_payee_valid(&block(1_000, reward.clone()), 1_001));

    // Not enough budget votes: the masternode payment must be there instead.
    let net = budget_net(TrxValidationStatus::VoteThreshold);
    confirm(&net, 1_001, 12);
    assert!(!net.policy().is_block_payee_valid(&block(1_000, reward), 1_001));
}

#[test]
fn test_block_value_rules() {
    let net = TestNet::new();
    let policy = net.policy();
    let next = block(1_000, vec![]);

    assert!(policy.is_block_value_valid(&next, 100, 100));
    assert!(!policy.is_block_value_valid(&next, 100, 101));

    // Out-of-order block: height comes from its parent.
    assert!(!policy.is_block_value_valid(&block(990, vec![]), 100, 101));
    assert!(!policy.is_block_value_valid(&block(5_000, vec![]), 100, 101));
}

#[test]
fn test_block_value_superblocks() {
    let net = TestNet::build(NetSpec {
        budget: MemoryBudget::new(&[1_001], TrxValidationStatus::Valid, None),
        sporks: vec![Spork::SuperblocksEnabled],
        ..NetSpec::default()
    });
    let policy = net.policy();
    assert!(policy.is_block_value_valid(&block(1_000, vec![]), 100, 500));
    assert!(!policy.is_block_value_valid(&block(999, vec![]), 100, 500));
}

#[test]
fn test_block_value_while_syncing() {
    let config = PaymentsConfig { network: NetworkParams::testnet(), ..PaymentsConfig::default() };
    let net = TestNet::build(NetSpec { config, ..NetSpec::default() });
    net.sync.set_synced(true, false);
    let policy = net.policy();

    // 961 % 144 = 97: start of a budget cycle, superblocks may pay out.
    assert!(policy.is_block_value_valid(&block(960, vec![]), 100, 500));
    // 1001 % 144 = 137
    assert!(!policy.is_block_value_valid(&block(1_000, vec![]), 100, 500));
    assert!(policy.is_block_value_valid(&block(1_000, vec![]), 100, 100));
}

#[test]
fn test_required_payments_prefer_budget() {
    let net = TestNet::build(NetSpec {
        budget: MemoryBudget::new(&[1_002], TrxValidationStatus::Valid, Some((vec![0x52], 77))),
        sporks: vec![Spork::SuperblocksEnabled],
        ..NetSpec::default()
    });
    assert_eq!(net.ledger.admit(net.vote(0, 1_001, 12)), Ok(true));
    let policy = net.policy();

    assert_eq!(policy.required_payments(1_001).len(), 1);
    assert_eq!(policy.required_payments(1_002)[0].address, "52");
    assert!(policy.required_payments(1_003).is_empty());
}

#[test]
fn test_winners_listing() {
    let net = TestNet::new();
    assert_eq!(net.ledger.admit(net.vote(0, 1_001, 12)), Ok(true));
    assert_eq!(net.ledger.admit(net.vote(1, 1_002, 13)), Ok(true));
    let policy = net.policy();

    let winners = query::winners(&policy, 3, None).unwrap();
    assert_eq!(winners.len(), 23);
    assert_eq!(winners[0].height, 997);
    assert_eq!(winners[22].height, 1_019);
    assert_eq!(winners[0].winners[0].address, UNKNOWN_WINNER);
    assert_eq!(winners[4].winners[0].votes, 1);

    let address = rusty_shared_types::script_to_string(&net.script(13));
    let filtered = query::winners(&policy, 3, Some(&address)).unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].height, 1_002);

    assert_eq!(query::next_winners(&policy).unwrap(), vec![(1, net.script(12))]);

    let _busy = net.chain.lock_tip();
    assert!(query::winners(&policy, 3, None).is_none());
}
