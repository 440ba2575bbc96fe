//! A payment ledger detached from any chain, for working on snapshot files.

use std::sync::Arc;

use rusty_masternode::context::PaymentContext;
use rusty_masternode::memory::{FlatRewardSchedule, MemoryBudget, MemoryChain, MemoryRegistry, StaticSporks, StaticSync};
use rusty_masternode::{PaymentLedger, PaymentsConfig};

/// Ledger without chain tip or registry: nothing is pruned and no vote can be admitted,
/// so loaded snapshots pass through unchanged.
pub fn offline_ledger(config: PaymentsConfig) -> PaymentLedger {
    let ctx = PaymentContext {
        chain: Arc::new(MemoryChain::new(0)),
        registry: Arc::new(MemoryRegistry::new()),
        schedule: Arc::new(FlatRewardSchedule::new(Vec::new())),
        budget: Arc::new(MemoryBudget::none()),
        sporks: Arc::new(StaticSporks::default()),
        sync: Arc::new(StaticSync::new(false, false)),
    };
    PaymentLedger::new(config, ctx)
}
