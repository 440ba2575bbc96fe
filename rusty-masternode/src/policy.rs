//! Applies the ledger's winners to block templates and to received blocks.

use std::sync::Arc;

use log::{debug, info, warn};
use rusty_shared_types::{script_to_string, Block, Transaction, TxOutput};

use crate::context::{PaymentWinner, Spork, TrxValidationStatus};
use crate::ledger::PaymentLedger;

/// Heights within this many blocks of a budget cycle start may carry superblocks.
const BUDGET_CYCLE_GRACE_BLOCKS: u64 = 100;

pub struct BlockPayeePolicy {
    ledger: Arc<PaymentLedger>,
}

impl BlockPayeePolicy {
    pub fn new(ledger: Arc<PaymentLedger>) -> Self {
        BlockPayeePolicy { ledger }
    }

    pub fn ledger(&self) -> &Arc<PaymentLedger> {
        &self.ledger
    }

    fn superblock_at(&self, height: u64) -> bool {
        let ctx = self.ledger.context();
        ctx.sporks.is_active(Spork::SuperblocksEnabled) && ctx.budget.is_budget_payment_block(height)
    }

    /// Adds the payee outputs for the block after the current tip.
    pub fn fill_block_payee(&self, tx: &mut Transaction, fees: u64, is_proof_of_stake: bool) {
        let tip = match self.ledger.context().chain.try_tip_height() {
            Some(tip) => tip,
            None => return,
        };

        if self.superblock_at(tip + 1) {
            self.ledger.context().budget.fill_block_payee(tx, fees, is_proof_of_stake);
        } else {
            self.fill_masternode_payees(tx, tip, is_proof_of_stake);
        }
    }

    /// One output per tier, taken out of the coinbase (or the stake output for
    /// proof-of-stake blocks). Without a voted winner the tier's top-ranked
    /// masternode is paid.
    pub fn fill_masternode_payees(&self, tx: &mut Transaction, tip: u64, is_proof_of_stake: bool) {
        let ctx = self.ledger.context();
        let height = tip + 1;
        let block_value = ctx.chain.block_value(tip);
        let base_index = if is_proof_of_stake { 1 } else { 0 };

        for tier in 1..=ctx.schedule.tier_count(height) {
            let payee = self.ledger.resolve_payee(height, tier).or_else(|| {
                ctx.registry
                    .current_winner_in_tier(tier, height)
                    .map(|info| info.payout_script())
            });
            let payment = ctx.schedule.masternode_payment(height, tier, block_value, 0);
            let outputs = tx.get_outputs_mut();

            match payee {
                Some(script) => {
                    info!(
                        target: "masternode",
                        "Masternode payment of {} to {} (tier {})",
                        payment,
                        script_to_string(&script),
                        tier
                    );
                    outputs.push(TxOutput::new(payment, script));
                    if let Some(base) = outputs.get_mut(base_index) {
                        if !base.is_zerocoin_mint() {
                            base.value = base.value.saturating_sub(payment);
                        }
                    }
                }
                None => {
                    debug!(target: "masternode", "Failed to detect masternode to pay in tier {}", tier);
                    if !is_proof_of_stake {
                        if let Some(base) = outputs.get_mut(0) {
                            base.value = block_value.saturating_sub(payment);
                        }
                    }
                }
            }
        }
    }

    /// Whether the reward transaction of `block` pays what the network agreed on.
    /// Unsynced nodes and disabled enforcement accept the block.
    pub fn is_block_payee_valid(&self, block: &Block, height: u64) -> bool {
        let ctx = self.ledger.context();
        if !ctx.sync.is_synced() {
            debug!(target: "mnpayments", "Client not synced, skipping block payee checks");
            return true;
        }

        // A block missing its reward transaction is malformed; enforcement sporks do not apply.
        let tx = match block.reward_transaction(height, self.ledger.config().network.last_pow_block) {
            Some(tx) => tx,
            None => {
                warn!(target: "mnpayments", "block at {} has no reward transaction", height);
                return false;
            }
        };

        if self.superblock_at(height) {
            match ctx.budget.is_transaction_valid(tx, height) {
                TrxValidationStatus::Valid => return true,
                TrxValidationStatus::Invalid => {
                    warn!(target: "masternode", "Invalid budget payment detected at {}", height);
                    if ctx.sporks.is_active(Spork::BudgetEnforcement) {
                        return false;
                    }
                    info!(target: "masternode", "Budget enforcement is disabled, accepting block");
                }
                // A masternode gets paid in these cases, checked below.
                TrxValidationStatus::DoublePayment | TrxValidationStatus::VoteThreshold => {}
            }
        }

        if self.ledger.is_transaction_valid(tx, height) {
            return true;
        }
        warn!(target: "masternode", "Invalid mn payment detected at {}", height);

        if ctx.sporks.is_active(Spork::MasternodePaymentEnforcement) {
            return false;
        }
        info!(target: "masternode", "Masternode payment enforcement is disabled, accepting block");
        true
    }

    /// Whether `minted` is acceptable for `block` given the `expected` value.
    pub fn is_block_value_valid(&self, block: &Block, expected: u64, minted: u64) -> bool {
        let ctx = self.ledger.context();
        let tip = match ctx.chain.try_tip_height() {
            Some(tip) => tip,
            None => return true,
        };

        let previous = &block.header.previous_block_hash;
        let height = if ctx.chain.block_hash(tip).as_ref() == Some(previous) {
            tip + 1
        } else {
            match ctx.chain.height_of(previous) {
                Some(height) => height + 1,
                None => {
                    warn!(target: "masternode", "IsBlockValueValid: couldn't find previous block");
                    0
                }
            }
        };

        if !ctx.sync.is_synced() {
            let cycle = self.ledger.config().network.budget_cycle_blocks.max(1);
            return height % cycle < BUDGET_CYCLE_GRACE_BLOCKS || minted <= expected;
        }

        if !ctx.sporks.is_active(Spork::SuperblocksEnabled) {
            return minted <= expected;
        }

        // Superblock values are checked with the budget itself.
        ctx.budget.is_budget_payment_block(height) || minted <= expected
    }

    /// Payments expected at `height`, from the budget on superblocks.
    pub fn required_payments(&self, height: u64) -> Vec<PaymentWinner> {
        if self.superblock_at(height) {
            return self.ledger.context().budget.required_payments(height);
        }
        self.ledger.required_payments(height)
    }
}
