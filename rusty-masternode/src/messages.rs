use rusty_shared_types::p2p::SyncItem;
use serde::{Deserialize, Serialize};

use crate::vote::PaymentVote;

pub const MSG_GET_PAYMENT_VOTES: &str = "mnget";
pub const MSG_PAYMENT_VOTE: &str = "mnw";
pub const MSG_SYNC_STATUS_COUNT: &str = "ssc";

/// Wire messages of the payment sync protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMessage {
    /// Ask a peer for the votes it knows about, at most `count_needed` blocks back.
    GetPaymentVotes { count_needed: u64 },
    PaymentVote(PaymentVote),
    /// Sent after a sync reply, carrying how many items were announced.
    SyncStatusCount { item: SyncItem, count: u64 },
}

impl PaymentMessage {
    pub fn command(&self) -> &'static str {
        match self {
            PaymentMessage::GetPaymentVotes { .. } => MSG_GET_PAYMENT_VOTES,
            PaymentMessage::PaymentVote(_) => MSG_PAYMENT_VOTE,
            PaymentMessage::SyncStatusCount { .. } => MSG_SYNC_STATUS_COUNT,
        }
    }
}
