use serde::{Deserialize, Serialize};
use crate::Hash;

/// Inventory announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inv {
    pub inv_type: InvType,
    pub hash: Hash,
}

impl Inv {
    pub fn new(inv_type: InvType, hash: Hash) -> Self {
        Inv { inv_type, hash }
    }
}

/// Inventory types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvType {
    /// A masternode payment vote, keyed by its identity hash.
    MasternodeWinner,
}

/// Items reported by the "ssc" sync-status-count message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncItem {
    MasternodeList,
    MasternodeWinners,
    Budget,
}
