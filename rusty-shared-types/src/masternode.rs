use serde::{Serialize, Deserialize};
use std::fmt;

use crate::OutPoint;

/// Collateral tier ("phase") of a masternode. Tiers are numbered from 1;
/// `UNKNOWN_TIER` marks an identity the registry could not place.
pub type Tier = u32;

pub const UNKNOWN_TIER: Tier = 0;

/// Represents the unique identifier for a Masternode, derived from its collateral UTXO.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MasternodeID(pub OutPoint);

impl MasternodeID {
    pub fn collateral(&self) -> &OutPoint {
        &self.0
    }
}

impl From<OutPoint> for MasternodeID {
    fn from(outpoint: OutPoint) -> Self {
        MasternodeID(outpoint)
    }
}

impl fmt::Display for MasternodeID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
