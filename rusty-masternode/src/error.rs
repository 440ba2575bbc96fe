use std::path::PathBuf;

use rusty_shared_types::{Hash, MasternodeID, Tier};
use thiserror::Error;

use crate::vote::Payee;

fn format_hash(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Why a payment vote was not admitted, or why the local node could not produce one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Vote {} already seen", format_hash(.0))]
    DuplicateVote(Hash),
    #[error("Masternode {voter} already voted for tier {tier} at height {height}")]
    ReplayOrDoubleVote { voter: MasternodeID, tier: Tier, height: u64 },
    #[error("Vote height {height} outside window [{first}, {last}]")]
    OutOfWindow { height: u64, first: u64, last: u64 },
    #[error("Unknown masternode {0}")]
    UnknownVoter(MasternodeID),
    #[error("Could not resolve payee {0:?}")]
    UnknownPayee(Payee),
    #[error("Bad signature from masternode {0}")]
    BadSignature(MasternodeID),
    #[error("Masternode {voter} is not in the top {limit} (rank {rank:?})")]
    NotEligible { voter: MasternodeID, rank: Option<usize>, limit: usize },
    #[error("Masternode protocol too old {version} - req {required}")]
    ProtocolTooOld { version: u32, required: u32 },
    #[error("Chain state is busy or has no tip")]
    ChainBusy,
    #[error("No block known at reference height {0}")]
    UnknownBlock(u64),
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Local node is not a registered masternode")]
    NotAMasternode,
}

/// Failures of the payment snapshot codec. None of these are fatal to consensus:
/// the ledger restarts empty and is rebuilt from network sync.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Checksum mismatch, data corrupted")]
    CorruptedData,
    #[error("Invalid masternode payment cache magic message")]
    WrongMagic,
    #[error("Invalid network magic number")]
    WrongNetwork,
    #[error("Malformed payment data: {0}")]
    MalformedData(String),
}

impl PersistenceError {
    pub fn is_missing_file(&self) -> bool {
        matches!(self, PersistenceError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}
