//! Masternode payment consensus for Rusty Coin.
//!
//! Masternodes vote on who gets paid in upcoming blocks. [`PaymentLedger`] admits
//! and tallies those votes, [`BlockPayeePolicy`] applies the winners to block
//! templates and incoming blocks, and [`PaymentDb`] snapshots the ledger to disk.

pub mod config;
pub mod context;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod messages;
pub mod network_coordinator;
pub mod persistence;
pub mod policy;
pub mod query;
pub mod tally;
pub mod vote;

pub use config::{NetworkParams, PaymentsConfig, MNPAYMENTS_SIGNATURES_REQUIRED, MNPAYMENTS_SIGNATURES_TOTAL};
pub use context::{MasternodeInfo, PaymentContext, PaymentWinner, Spork, TrxValidationStatus};
pub use error::{PaymentError, PersistenceError};
pub use ledger::{LedgerSnapshot, LedgerSummary, PaymentLedger};
pub use messages::PaymentMessage;
pub use network_coordinator::{PaymentNetworkConfig, PaymentNetworkCoordinator, PaymentNetworkStats};
pub use persistence::{PaymentDb, PaymentDbConfig};
pub use policy::BlockPayeePolicy;
pub use tally::{BlockPayees, PayeeVotes};
pub use vote::{ActiveMasternode, Payee, PaymentVote};
