use serde::{Deserialize, Serialize};

/// Votes a candidate needs before its payment is enforced in blocks.
pub const MNPAYMENTS_SIGNATURES_REQUIRED: u32 = 6;
/// Rank limit for masternodes allowed to vote on a height.
pub const MNPAYMENTS_SIGNATURES_TOTAL: usize = 10;

/// Tunables of the payment consensus engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentsConfig {
    /// Minimum votes for a candidate to be considered confirmed
    pub signatures_required: u32,
    /// Voters must rank within this many places at the reference height
    pub signatures_total: usize,
    /// How far past the tip a vote (or a sync reply) may reach
    pub future_vote_window: u64,
    /// Scale applied to masternode counts for vote windows, sync caps and retention (percent)
    pub population_scale_percent: u64,
    /// Floor of the retention horizon, in blocks
    pub min_retention_blocks: u64,
    /// Upper bound of the "scheduled soon" lookahead, in blocks
    pub schedule_lookahead: u64,
    /// Rank and reference block are taken this many blocks below the voted height
    pub rank_reference_offset: u64,
    /// Misbehaviour score applied to peers for protocol violations
    pub misbehaviour_score: i32,
    /// Allowance added to the masternode count when computing the required payment
    pub masternode_count_drift: usize,
    /// Disable all masternode payment processing
    pub lite_mode: bool,
    pub network: NetworkParams,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            signatures_required: MNPAYMENTS_SIGNATURES_REQUIRED,
            signatures_total: MNPAYMENTS_SIGNATURES_TOTAL,
            future_vote_window: 20,
            population_scale_percent: 125,
            min_retention_blocks: 1000,
            schedule_lookahead: 10,
            rank_reference_offset: 100,
            misbehaviour_score: 20,
            masternode_count_drift: 20,
            lite_mode: false,
            network: NetworkParams::default(),
        }
    }
}

impl PaymentsConfig {
    /// `ceil(count × scale)`, the population-relative bound used throughout the engine.
    pub fn scaled_population(&self, count: usize) -> u64 {
        let scaled = count as u64 * self.population_scale_percent;
        (scaled + 99) / 100
    }

    /// Blocks of history kept behind the current height.
    pub fn retention_horizon(&self, enabled_count: usize) -> u64 {
        self.scaled_population(enabled_count).max(self.min_retention_blocks)
    }
}

/// Chain parameters the payment engine depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkParams {
    /// Message-start bytes of the network, written into snapshots
    pub network_magic: [u8; 4],
    /// Main network applies the one-sync-request-per-peer rule
    pub is_main_network: bool,
    /// Blocks above this height are proof-of-stake (reward in the coinstake)
    pub last_pow_block: u64,
    pub active_protocol_version: u32,
    pub min_protocol_before_enforcement: u32,
    /// Length of the budget payment cycle
    pub budget_cycle_blocks: u64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl NetworkParams {
    pub fn mainnet() -> Self {
        Self {
            network_magic: [0x91, 0xc4, 0xfd, 0xe9],
            is_main_network: true,
            last_pow_block: 200,
            active_protocol_version: 70920,
            min_protocol_before_enforcement: 70910,
            budget_cycle_blocks: 43200,
        }
    }

    pub fn testnet() -> Self {
        Self {
            network_magic: [0x45, 0x76, 0x65, 0xba],
            is_main_network: false,
            last_pow_block: 200,
            active_protocol_version: 70920,
            min_protocol_before_enforcement: 70910,
            budget_cycle_blocks: 144,
        }
    }

    pub fn regtest() -> Self {
        Self {
            network_magic: [0xa1, 0xcf, 0x7e, 0xac],
            is_main_network: false,
            last_pow_block: 250,
            active_protocol_version: 70920,
            min_protocol_before_enforcement: 70910,
            budget_cycle_blocks: 144,
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "mainnet" | "main" => Some(Self::mainnet()),
            "testnet" | "test" => Some(Self::testnet()),
            "regtest" => Some(Self::regtest()),
            _ => None,
        }
    }
}
