use serde::{Deserialize, Serialize};
use std::fmt;

pub type PublicKey = [u8; 32];
pub type Hash = [u8; 32];
pub type PubKeyHash = [u8; 20];

pub mod masternode;
pub mod p2p;

pub use masternode::{MasternodeID, Tier, UNKNOWN_TIER};
pub use p2p::{Inv, InvType};

/// Script opcodes that payout scripts are built from.
pub mod opcodes {
    pub const OP_DUP: u8 = 0x76;
    pub const OP_HASH160: u8 = 0xa9;
    pub const OP_EQUALVERIFY: u8 = 0x88;
    pub const OP_CHECKSIG: u8 = 0xac;
    pub const OP_RETURN: u8 = 0x6a;
    /// Marks an output as a zerocoin mint. Mint outputs carry a fixed denomination.
    pub const OP_ZEROCOINMINT: u8 = 0xc1;
}

/// Represents a reference to a specific transaction output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// The transaction ID (hash) of the transaction containing the output.
    pub txid: [u8; 32],
    /// The index of the output within that transaction.
    pub vout: u32,
}

impl OutPoint {
    pub fn new(txid: [u8; 32], vout: u32) -> Self {
        OutPoint { txid, vout }
    }
}

/// Short form `txid-vout`, used in log lines and RPC output.
impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", hex::encode(self.txid), self.vout)
    }
}

/// Represents a transaction input, referencing a previous transaction's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// The `OutPoint` referencing the output being spent.
    pub previous_output: OutPoint,
    /// The script signature, providing proof of ownership.
    pub script_sig: Vec<u8>,
    pub sequence: u32,
}

/// Represents a transaction output, specifying a value and a locking script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// The value of the output in satoshis.
    pub value: u64,
    /// The locking script (scriptPubKey) that defines the conditions for spending this output.
    pub script_pubkey: Vec<u8>,
    /// Optional memo field for arbitrary data, typically for OP_RETURN outputs.
    pub memo: Option<Vec<u8>>,
}

impl TxOutput {
    /// Creates a new `TxOutput` without a memo.
    pub fn new(value: u64, script_pubkey: Vec<u8>) -> Self {
        TxOutput { value, script_pubkey, memo: None }
    }

    /// Extracts the public key hash from a P2PKH script, if applicable.
    pub fn extract_public_key_hash(&self) -> Option<PubKeyHash> {
        // P2PKH script: OP_DUP OP_HASH160 <20-byte-hash> OP_EQUALVERIFY OP_CHECKSIG
        let script = &self.script_pubkey;
        if script.len() == 25
            && script[0] == opcodes::OP_DUP
            && script[1] == opcodes::OP_HASH160
            && script[2] == 0x14 // PUSHDATA(20)
            && script[23] == opcodes::OP_EQUALVERIFY
            && script[24] == opcodes::OP_CHECKSIG
        {
            let mut public_key_hash = [0u8; 20];
            public_key_hash.copy_from_slice(&script[3..23]);
            Some(public_key_hash)
        } else {
            None
        }
    }

    /// Whether this output mints a zerocoin. Mint outputs must never have their value adjusted.
    pub fn is_zerocoin_mint(&self) -> bool {
        self.script_pubkey.first() == Some(&opcodes::OP_ZEROCOINMINT)
    }
}

/// Builds the standard pay-to-pubkey-hash locking script for `hash`.
pub fn p2pkh_script(hash: &PubKeyHash) -> Vec<u8> {
    let mut script = Vec::with_capacity(25);
    script.push(opcodes::OP_DUP);
    script.push(opcodes::OP_HASH160);
    script.push(0x14);
    script.extend_from_slice(hash);
    script.push(opcodes::OP_EQUALVERIFY);
    script.push(opcodes::OP_CHECKSIG);
    script
}

/// Renders a script for diagnostics: the hash for P2PKH scripts, raw hex otherwise.
pub fn script_to_string(script: &[u8]) -> String {
    let output = TxOutput::new(0, script.to_vec());
    match output.extract_public_key_hash() {
        Some(hash) => format!("p2pkh:{}", hex::encode(hash)),
        None if script.is_empty() => "<empty>".to_string(),
        None => hex::encode(script),
    }
}

/// Represents the different types of transactions that can carry block rewards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Transaction {
    Standard {
        version: u32,
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
        lock_time: u32,
    },
    /// First transaction of a proof-of-work block.
    Coinbase {
        version: u32,
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
        lock_time: u32,
    },
    /// Second transaction of a proof-of-stake block. Output 0 is the empty marker output,
    /// output 1 returns the stake plus reward.
    Coinstake {
        version: u32,
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
        lock_time: u32,
    },
}

impl Transaction {
    /// Returns a slice of `TxOutput`s for the transaction.
    pub fn get_outputs(&self) -> &[TxOutput] {
        match self {
            Transaction::Standard { outputs, .. } => outputs,
            Transaction::Coinbase { outputs, .. } => outputs,
            Transaction::Coinstake { outputs, .. } => outputs,
        }
    }

    /// Returns the outputs for modification, regardless of the transaction type.
    pub fn get_outputs_mut(&mut self) -> &mut Vec<TxOutput> {
        match self {
            Transaction::Standard { outputs, .. } => outputs,
            Transaction::Coinbase { outputs, .. } => outputs,
            Transaction::Coinstake { outputs, .. } => outputs,
        }
    }
}

/// Represents a block header in the blockchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub previous_block_hash: [u8; 32],
    pub merkle_root: [u8; 32],
    pub timestamp: u64,
    pub nonce: u64,
}

/// Represents a block in the blockchain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    /// The transaction that carries the block reward: the coinstake for proof-of-stake
    /// blocks (past the last proof-of-work height), otherwise the coinbase.
    pub fn reward_transaction(&self, height: u64, last_pow_block: u64) -> Option<&Transaction> {
        let index = if height > last_pow_block { 1 } else { 0 };
        self.transactions.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_p2pkh_roundtrip() {
        let hash = [7u8; 20];
        let output = TxOutput::new(10, p2pkh_script(&hash));
        assert_eq!(output.extract_public_key_hash(), Some(hash));
        assert!(!output.is_zerocoin_mint());
        assert_eq!(script_to_string(&output.script_pubkey), format!("p2pkh:{}", hex::encode(hash)));
    }

    #[test]
    fn test_zerocoin_mint_detection() {
        let mint = TxOutput::new(100, vec![opcodes::OP_ZEROCOINMINT, 0x01, 0x02]);
        assert!(mint.is_zerocoin_mint());
        assert_eq!(mint.extract_public_key_hash(), None);
    }

    #[test]
    fn test_reward_transaction_selection() {
        let coinbase = Transaction::Coinbase { version: 1, inputs: vec![], outputs: vec![], lock_time: 0 };
        let coinstake = Transaction::Coinstake { version: 1, inputs: vec![], outputs: vec![], lock_time: 0 };
        let block = Block {
            header: BlockHeader { version: 1, previous_block_hash: [0; 32], merkle_root: [0; 32], timestamp: 0, nonce: 0 },
            transactions: vec![coinbase.clone(), coinstake.clone()],
        };

        assert_eq!(block.reward_transaction(200, 200), Some(&coinbase));
        assert_eq!(block.reward_transaction(201, 200), Some(&coinstake));
    }

    #[test]
    fn test_outpoint_display() {
        let outpoint = OutPoint::new([0xab; 32], 3);
        assert!(outpoint.to_string().ends_with("-3"));
        assert!(outpoint.to_string().starts_with("abab"));
    }
}
