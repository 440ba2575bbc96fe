//! Payment vote record: a masternode's signed claim of who should be paid at a height.

use std::fmt;

use log::debug;
use rusty_crypto::hash::blake3_hash;
use rusty_crypto::signature::verify_signature_bytes;
use rusty_crypto::RustyKeyPair;
use rusty_shared_types::{script_to_string, Hash, Inv, InvType, MasternodeID, OutPoint, PublicKey};
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;

const SIGNING_DOMAIN: &[u8] = b"mnpayments/vote";

/// Who a vote proposes to pay. Older peers name the payout script directly,
/// newer peers name the payee's collateral and let the receiver resolve it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Payee {
    DirectScript(Vec<u8>),
    CollateralReference(OutPoint),
}

impl Payee {
    /// Appends the payee in bincode's fixed-int layout: variant index, then the field.
    fn write_preimage(&self, out: &mut Vec<u8>) {
        match self {
            Payee::DirectScript(script) => {
                out.extend_from_slice(&0u32.to_le_bytes());
                out.extend_from_slice(&(script.len() as u64).to_le_bytes());
                out.extend_from_slice(script);
            }
            Payee::CollateralReference(collateral) => {
                out.extend_from_slice(&1u32.to_le_bytes());
                write_outpoint(out, collateral);
            }
        }
    }
}

fn write_outpoint(out: &mut Vec<u8>, outpoint: &OutPoint) {
    out.extend_from_slice(&outpoint.txid);
    out.extend_from_slice(&outpoint.vout.to_le_bytes());
}

impl fmt::Display for Payee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payee::DirectScript(script) => write!(f, "{}", script_to_string(script)),
            Payee::CollateralReference(collateral) => write!(f, "collateral:{}", collateral),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentVote {
    pub voter: MasternodeID,
    pub block_height: u64,
    pub payee: Payee,
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
}

impl PaymentVote {
    pub fn new(voter: MasternodeID, block_height: u64, payee: Payee) -> Self {
        PaymentVote { voter, block_height, payee, signature: Vec::new() }
    }

    /// Dedup key: digest over (payee, height, voter). The signature is not part of it,
    /// so two encodings of the same claim collapse into one fact.
    pub fn identity(&self) -> Hash {
        blake3_hash(&self.identity_preimage())
    }

    fn identity_preimage(&self) -> Vec<u8> {
        let mut preimage = Vec::with_capacity(96);
        self.payee.write_preimage(&mut preimage);
        preimage.extend_from_slice(&self.block_height.to_le_bytes());
        write_outpoint(&mut preimage, self.voter.collateral());
        preimage
    }

    fn signing_message(&self) -> Vec<u8> {
        let mut message = Vec::with_capacity(SIGNING_DOMAIN.len() + 96);
        message.extend_from_slice(SIGNING_DOMAIN);
        write_outpoint(&mut message, self.voter.collateral());
        message.extend_from_slice(&self.block_height.to_le_bytes());
        self.payee.write_preimage(&mut message);
        message
    }

    /// Signs the vote with `keypair`, which must be the voter's declared key.
    pub fn sign(&mut self, keypair: &RustyKeyPair, declared_key: &PublicKey) -> Result<(), PaymentError> {
        if keypair.public_key_bytes() != *declared_key {
            return Err(PaymentError::Signing(format!(
                "key {} does not belong to masternode {}",
                hex::encode(keypair.public_key_bytes()),
                self.voter
            )));
        }

        let message = self.signing_message();
        self.signature = keypair.sign(&message).to_bytes().to_vec();

        verify_signature_bytes(declared_key, &message, &self.signature)
            .map_err(|e| PaymentError::Signing(e.to_string()))
    }

    pub fn verify_signature(&self, declared_key: &PublicKey) -> bool {
        match verify_signature_bytes(declared_key, &self.signing_message(), &self.signature) {
            Ok(()) => true,
            Err(e) => {
                debug!(target: "mnpayments", "vote {} from {} failed verification: {}", hex::encode(self.identity()), self.voter, e);
                false
            }
        }
    }

    pub fn inv(&self) -> Inv {
        Inv::new(InvType::MasternodeWinner, self.identity())
    }
}

impl fmt::Display for PaymentVote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.voter, self.block_height, self.payee)
    }
}

/// The local masternode, when this node runs one.
#[derive(Debug)]
pub struct ActiveMasternode {
    pub id: MasternodeID,
    pub keypair: RustyKeyPair,
}
