//! Masternode key pairs rebuilt from stored secrets.

use ed25519_dalek::{Keypair, PublicKey, SecretKey, Signature, Signer};
use rusty_shared_types::{p2pkh_script, PublicKey as PublicKeyBytes};

use crate::error::CryptoError;
use crate::hash::hash160;

/// Represents a cryptographic key pair (public and secret key).
pub struct RustyKeyPair {
    keypair: Keypair,
}

impl RustyKeyPair {
    /// Rebuilds a key pair from its 32-byte secret.
    pub fn from_secret_bytes(secret: &[u8]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_bytes(secret)
            .map_err(|e| CryptoError::InvalidSecretKey(e.to_string()))?;
        let public = PublicKey::from(&secret);
        Ok(RustyKeyPair { keypair: Keypair { secret, public } })
    }

    pub fn public_key_bytes(&self) -> PublicKeyBytes {
        self.keypair.public.to_bytes()
    }

    /// P2PKH script paying to this key.
    pub fn payout_script(&self) -> Vec<u8> {
        p2pkh_script(&hash160(&self.public_key_bytes()))
    }

    /// Signs the given message with the secret key.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign(message)
    }
}

impl std::fmt::Debug for RustyKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustyKeyPair")
            .field("public", &hex::encode(self.public_key_bytes()))
            .finish()
    }
}
