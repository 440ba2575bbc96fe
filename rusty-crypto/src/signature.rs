// rusty-crypto/src/signature.rs

use std::convert::TryFrom;

use ed25519_dalek::{PublicKey, Signature, SignatureError, Verifier};

use crate::error::CryptoError;
use crate::keypair::RustyKeyPair;

pub fn sign_message(keypair: &RustyKeyPair, message: &[u8]) -> Signature {
    keypair.sign(message)
}

pub fn verify_signature(public_key: &PublicKey, message: &[u8], signature: &Signature) -> Result<(), SignatureError> {
    public_key.verify(message, signature)
}

/// Verifies a signature given as raw bytes against a raw 32-byte public key.
pub fn verify_signature_bytes(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let public_key = PublicKey::from_bytes(public_key)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let signature = Signature::try_from(signature)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    verify_signature(&public_key, message, &signature).map_err(|_| CryptoError::VerificationFailed)
}
