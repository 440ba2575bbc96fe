//! Cryptographic primitives for Rusty Coin

pub mod error;
pub mod hash;
pub mod keypair;
pub mod signature;

pub use error::CryptoError;
pub use keypair::RustyKeyPair;
