//! Checksummed snapshot file of the payment ledger (`mnpayments.dat`).
//!
//! Layout: `[magic message][network magic: 4 bytes][snapshot][double-SHA256 of all preceding bytes]`.
//! Every field is bincode (fixed-width integers, little endian).

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use bincode::Options;
use log::{info, warn};
use rusty_crypto::hash::double_sha256;
use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;
use crate::ledger::{LedgerSnapshot, PaymentLedger};

pub const DEFAULT_FILE_NAME: &str = "mnpayments.dat";
pub const MAGIC_MESSAGE: &str = "MasternodePayments";

const CHECKSUM_LEN: usize = 32;
const MAX_SNAPSHOT_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentDbConfig {
    pub data_dir: PathBuf,
    pub file_name: String,
    pub magic_message: String,
}

impl Default for PaymentDbConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            file_name: DEFAULT_FILE_NAME.to_string(),
            magic_message: MAGIC_MESSAGE.to_string(),
        }
    }
}

impl PaymentDbConfig {
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(&self.file_name)
    }
}

/// Reads and writes the payment snapshot of one network.
pub struct PaymentDb {
    path: PathBuf,
    magic_message: String,
    network_magic: [u8; 4],
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_SNAPSHOT_BYTES)
}

impl PaymentDb {
    pub fn new(config: &PaymentDbConfig, network_magic: [u8; 4]) -> Self {
        PaymentDb {
            path: config.path(),
            magic_message: config.magic_message.clone(),
            network_magic,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> PersistenceError {
        PersistenceError::Io { path: path.to_path_buf(), source }
    }

    pub fn encode(&self, snapshot: &LedgerSnapshot) -> Result<Vec<u8>, PersistenceError> {
        let mut data = codec()
            .serialize(&self.magic_message)
            .map_err(|e| PersistenceError::MalformedData(e.to_string()))?;
        data.extend_from_slice(&self.network_magic);
        codec()
            .serialize_into(&mut data, snapshot)
            .map_err(|e| PersistenceError::MalformedData(e.to_string()))?;

        let checksum = double_sha256(&data);
        data.extend_from_slice(&checksum);
        Ok(data)
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<LedgerSnapshot, PersistenceError> {
        if bytes.len() < CHECKSUM_LEN {
            return Err(PersistenceError::CorruptedData);
        }
        let (data, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
        if double_sha256(data) != checksum {
            return Err(PersistenceError::CorruptedData);
        }

        let mut cursor = Cursor::new(data);
        let magic: String = codec()
            .deserialize_from(&mut cursor)
            .map_err(|_| PersistenceError::WrongMagic)?;
        if magic != self.magic_message {
            return Err(PersistenceError::WrongMagic);
        }

        let mut network_magic = [0u8; 4];
        cursor
            .read_exact(&mut network_magic)
            .map_err(|e| PersistenceError::MalformedData(e.to_string()))?;
        if network_magic != self.network_magic {
            return Err(PersistenceError::WrongNetwork);
        }

        codec()
            .deserialize_from(&mut cursor)
            .map_err(|e| PersistenceError::MalformedData(e.to_string()))
    }

    /// Reads the snapshot without touching any ledger.
    pub fn read(&self) -> Result<LedgerSnapshot, PersistenceError> {
        let start = Instant::now();
        let bytes = fs::read(&self.path).map_err(|e| self.io_error(&self.path, e))?;
        let snapshot = self.decode(&bytes)?;
        info!(
            target: "mnpayments",
            "Loaded info from {}  {}ms",
            self.path.display(),
            start.elapsed().as_millis()
        );
        Ok(snapshot)
    }

    /// Writes the ledger to a temporary file next to the target and renames it into place.
    pub fn write(&self, ledger: &PaymentLedger) -> Result<(), PersistenceError> {
        let start = Instant::now();
        let data = self.encode(&ledger.snapshot())?;

        let tmp_path = self.path.with_extension("dat.new");
        let mut file = fs::File::create(&tmp_path).map_err(|e| self.io_error(&tmp_path, e))?;
        file.write_all(&data).map_err(|e| self.io_error(&tmp_path, e))?;
        file.sync_all().map_err(|e| self.io_error(&tmp_path, e))?;
        drop(file);
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(&self.path, e))?;

        info!(
            target: "mnpayments",
            "Written info to {}  {}ms",
            self.path.display(),
            start.elapsed().as_millis()
        );
        Ok(())
    }

    /// Loads the snapshot into `ledger`. Unless `dry_run` is set, stale entries
    /// are pruned against the current tip right away. Malformed payloads leave
    /// the ledger empty.
    pub fn load(&self, ledger: &PaymentLedger, dry_run: bool) -> Result<(), PersistenceError> {
        let snapshot = match self.read() {
            Ok(snapshot) => snapshot,
            Err(e @ PersistenceError::MalformedData(_)) => {
                ledger.clear();
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        ledger.restore(snapshot);
        info!(target: "mnpayments", "Masternode payments loaded: {}", ledger.summary());
        if !dry_run {
            ledger.clean_payment_list();
            info!(target: "mnpayments", "Masternode payments after cleanup: {}", ledger.summary());
        }
        Ok(())
    }

    /// Saves the ledger unless an existing file of another format or network
    /// is in the way. A missing or malformed file is simply replaced.
    pub fn dump(&self, ledger: &PaymentLedger) -> Result<(), PersistenceError> {
        let start = Instant::now();
        info!(target: "mnpayments", "Verifying {} format...", self.path.display());
        match self.read() {
            Ok(_) => {}
            Err(e) if e.is_missing_file() => {
                info!(target: "mnpayments", "Missing payments file {}, will try to recreate", self.path.display());
            }
            Err(PersistenceError::MalformedData(reason)) => {
                warn!(target: "mnpayments", "Error reading {} ({}), will try to recreate", self.path.display(), reason);
            }
            Err(e) => {
                warn!(target: "mnpayments", "Error reading {}: {}, refusing to overwrite", self.path.display(), e);
                return Err(e);
            }
        }

        info!(target: "mnpayments", "Writing info to {}...", self.path.display());
        self.write(ledger)?;
        info!(target: "mnpayments", "Payments dump finished  {}ms", start.elapsed().as_millis());
        Ok(())
    }
}
