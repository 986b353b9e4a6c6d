use crate::crypto::PublicKey;

use super::blobs_store::BlobsStoreError;
use super::types::{Action, MdAddress, User, XorName};

/// Errors reported by the storage network
#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("network error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("no such mutable data: {0}")]
    NoSuchData(MdAddress),
    #[error("mutable data already exists: {0}")]
    DataExists(MdAddress),
    #[error("no such entry: {0}")]
    NoSuchEntry(String),
    #[error("entry already exists: {0}")]
    EntryExists(String),
    #[error("no permissions recorded for {0:?}")]
    NoSuchUser(User),
    #[error("access denied: {requester} may not {action} on {address}")]
    AccessDenied {
        requester: PublicKey,
        action: Action,
        address: MdAddress,
    },
    /// A versioned mutation named the wrong successor version
    #[error("invalid successor for entry {key} on {address}: entry is at version {current}, requested {requested}")]
    InvalidSuccessor {
        address: MdAddress,
        key: String,
        current: u64,
        requested: u64,
    },
    #[error("invalid permissions version on {address}: at {current}, requested {requested}")]
    InvalidPermissionsVersion {
        address: MdAddress,
        current: u64,
        requested: u64,
    },
    #[error("no such immutable data: {0}")]
    NoSuchIData(XorName),
    /// The app key is unknown to the network or its access was revoked
    #[error("app {0} is not authorised")]
    UnknownApp(PublicKey),
    #[error("disconnected from the network")]
    Disconnected,
    #[error("blobs store error: {0}")]
    BlobsStore(#[from] BlobsStoreError),
    #[error("vault persistence error: {0}")]
    Vault(#[from] bincode::Error),
    #[error("vault i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Render an entry key for error messages and logs
pub(crate) fn display_key(key: &[u8]) -> String {
    match std::str::from_utf8(key) {
        Ok(s) if !s.is_empty() && s.chars().all(|c| !c.is_control()) => s.to_string(),
        _ => format!("0x{}", hex::encode(key)),
    }
}
