//! The permissioned storage network mail is layered on
//!
//! [`Network`] is the capability-oriented surface the rest of the crate
//!  consumes: mutable data containers with versioned entries and
//!  per-principal permissions, plus content-addressed immutable data.
//!  [`MemoryNetwork`] is a local implementation whose state can be
//!  persisted to a vault file.

mod blobs_store;
mod error;
mod memory;
mod provider;
mod types;

pub use blobs_store::{BlobsStore, BlobsStoreError};
pub use error::NetworkError;
pub use memory::MemoryNetwork;
pub use provider::Network;
pub use types::{
    AccessContainer, Action, Entries, EntryAction, EntryActions, MDataInfo, MdAddress, MdKind,
    Metadata, NetworkState, NetworkStatusCallback, NewMutableData, PermissionSet, User, Value,
    XorName, XOR_NAME_LEN,
};
