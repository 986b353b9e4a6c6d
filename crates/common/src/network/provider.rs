use async_trait::async_trait;

use crate::crypto::PublicKey;

use super::error::NetworkError;
use super::types::{
    AccessContainer, Entries, EntryActions, MdAddress, NetworkStatusCallback, NewMutableData,
    PermissionSet, User, Value, XorName,
};

/// Capability-oriented storage network
///
/// Every mutable data request names the `requester` key the network
///  checks permissions against. Writes are version gated: entry mutations
///  and permission changes must name the successor version, so concurrent
///  writers coordinate through the network rather than local locks.
#[async_trait]
pub trait Network: Send + Sync + std::fmt::Debug + Clone + 'static {
    /// Create a container at its address, owned by `data.owner`
    ///
    /// Should fail with `Err(NetworkError::DataExists)` if the address is
    ///  already taken.
    async fn put_mdata(&self, requester: &PublicKey, data: NewMutableData)
        -> Result<(), NetworkError>;

    /// Fetch one entry, tombstones included
    async fn get_mdata_value(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
        key: &[u8],
    ) -> Result<Value, NetworkError>;

    /// Fetch every entry of a container in one request
    async fn list_mdata_entries(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
    ) -> Result<Entries, NetworkError>;

    async fn list_mdata_keys(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
    ) -> Result<Vec<Vec<u8>>, NetworkError> {
        Ok(self
            .list_mdata_entries(requester, address)
            .await?
            .into_keys()
            .collect())
    }

    /// Apply a batch of entry mutations atomically
    ///
    /// Should fail with the following errors to be considered correct:
    /// * `Err(NetworkError::AccessDenied)` - requester lacks the action's permission
    /// * `Err(NetworkError::EntryExists)` - insert over an existing key
    /// * `Err(NetworkError::NoSuchEntry)` - update/remove of a missing key
    /// * `Err(NetworkError::InvalidSuccessor)` - stale or skipped version
    async fn mutate_mdata_entries(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
        actions: EntryActions,
    ) -> Result<(), NetworkError>;

    async fn list_user_permissions(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
        user: &User,
    ) -> Result<PermissionSet, NetworkError>;

    /// Replace a principal's permission set; `version` must be the
    ///  successor of the container's permissions version
    async fn set_user_permissions(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
        user: User,
        permissions: PermissionSet,
        version: u64,
    ) -> Result<(), NetworkError>;

    /// Store immutable content, returning its content address
    async fn put_idata(&self, data: Vec<u8>) -> Result<XorName, NetworkError>;

    async fn get_idata(&self, name: &XorName) -> Result<Vec<u8>, NetworkError>;

    /// Check that `app` holds a live authorisation
    ///
    /// Fails with `Err(NetworkError::UnknownApp)` for revoked or never
    ///  granted app keys.
    async fn connect(&self, app: &PublicKey) -> Result<(), NetworkError>;

    /// The containers currently granted to `app`
    async fn access_container(&self, app: &PublicKey) -> Result<AccessContainer, NetworkError>;

    async fn reconnect(&self) -> Result<(), NetworkError>;

    /// Register an observer for connection state changes
    fn subscribe(&self, callback: NetworkStatusCallback);
}
