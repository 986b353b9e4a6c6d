use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;

use super::blobs_store::BlobsStore;
use super::error::{display_key, NetworkError};
use super::provider::Network;
use super::types::{
    AccessContainer, Action, Entries, EntryAction, EntryActions, MdAddress, MdKind, Metadata,
    NetworkState, NetworkStatusCallback, NewMutableData, PermissionSet, User, Value, XorName,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MutableData {
    kind: MdKind,
    owner: PublicKey,
    entries: Entries,
    permissions: BTreeMap<User, PermissionSet>,
    permissions_version: u64,
    metadata: Option<Metadata>,
}

impl MutableData {
    fn allows(&self, requester: &PublicKey, action: Action) -> bool {
        if self.owner == *requester {
            return true;
        }
        [User::Key(*requester), User::Anyone]
            .iter()
            .filter_map(|user| self.permissions.get(user))
            .any(|set| set.is_allowed(action))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AppRecord {
    owner: PublicKey,
    revoked: bool,
    access: AccessContainer,
}

/// The persisted part of the network: all mutable data plus the app
///  registry the authenticator maintains
#[derive(Debug, Default, Serialize, Deserialize)]
struct VaultState {
    data: BTreeMap<MdAddress, MutableData>,
    apps: BTreeMap<PublicKey, AppRecord>,
}

struct MemoryNetworkInner {
    vault: VaultState,
    connected: bool,
    observers: Vec<NetworkStatusCallback>,
}

impl MemoryNetworkInner {
    fn ensure_connected(&self) -> Result<(), NetworkError> {
        if self.connected {
            Ok(())
        } else {
            Err(NetworkError::Disconnected)
        }
    }

    /// Requests signed by a revoked app key are refused outright
    fn admit(&self, requester: &PublicKey) -> Result<(), NetworkError> {
        self.ensure_connected()?;
        match self.vault.apps.get(requester) {
            Some(record) if record.revoked => Err(NetworkError::UnknownApp(*requester)),
            _ => Ok(()),
        }
    }

    fn data(&self, address: &MdAddress) -> Result<&MutableData, NetworkError> {
        self.vault
            .data
            .get(address)
            .ok_or(NetworkError::NoSuchData(*address))
    }

    fn readable(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
    ) -> Result<&MutableData, NetworkError> {
        let data = self.data(address)?;
        if data.kind == MdKind::Private && !data.allows(requester, Action::Read) {
            return Err(NetworkError::AccessDenied {
                requester: *requester,
                action: Action::Read,
                address: *address,
            });
        }
        Ok(data)
    }

    fn live_app(&self, app: &PublicKey) -> Result<&AppRecord, NetworkError> {
        self.vault
            .apps
            .get(app)
            .filter(|record| !record.revoked)
            .ok_or(NetworkError::UnknownApp(*app))
    }
}

/// In-memory storage network
///
/// Mutable data lives in a lock-guarded map and can be persisted to a
///  `bincode` vault file; immutable data goes to a [`BlobsStore`].
///  Besides the [`Network`] trait it exposes the owner-side operations an
///  authenticator performs (registering and revoking apps).
#[derive(Clone)]
pub struct MemoryNetwork {
    inner: Arc<RwLock<MemoryNetworkInner>>,
    blobs: BlobsStore,
}

impl std::fmt::Debug for MemoryNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("MemoryNetwork")
            .field("containers", &inner.vault.data.len())
            .field("apps", &inner.vault.apps.len())
            .field("connected", &inner.connected)
            .finish()
    }
}

impl MemoryNetwork {
    pub fn new(blobs: BlobsStore) -> Self {
        Self::from_vault(VaultState::default(), blobs)
    }

    fn from_vault(vault: VaultState, blobs: BlobsStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MemoryNetworkInner {
                vault,
                connected: true,
                observers: Vec::new(),
            })),
            blobs,
        }
    }

    /// A network backed by a memory blobs store
    pub async fn memory() -> Result<Self, NetworkError> {
        Ok(Self::new(BlobsStore::memory().await?))
    }

    /// Load the vault file at `path`, starting empty if it does not exist
    pub fn load(path: &Path, blobs: BlobsStore) -> Result<Self, NetworkError> {
        if !path.exists() {
            tracing::debug!("no vault at {:?}, starting empty", path);
            return Ok(Self::new(blobs));
        }
        let bytes = std::fs::read(path)?;
        let vault: VaultState = bincode::deserialize(&bytes)?;
        tracing::debug!(
            "loaded vault from {:?}: {} containers, {} apps",
            path,
            vault.data.len(),
            vault.apps.len()
        );
        Ok(Self::from_vault(vault, blobs))
    }

    /// Persist all mutable data and app registrations to `path`
    pub fn save(&self, path: &Path) -> Result<(), NetworkError> {
        let bytes = {
            let inner = self.inner.read();
            bincode::serialize(&inner.vault)?
        };
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn blobs(&self) -> &BlobsStore {
        &self.blobs
    }

    /// Record (or replace) an app's authorisation under `owner`'s account
    pub fn register_app(&self, owner: &PublicKey, app: PublicKey, access: AccessContainer) {
        let mut inner = self.inner.write();
        inner.vault.apps.insert(
            app,
            AppRecord {
                owner: *owner,
                revoked: false,
                access,
            },
        );
    }

    pub fn revoke_app(&self, app: &PublicKey) {
        let mut inner = self.inner.write();
        if let Some(record) = inner.vault.apps.get_mut(app) {
            record.revoked = true;
        }
    }

    /// Current permissions version of a container, 0 until first changed
    pub fn permissions_version(&self, address: &MdAddress) -> Result<u64, NetworkError> {
        let inner = self.inner.read();
        Ok(inner.data(address)?.permissions_version)
    }

    /// The container metadata recorded at creation
    pub fn metadata(&self, address: &MdAddress) -> Result<Option<Metadata>, NetworkError> {
        let inner = self.inner.read();
        Ok(inner.data(address)?.metadata.clone())
    }

    /// Simulate losing the connection; every request fails until
    ///  [`Network::reconnect`]
    pub fn disconnect(&self) {
        self.set_state(NetworkState::Disconnected);
    }

    fn set_state(&self, state: NetworkState) {
        let observers = {
            let mut inner = self.inner.write();
            inner.connected = state == NetworkState::Connected;
            inner.observers.clone()
        };
        for observer in observers {
            observer(state);
        }
    }
}

#[async_trait]
impl Network for MemoryNetwork {
    async fn put_mdata(
        &self,
        requester: &PublicKey,
        data: NewMutableData,
    ) -> Result<(), NetworkError> {
        let mut inner = self.inner.write();
        inner.ensure_connected()?;

        let address = data.info.address();
        let authorised = data.owner == *requester
            || inner
                .live_app(requester)
                .map(|record| record.owner == data.owner)
                .unwrap_or(false);
        if !authorised {
            return Err(NetworkError::AccessDenied {
                requester: *requester,
                action: Action::Insert,
                address,
            });
        }
        if inner.vault.data.contains_key(&address) {
            return Err(NetworkError::DataExists(address));
        }

        tracing::debug!("put_mdata {} with {} entries", address, data.entries.len());
        inner.vault.data.insert(
            address,
            MutableData {
                kind: data.info.kind(),
                owner: data.owner,
                entries: data.entries,
                permissions: data.permissions,
                permissions_version: 0,
                metadata: data.metadata,
            },
        );
        Ok(())
    }

    async fn get_mdata_value(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
        key: &[u8],
    ) -> Result<Value, NetworkError> {
        let inner = self.inner.read();
        inner.admit(requester)?;
        inner
            .readable(requester, address)?
            .entries
            .get(key)
            .cloned()
            .ok_or_else(|| NetworkError::NoSuchEntry(display_key(key)))
    }

    async fn list_mdata_entries(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
    ) -> Result<Entries, NetworkError> {
        let inner = self.inner.read();
        inner.admit(requester)?;
        Ok(inner.readable(requester, address)?.entries.clone())
    }

    async fn mutate_mdata_entries(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
        actions: EntryActions,
    ) -> Result<(), NetworkError> {
        let mut inner = self.inner.write();
        inner.admit(requester)?;
        let data = inner
            .vault
            .data
            .get_mut(address)
            .ok_or(NetworkError::NoSuchData(*address))?;
        let actions = actions.into_actions();

        // validate the whole batch before touching any entry
        for (key, action) in &actions {
            let (needed, existing) = (
                match action {
                    EntryAction::Ins(_) => Action::Insert,
                    EntryAction::Update(_) => Action::Update,
                    EntryAction::Del(_) => Action::Delete,
                },
                data.entries.get(key),
            );
            if !data.allows(requester, needed) {
                return Err(NetworkError::AccessDenied {
                    requester: *requester,
                    action: needed,
                    address: *address,
                });
            }
            let requested = match (action, existing) {
                (EntryAction::Ins(_), Some(_)) => {
                    return Err(NetworkError::EntryExists(display_key(key)));
                }
                (EntryAction::Ins(_), None) => continue,
                (EntryAction::Update(_), None) => {
                    return Err(NetworkError::NoSuchEntry(display_key(key)));
                }
                (EntryAction::Del(_), None) => {
                    return Err(NetworkError::NoSuchEntry(display_key(key)));
                }
                (EntryAction::Del(_), Some(value)) if value.is_tombstone() => {
                    return Err(NetworkError::NoSuchEntry(display_key(key)));
                }
                (EntryAction::Update(value), Some(_)) => value.entry_version,
                (EntryAction::Del(version), Some(_)) => *version,
            };
            let current = existing.map(|value| value.entry_version).unwrap_or(0);
            if requested != current + 1 {
                return Err(NetworkError::InvalidSuccessor {
                    address: *address,
                    key: display_key(key),
                    current,
                    requested,
                });
            }
        }

        tracing::debug!("mutate_mdata_entries {}: {} actions", address, actions.len());
        for (key, action) in actions {
            let value = match action {
                EntryAction::Ins(value) | EntryAction::Update(value) => value,
                EntryAction::Del(version) => Value {
                    content: Vec::new(),
                    entry_version: version,
                },
            };
            data.entries.insert(key, value);
        }
        Ok(())
    }

    async fn list_user_permissions(
        &self,
        _requester: &PublicKey,
        address: &MdAddress,
        user: &User,
    ) -> Result<PermissionSet, NetworkError> {
        let inner = self.inner.read();
        inner.ensure_connected()?;
        inner
            .data(address)?
            .permissions
            .get(user)
            .cloned()
            .ok_or(NetworkError::NoSuchUser(*user))
    }

    async fn set_user_permissions(
        &self,
        requester: &PublicKey,
        address: &MdAddress,
        user: User,
        permissions: PermissionSet,
        version: u64,
    ) -> Result<(), NetworkError> {
        let mut inner = self.inner.write();
        inner.admit(requester)?;
        let data = inner
            .vault
            .data
            .get_mut(address)
            .ok_or(NetworkError::NoSuchData(*address))?;

        if !data.allows(requester, Action::ManagePermissions) {
            return Err(NetworkError::AccessDenied {
                requester: *requester,
                action: Action::ManagePermissions,
                address: *address,
            });
        }
        if version != data.permissions_version + 1 {
            return Err(NetworkError::InvalidPermissionsVersion {
                address: *address,
                current: data.permissions_version,
                requested: version,
            });
        }

        tracing::debug!("set_user_permissions {} for {:?}", address, user);
        data.permissions.insert(user, permissions);
        data.permissions_version = version;
        Ok(())
    }

    async fn put_idata(&self, data: Vec<u8>) -> Result<XorName, NetworkError> {
        self.inner.read().ensure_connected()?;
        let name = self.blobs.put(data).await?;
        tracing::debug!("put_idata {:?}", name);
        Ok(name)
    }

    async fn get_idata(&self, name: &XorName) -> Result<Vec<u8>, NetworkError> {
        self.inner.read().ensure_connected()?;
        if !self.blobs.has(name).await? {
            return Err(NetworkError::NoSuchIData(*name));
        }
        Ok(self.blobs.get(name).await?.to_vec())
    }

    async fn connect(&self, app: &PublicKey) -> Result<(), NetworkError> {
        let inner = self.inner.read();
        inner.ensure_connected()?;
        inner.live_app(app)?;
        Ok(())
    }

    async fn access_container(&self, app: &PublicKey) -> Result<AccessContainer, NetworkError> {
        let inner = self.inner.read();
        inner.ensure_connected()?;
        Ok(inner.live_app(app)?.access.clone())
    }

    async fn reconnect(&self) -> Result<(), NetworkError> {
        self.set_state(NetworkState::Connected);
        Ok(())
    }

    fn subscribe(&self, callback: NetworkStatusCallback) {
        self.inner.write().observers.push(callback);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::SecretKey;
    use crate::network::MDataInfo;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn network_with_data(kind: MdKind) -> (MemoryNetwork, SecretKey, MDataInfo) {
        let network = MemoryNetwork::memory().await.unwrap();
        let owner = SecretKey::generate();
        let info = match kind {
            MdKind::Public => MDataInfo::random_public(15001),
            MdKind::Private => MDataInfo::random_private(15001),
        };
        network
            .put_mdata(
                &owner.public(),
                NewMutableData {
                    info: info.clone(),
                    owner: owner.public(),
                    entries: Entries::from([(
                        b"key".to_vec(),
                        Value {
                            content: b"value".to_vec(),
                            entry_version: 0,
                        },
                    )]),
                    permissions: BTreeMap::new(),
                    metadata: None,
                },
            )
            .await
            .unwrap();
        (network, owner, info)
    }

    #[tokio::test]
    async fn test_remove_leaves_tombstone() {
        let (network, owner, info) = network_with_data(MdKind::Public).await;
        let address = info.address();

        network
            .mutate_mdata_entries(
                &owner.public(),
                &address,
                EntryActions::new().del(b"key".to_vec(), 1),
            )
            .await
            .unwrap();

        let entries = network
            .list_mdata_entries(&owner.public(), &address)
            .await
            .unwrap();
        let value = entries.get(b"key".as_slice()).unwrap();
        assert!(value.is_tombstone());
        assert_eq!(value.entry_version, 1);
    }

    #[tokio::test]
    async fn test_stale_version_rejected() {
        let (network, owner, info) = network_with_data(MdKind::Public).await;
        let address = info.address();

        let result = network
            .mutate_mdata_entries(
                &owner.public(),
                &address,
                EntryActions::new().del(b"key".to_vec(), 5),
            )
            .await;
        assert!(matches!(
            result,
            Err(NetworkError::InvalidSuccessor {
                current: 0,
                requested: 5,
                ..
            })
        ));

        let value = network
            .get_mdata_value(&owner.public(), &address, b"key")
            .await
            .unwrap();
        assert_eq!(value.content, b"value");
    }

    #[tokio::test]
    async fn test_batch_is_atomic() {
        let (network, owner, info) = network_with_data(MdKind::Public).await;
        let address = info.address();

        let result = network
            .mutate_mdata_entries(
                &owner.public(),
                &address,
                EntryActions::new()
                    .ins(b"fresh".to_vec(), b"x".to_vec(), 0)
                    .ins(b"key".to_vec(), b"y".to_vec(), 0),
            )
            .await;
        assert!(matches!(result, Err(NetworkError::EntryExists(_))));

        let keys = network
            .list_mdata_keys(&owner.public(), &address)
            .await
            .unwrap();
        assert_eq!(keys, vec![b"key".to_vec()]);
    }

    #[tokio::test]
    async fn test_anyone_insert_permission() {
        let (network, owner, info) = network_with_data(MdKind::Public).await;
        let address = info.address();
        let stranger = SecretKey::generate().public();

        let insert = EntryActions::new().ins(b"msg".to_vec(), b"hello".to_vec(), 0);
        assert!(matches!(
            network
                .mutate_mdata_entries(&stranger, &address, insert.clone())
                .await,
            Err(NetworkError::AccessDenied { .. })
        ));

        network
            .set_user_permissions(
                &owner.public(),
                &address,
                User::Anyone,
                PermissionSet::new().allow(Action::Insert),
                1,
            )
            .await
            .unwrap();
        network
            .mutate_mdata_entries(&stranger, &address, insert)
            .await
            .unwrap();

        // insert does not imply delete
        assert!(network
            .mutate_mdata_entries(
                &stranger,
                &address,
                EntryActions::new().del(b"msg".to_vec(), 1)
            )
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_private_data_needs_read() {
        let (network, owner, info) = network_with_data(MdKind::Private).await;
        let stranger = SecretKey::generate().public();

        assert!(network
            .list_mdata_entries(&owner.public(), &info.address())
            .await
            .is_ok());
        assert!(matches!(
            network
                .list_mdata_entries(&stranger, &info.address())
                .await,
            Err(NetworkError::AccessDenied {
                action: Action::Read,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_disconnect_and_reconnect() {
        let network = MemoryNetwork::memory().await.unwrap();
        let transitions = Arc::new(AtomicUsize::new(0));
        let counter = transitions.clone();
        network.subscribe(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        network.disconnect();
        assert!(matches!(
            network.put_idata(b"data".to_vec()).await,
            Err(NetworkError::Disconnected)
        ));

        network.reconnect().await.unwrap();
        assert!(network.put_idata(b"data".to_vec()).await.is_ok());
        assert_eq!(transitions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_vault_persistence() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let vault_path = temp_dir.path().join("vault.bin");
        let (network, owner, info) = network_with_data(MdKind::Private).await;
        let app = SecretKey::generate().public();
        network.register_app(&owner.public(), app, AccessContainer::default());

        network.save(&vault_path).unwrap();
        let loaded = MemoryNetwork::load(&vault_path, network.blobs().clone()).unwrap();

        let value = loaded
            .get_mdata_value(&owner.public(), &info.address(), b"key")
            .await
            .unwrap();
        assert_eq!(value.content, b"value");
        assert!(loaded.connect(&app).await.is_ok());

        loaded.revoke_app(&app);
        assert!(matches!(
            loaded.connect(&app).await,
            Err(NetworkError::UnknownApp(_))
        ));
        assert!(matches!(
            loaded.list_mdata_entries(&app, &info.address()).await,
            Err(NetworkError::UnknownApp(_))
        ));
    }
}
