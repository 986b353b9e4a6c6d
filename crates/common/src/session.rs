use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::auth::{AppInfo, AuthError, AuthGranted};
use crate::crypto::PublicKey;
use crate::network::{
    Entries, EntryActions, MDataInfo, Metadata, Network, NetworkError, NetworkStatusCallback,
    NewMutableData, PermissionSet, User, Value, XorName,
};

/// A connected, capability-scoped handle on the network
///
/// Cloning is cheap and every clone shares the same grant, so replacing
///  the grant (after a share approval, or a fresh login) is visible to
///  every component holding the session. Requests are issued with the
///  app key as requester.
#[derive(Clone)]
pub struct Session<N: Network> {
    network: N,
    app: AppInfo,
    granted: Arc<RwLock<AuthGranted>>,
}

impl<N: Network> std::fmt::Debug for Session<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("app", &self.app.id)
            .field("app_key", &self.app_key())
            .finish()
    }
}

/// The network rejecting an app key means the grant is stale
fn stale(err: NetworkError) -> AuthError {
    match err {
        NetworkError::UnknownApp(_) => AuthError::StaleAuthorization,
        e => e.into(),
    }
}

impl<N: Network> Session<N> {
    /// Open a session from a grant, failing with
    ///  [`AuthError::StaleAuthorization`] if the network no longer
    ///  recognises the app key
    pub async fn connect(
        network: N,
        app: AppInfo,
        granted: AuthGranted,
    ) -> Result<Self, AuthError> {
        network
            .connect(&granted.app_key.public())
            .await
            .map_err(stale)?;
        tracing::info!("session connected as {}", granted.app_key.public());
        Ok(Self {
            network,
            app,
            granted: Arc::new(RwLock::new(granted)),
        })
    }

    /// Report connection state changes to `callback` for as long as the
    ///  network lives
    pub fn watch(&self, callback: NetworkStatusCallback) {
        self.network.subscribe(callback);
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn app(&self) -> &AppInfo {
        &self.app
    }

    pub fn app_key(&self) -> PublicKey {
        self.granted.read().app_key.public()
    }

    /// Account every container this session creates belongs to
    pub fn owner(&self) -> PublicKey {
        self.granted.read().owner
    }

    pub fn granted(&self) -> AuthGranted {
        self.granted.read().clone()
    }

    pub(crate) async fn replace_grant(&self, granted: AuthGranted) -> Result<(), AuthError> {
        self.network
            .connect(&granted.app_key.public())
            .await
            .map_err(stale)?;
        *self.granted.write() = granted;
        Ok(())
    }

    /// Re-read the containers granted to this app
    pub async fn refresh_container_permissions(&self) -> Result<(), AuthError> {
        let access = self
            .network
            .access_container(&self.app_key())
            .await
            .map_err(stale)?;
        tracing::debug!("refreshed {} containers", access.containers.len());
        self.granted.write().access_container = access;
        Ok(())
    }

    /// A container granted to this app by name
    pub fn container(&self, name: &str) -> Result<MDataInfo, AuthError> {
        self.granted
            .read()
            .access_container
            .containers
            .get(name)
            .map(|(info, _)| info.clone())
            .ok_or_else(|| AuthError::NoSuchContainer(name.to_string()))
    }

    /// The app's own private container
    pub fn own_container(&self) -> Result<MDataInfo, AuthError> {
        self.container(&self.app.own_container())
    }

    pub async fn reconnect(&self) -> Result<(), AuthError> {
        self.network.reconnect().await?;
        self.network
            .connect(&self.app_key())
            .await
            .map_err(stale)?;
        Ok(())
    }

    /// Create a container owned by the account, with full permissions for
    ///  this app
    pub async fn put_mdata(
        &self,
        info: &MDataInfo,
        entries: Entries,
        metadata: Option<Metadata>,
    ) -> Result<(), NetworkError> {
        let app_key = self.app_key();
        let mut permissions = BTreeMap::new();
        permissions.insert(User::Key(app_key), PermissionSet::all());
        self.network
            .put_mdata(
                &app_key,
                NewMutableData {
                    info: info.clone(),
                    owner: self.owner(),
                    entries,
                    permissions,
                    metadata,
                },
            )
            .await
    }

    pub async fn get_value(&self, info: &MDataInfo, key: &[u8]) -> Result<Value, NetworkError> {
        self.network
            .get_mdata_value(&self.app_key(), &info.address(), key)
            .await
    }

    pub async fn list_entries(&self, info: &MDataInfo) -> Result<Entries, NetworkError> {
        self.network
            .list_mdata_entries(&self.app_key(), &info.address())
            .await
    }

    pub async fn list_keys(&self, info: &MDataInfo) -> Result<Vec<Vec<u8>>, NetworkError> {
        self.network
            .list_mdata_keys(&self.app_key(), &info.address())
            .await
    }

    pub async fn mutate(&self, info: &MDataInfo, actions: EntryActions) -> Result<(), NetworkError> {
        self.network
            .mutate_mdata_entries(&self.app_key(), &info.address(), actions)
            .await
    }

    /// This app's permissions on a container; `NoSuchUser` if it holds none
    pub async fn own_permissions(&self, info: &MDataInfo) -> Result<PermissionSet, NetworkError> {
        self.network
            .list_user_permissions(&self.app_key(), &info.address(), &User::Key(self.app_key()))
            .await
    }

    pub async fn set_user_permissions(
        &self,
        info: &MDataInfo,
        user: User,
        permissions: PermissionSet,
        version: u64,
    ) -> Result<(), NetworkError> {
        self.network
            .set_user_permissions(&self.app_key(), &info.address(), user, permissions, version)
            .await
    }

    pub async fn put_idata(&self, data: Vec<u8>) -> Result<XorName, NetworkError> {
        self.network.put_idata(data).await
    }

    pub async fn get_idata(&self, name: &XorName) -> Result<Vec<u8>, NetworkError> {
        self.network.get_idata(name).await
    }
}
