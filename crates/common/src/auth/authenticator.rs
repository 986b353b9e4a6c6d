use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::crypto::{name_hash, Secret, SecretKey};
use crate::network::{
    EntryActions, MDataInfo, MemoryNetwork, Network, NetworkError, NewMutableData,
    PermissionSet, User, Value, XorName,
};

use super::error::AuthError;
use super::granted::{AuthGranted, AuthResponse, AuthToken, SharedGrant};
use super::request::{AppInfo, AuthRequest, ShareMDataRequest};

/// Type tag of the containers an authenticator manages for an account
pub const CONTAINER_TYPE_TAG: u64 = 15000;

/// The process an app asks for grants
///
/// Requests are answered out of band: the caller gets a request id back
///  and the approved [`AuthToken`] reaches the app later.
#[async_trait]
pub trait Authenticator: Send + Sync + std::fmt::Debug {
    async fn request_auth(&self, request: AuthRequest) -> Result<Uuid, AuthError>;

    async fn request_share_mdata(&self, request: ShareMDataRequest) -> Result<Uuid, AuthError>;
}

#[derive(Clone, Debug)]
enum PendingRequest {
    Auth(AuthRequest),
    Share(ShareMDataRequest),
}

/// Authenticator acting for a single account on a [`MemoryNetwork`]
///
/// Named containers and the key issued to each app are tracked in a
///  private root container derived from the owner key, so they survive
///  across processes sharing a vault. Re-authorising an app hands back
///  the key it already holds; only [`MemoryAuthenticator::revoke`]
///  retires one.
#[derive(Clone, Debug)]
pub struct MemoryAuthenticator {
    network: MemoryNetwork,
    owner: SecretKey,
    pending: Arc<Mutex<Vec<(Uuid, PendingRequest)>>>,
}

#[async_trait]
impl Authenticator for MemoryAuthenticator {
    async fn request_auth(&self, request: AuthRequest) -> Result<Uuid, AuthError> {
        let id = Uuid::new_v4();
        tracing::info!("auth request {} from app {}", id, request.app.id);
        self.pending.lock().push((id, PendingRequest::Auth(request)));
        Ok(id)
    }

    async fn request_share_mdata(&self, request: ShareMDataRequest) -> Result<Uuid, AuthError> {
        let id = Uuid::new_v4();
        tracing::info!(
            "share request {} from app {} for {} containers",
            id,
            request.app.id,
            request.mdata.len()
        );
        self.pending.lock().push((id, PendingRequest::Share(request)));
        Ok(id)
    }
}

fn container_label(name: &str) -> String {
    format!("containers/{}", name)
}

fn app_key_label(app: &AppInfo) -> String {
    format!("app-keys/{}", app.id)
}

impl MemoryAuthenticator {
    pub fn new(network: MemoryNetwork, owner: SecretKey) -> Self {
        Self {
            network,
            owner,
            pending: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn owner(&self) -> &SecretKey {
        &self.owner
    }

    pub fn pending(&self) -> Vec<Uuid> {
        self.pending.lock().iter().map(|(id, _)| *id).collect()
    }

    /// Approve one pending request, returning the token for the app
    pub async fn approve(&self, id: Uuid) -> Result<AuthToken, AuthError> {
        let request = {
            let mut pending = self.pending.lock();
            let index = pending
                .iter()
                .position(|(pending_id, _)| *pending_id == id)
                .ok_or(AuthError::NoSuchRequest(id))?;
            pending.remove(index).1
        };
        match request {
            PendingRequest::Auth(request) => self.grant_auth(request).await,
            PendingRequest::Share(request) => self.grant_share(request).await,
        }
    }

    /// Approve every pending request in the order they arrived
    pub async fn approve_pending(&self) -> Result<Vec<AuthToken>, AuthError> {
        let mut tokens = Vec::new();
        for id in self.pending() {
            tokens.push(self.approve(id).await?);
        }
        Ok(tokens)
    }

    /// Grant a request without queueing it
    pub async fn login_for_test(&self, request: AuthRequest) -> Result<AuthToken, AuthError> {
        self.grant_auth(request).await
    }

    /// Revoke an app's key; tokens issued to it stop working
    pub async fn revoke(&self, app: &AppInfo) -> Result<(), AuthError> {
        let label = app_key_label(app);
        let Some((bytes, version)) = self.root_entry(&label).await? else {
            return Ok(());
        };
        let app_key = parse_app_key(&bytes)?;
        self.network.revoke_app(&app_key.public());
        self.remove_root_entry(&label, version).await?;
        tracing::info!("revoked app {} ({})", app.id, app_key.public());
        Ok(())
    }

    async fn grant_auth(&self, request: AuthRequest) -> Result<AuthToken, AuthError> {
        let owner = self.owner.public();
        let label = app_key_label(&request.app);
        let app_key = match self.root_entry(&label).await? {
            Some((bytes, _)) => parse_app_key(&bytes)?,
            None => {
                let app_key = SecretKey::generate();
                self.insert_root_entry(&label, app_key.to_hex().into_bytes())
                    .await?;
                app_key
            }
        };

        let mut granted = AuthGranted {
            app_key: app_key.clone(),
            owner,
            access_container: Default::default(),
        };
        let mut containers: Vec<(String, PermissionSet)> =
            request.containers.into_iter().collect();
        if request.own_container {
            containers.push((request.app.own_container(), PermissionSet::all()));
        }
        for (name, permissions) in containers {
            let info = self.container(&name).await?;
            self.set_permissions(&info, User::Key(app_key.public()), permissions.clone())
                .await?;
            granted
                .access_container
                .containers
                .insert(name, (info, permissions));
        }

        self.network
            .register_app(&owner, app_key.public(), granted.access_container.clone());
        tracing::info!("granted app {} as {}", request.app.id, app_key.public());
        AuthToken::encode(&AuthResponse::Granted(granted))
    }

    async fn grant_share(&self, request: ShareMDataRequest) -> Result<AuthToken, AuthError> {
        let user = User::Key(request.app_key);
        for share in &request.mdata {
            let info = MDataInfo::new_public(share.name, share.type_tag);
            let existing = match self
                .network
                .list_user_permissions(&self.owner.public(), &info.address(), &user)
                .await
            {
                Ok(existing) => existing,
                Err(NetworkError::NoSuchUser(_)) => PermissionSet::new(),
                Err(e) => return Err(e.into()),
            };
            let merged = existing
                .actions()
                .chain(share.permissions.actions())
                .copied()
                .collect();
            self.set_permissions(&info, user, merged).await?;
        }
        tracing::info!(
            "shared {} containers with {}",
            request.mdata.len(),
            request.app_key
        );
        AuthToken::encode(&AuthResponse::Shared(SharedGrant {
            app_key: request.app_key,
            mdata: request.mdata,
        }))
    }

    async fn set_permissions(
        &self,
        info: &MDataInfo,
        user: User,
        permissions: PermissionSet,
    ) -> Result<(), AuthError> {
        let address = info.address();
        let version = self.network.permissions_version(&address)? + 1;
        self.network
            .set_user_permissions(&self.owner.public(), &address, user, permissions, version)
            .await?;
        Ok(())
    }

    /// Look up a named container, creating it on first use
    async fn container(&self, name: &str) -> Result<MDataInfo, AuthError> {
        let label = container_label(name);
        if let Some((bytes, _)) = self.root_entry(&label).await? {
            return Ok(MDataInfo::deserialise(&bytes)?);
        }

        let info = MDataInfo::random_private(CONTAINER_TYPE_TAG);
        self.put_container(&info).await?;
        self.insert_root_entry(&label, info.serialise()).await?;
        tracing::info!("created container {}", name);
        Ok(info)
    }

    async fn put_container(&self, info: &MDataInfo) -> Result<(), NetworkError> {
        let owner = self.owner.public();
        self.network
            .put_mdata(
                &owner,
                NewMutableData {
                    info: info.clone(),
                    owner,
                    entries: Default::default(),
                    permissions: Default::default(),
                    metadata: None,
                },
            )
            .await
    }

    fn root_info(&self) -> Result<MDataInfo, AuthError> {
        let seed = |label: &[u8]| {
            let mut input = self.owner.to_bytes().to_vec();
            input.extend_from_slice(label);
            name_hash(&input)
        };
        let secret = Secret::from_slice(&seed(b"root secret")).map_err(|e| anyhow!(e))?;
        Ok(MDataInfo::new_private(
            XorName(seed(b"root name")),
            CONTAINER_TYPE_TAG,
            secret,
        ))
    }

    /// The root container, created the first time any account state is
    ///  needed
    async fn root(&self) -> Result<MDataInfo, AuthError> {
        let root = self.root_info()?;
        match self.put_container(&root).await {
            Ok(()) => tracing::debug!("created root container for {}", self.owner.public()),
            Err(NetworkError::DataExists(_)) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(root)
    }

    /// A live root entry's decrypted value and its version
    async fn root_entry(&self, label: &str) -> Result<Option<(Vec<u8>, u64)>, AuthError> {
        let root = self.root().await?;
        let key = root.enc_entry_key(label.as_bytes()).map_err(|e| anyhow!(e))?;
        match self
            .network
            .get_mdata_value(&self.owner.public(), &root.address(), &key)
            .await
        {
            Ok(Value {
                content,
                entry_version,
            }) if !content.is_empty() => {
                let bytes = root.decrypt(&content).map_err(|e| anyhow!(e))?;
                Ok(Some((bytes, entry_version)))
            }
            Ok(_) | Err(NetworkError::NoSuchEntry(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_root_entry(&self, label: &str, value: Vec<u8>) -> Result<(), AuthError> {
        let root = self.root().await?;
        let key = root.enc_entry_key(label.as_bytes()).map_err(|e| anyhow!(e))?;
        let value = root.enc_entry_value(&value).map_err(|e| anyhow!(e))?;
        // a removed label leaves a tombstone behind, which must be updated
        let actions = match self
            .network
            .get_mdata_value(&self.owner.public(), &root.address(), &key)
            .await
        {
            Ok(tombstone) => EntryActions::new().update(key, value, tombstone.entry_version + 1),
            Err(NetworkError::NoSuchEntry(_)) => EntryActions::new().ins(key, value, 0),
            Err(e) => return Err(e.into()),
        };
        self.network
            .mutate_mdata_entries(&self.owner.public(), &root.address(), actions)
            .await?;
        Ok(())
    }

    async fn remove_root_entry(&self, label: &str, version: u64) -> Result<(), AuthError> {
        let root = self.root().await?;
        let key = root.enc_entry_key(label.as_bytes()).map_err(|e| anyhow!(e))?;
        self.network
            .mutate_mdata_entries(
                &self.owner.public(),
                &root.address(),
                EntryActions::new().del(key, version + 1),
            )
            .await?;
        Ok(())
    }
}

fn parse_app_key(bytes: &[u8]) -> Result<SecretKey, AuthError> {
    let hex = std::str::from_utf8(bytes).map_err(|e| anyhow!(e))?;
    SecretKey::from_hex(hex).map_err(|e| anyhow!(e).into())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::request::PUBLIC_NAMES_CONTAINER;
    use crate::network::Action;

    fn app_info() -> AppInfo {
        AppInfo {
            id: "net.sealmail.test".to_string(),
            name: "Sealmail".to_string(),
            vendor: "Sealmail".to_string(),
        }
    }

    #[tokio::test]
    async fn test_approve_creates_containers() {
        let network = MemoryNetwork::memory().await.unwrap();
        let authenticator = MemoryAuthenticator::new(network.clone(), SecretKey::generate());

        let id = authenticator
            .request_auth(AuthRequest::mail(app_info()))
            .await
            .unwrap();
        assert_eq!(authenticator.pending(), vec![id]);

        let granted = authenticator
            .approve(id)
            .await
            .unwrap()
            .decode_granted()
            .unwrap();
        assert!(authenticator.pending().is_empty());

        let (public_names, perms) = granted
            .access_container
            .containers
            .get(PUBLIC_NAMES_CONTAINER)
            .unwrap();
        assert!(perms.is_allowed(Action::Insert));
        assert!(granted
            .access_container
            .containers
            .contains_key(&app_info().own_container()));

        // the app key can read the private container it was granted
        network
            .list_mdata_entries(&granted.app_key.public(), &public_names.address())
            .await
            .unwrap();
        network.connect(&granted.app_key.public()).await.unwrap();
    }

    #[tokio::test]
    async fn test_reauth_reuses_key_and_containers() {
        let network = MemoryNetwork::memory().await.unwrap();
        let authenticator = MemoryAuthenticator::new(network.clone(), SecretKey::generate());

        let first = authenticator
            .login_for_test(AuthRequest::mail(app_info()))
            .await
            .unwrap()
            .decode_granted()
            .unwrap();
        let second = authenticator
            .login_for_test(AuthRequest::mail(app_info()))
            .await
            .unwrap()
            .decode_granted()
            .unwrap();

        assert_eq!(first.app_key.public(), second.app_key.public());
        assert_eq!(first.access_container, second.access_container);
    }

    #[tokio::test]
    async fn test_revoke_then_reauth() {
        let network = MemoryNetwork::memory().await.unwrap();
        let authenticator = MemoryAuthenticator::new(network.clone(), SecretKey::generate());

        let first = authenticator
            .login_for_test(AuthRequest::mail(app_info()))
            .await
            .unwrap()
            .decode_granted()
            .unwrap();
        authenticator.revoke(&app_info()).await.unwrap();
        assert!(matches!(
            network.connect(&first.app_key.public()).await,
            Err(NetworkError::UnknownApp(_))
        ));

        let second = authenticator
            .login_for_test(AuthRequest::mail(app_info()))
            .await
            .unwrap()
            .decode_granted()
            .unwrap();
        assert_ne!(first.app_key.public(), second.app_key.public());
        assert!(network.connect(&second.app_key.public()).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_request() {
        let network = MemoryNetwork::memory().await.unwrap();
        let authenticator = MemoryAuthenticator::new(network, SecretKey::generate());
        assert!(matches!(
            authenticator.approve(Uuid::new_v4()).await,
            Err(AuthError::NoSuchRequest(_))
        ));
    }
}
