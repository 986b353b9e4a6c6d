use std::sync::Arc;

use common::auth::{
    AuthBridge, AuthError, AuthRequest, Authorization, FileTokenStore, MemoryAuthenticator,
};
use common::mail::MailClient;
use common::network::{BlobsStore, BlobsStoreError, MemoryNetwork, NetworkError};
use common::session::Session;

use crate::state::{AppState, StateError};

/// Set to any value to have the local authenticator grant requests
///  without an explicit `sealmail auth`
pub const FAKE_AUTH_ENV: &str = "SEALMAIL_FAKE_AUTH";

#[derive(Debug, thiserror::Error)]
pub enum LocalError {
    #[error("state error: {0}")]
    State(#[from] StateError),
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
    #[error("blobs store error: {0}")]
    BlobsStore(#[from] BlobsStoreError),
    #[error("authorisation failed: {0}")]
    Auth(#[from] AuthError),
    #[error("app is not authorised yet. Run 'sealmail auth' first")]
    NotAuthorised,
}

/// The vault on disk, the account that owns it, and the app's bridge
///  into it
#[derive(Debug)]
pub struct LocalAccount {
    pub state: AppState,
    pub network: MemoryNetwork,
    pub authenticator: MemoryAuthenticator,
    pub bridge: AuthBridge<MemoryNetwork>,
}

impl LocalAccount {
    pub async fn open(state: AppState) -> Result<Self, LocalError> {
        let blobs = BlobsStore::fs(&state.blobs_path).await?;
        let network = MemoryNetwork::load(&state.vault_path, blobs)?;
        let authenticator = MemoryAuthenticator::new(network.clone(), state.load_key()?);
        let bridge = AuthBridge::new(
            network.clone(),
            state.config.app_info(),
            Arc::new(authenticator.clone()),
            Arc::new(FileTokenStore::new(state.token_path.clone())),
        );
        Ok(Self {
            state,
            network,
            authenticator,
            bridge,
        })
    }

    /// Resume the stored grant, or obtain one from the local authenticator
    ///
    /// Returns the session and whether a new grant was issued.
    pub async fn authorize(
        &self,
        approve: bool,
    ) -> Result<(Session<MemoryNetwork>, bool), LocalError> {
        match self.bridge.authorize(None).await? {
            Authorization::Connected(session) => Ok((session, false)),
            Authorization::Requested(request) if approve => {
                let token = self.authenticator.approve(request).await?;
                let session = self.bridge.connect_with_token(&token, None).await?;
                Ok((session, true))
            }
            Authorization::Requested(_) if std::env::var_os(FAKE_AUTH_ENV).is_some() => {
                tracing::info!("{} is set, granting without approval", FAKE_AUTH_ENV);
                let token = self
                    .authenticator
                    .login_for_test(AuthRequest::mail(self.state.config.app_info()))
                    .await?;
                let session = self.bridge.connect_with_token(&token, None).await?;
                Ok((session, true))
            }
            Authorization::Requested(_) => Err(LocalError::NotAuthorised),
        }
    }

    /// A mail client on an authorised session
    pub async fn client(&self) -> Result<MailClient<MemoryNetwork>, LocalError> {
        let (session, _) = self.authorize(false).await?;
        Ok(MailClient::new(self.bridge.clone(), session))
    }

    /// Persist the vault so the next invocation sees this one's changes
    pub fn save(&self) -> Result<(), LocalError> {
        self.network.save(&self.state.vault_path)?;
        tracing::debug!("saved vault to {:?}", self.state.vault_path);
        Ok(())
    }
}
