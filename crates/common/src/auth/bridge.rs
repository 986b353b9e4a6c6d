use std::sync::Arc;

use uuid::Uuid;

use crate::network::{Network, NetworkStatusCallback};
use crate::session::Session;

use super::authenticator::Authenticator;
use super::error::AuthError;
use super::granted::{AuthResponse, AuthToken};
use super::request::{AppInfo, AuthRequest, ShareMData, ShareMDataRequest};
use super::token_store::TokenStore;

/// Result of trying to authorise the app
#[derive(Debug)]
pub enum Authorization<N: Network> {
    /// A stored token resumed cleanly
    Connected(Session<N>),
    /// A fresh grant was requested; connect once its token arrives
    Requested(Uuid),
}

/// Obtains, persists and resumes the capability token the app runs under
#[derive(Clone, Debug)]
pub struct AuthBridge<N: Network> {
    network: N,
    app: AppInfo,
    authenticator: Arc<dyn Authenticator>,
    tokens: Arc<dyn TokenStore>,
}

impl<N: Network> AuthBridge<N> {
    pub fn new(
        network: N,
        app: AppInfo,
        authenticator: Arc<dyn Authenticator>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        Self {
            network,
            app,
            authenticator,
            tokens,
        }
    }

    pub fn app(&self) -> &AppInfo {
        &self.app
    }

    /// Resume from the stored token if there is one, else request a grant
    ///
    /// Any failure to resume discards the stored token; it is never
    ///  retried.
    pub async fn authorize(
        &self,
        on_status: Option<NetworkStatusCallback>,
    ) -> Result<Authorization<N>, AuthError> {
        if let Some(token) = self.tokens.load()? {
            match self.resume(&token, on_status).await {
                Ok(session) => return Ok(Authorization::Connected(session)),
                Err(e) => {
                    tracing::warn!(
                        "stored auth token is not valid anymore, app needs to be re-authorised: {}",
                        e
                    );
                    self.tokens.clear()?;
                }
            }
        }
        let id = self
            .authenticator
            .request_auth(AuthRequest::mail(self.app.clone()))
            .await?;
        Ok(Authorization::Requested(id))
    }

    async fn resume(
        &self,
        token: &AuthToken,
        on_status: Option<NetworkStatusCallback>,
    ) -> Result<Session<N>, AuthError> {
        let granted = token.decode_granted()?;
        let session = Session::connect(self.network.clone(), self.app.clone(), granted).await?;
        session.refresh_container_permissions().await?;
        if let Some(callback) = on_status {
            session.watch(callback);
        }
        Ok(session)
    }

    /// Establish a session from an explicitly supplied token, persisting
    ///  it once the network accepts it
    pub async fn connect_with_token(
        &self,
        token: &AuthToken,
        on_status: Option<NetworkStatusCallback>,
    ) -> Result<Session<N>, AuthError> {
        let granted = token.decode_granted()?;
        let session = Session::connect(self.network.clone(), self.app.clone(), granted).await?;
        self.tokens.save(token)?;
        session.refresh_container_permissions().await?;
        if let Some(callback) = on_status {
            session.watch(callback);
        }
        Ok(session)
    }

    /// Ask for elevated permissions on containers this app did not create
    pub async fn request_shared_container_access(
        &self,
        session: &Session<N>,
        mdata: Vec<ShareMData>,
    ) -> Result<Uuid, AuthError> {
        self.authenticator
            .request_share_mdata(ShareMDataRequest {
                app: self.app.clone(),
                app_key: session.app_key(),
                mdata,
            })
            .await
    }

    /// Apply a token to the live session in place
    ///
    /// A full grant replaces the session's grant; a share acknowledgement
    ///  must name this session's app key. Either way container
    ///  permissions are refreshed afterwards.
    pub async fn login_from_token(
        &self,
        session: &Session<N>,
        token: &AuthToken,
    ) -> Result<(), AuthError> {
        match token.decode()? {
            AuthResponse::Granted(granted) => session.replace_grant(granted).await?,
            AuthResponse::Shared(shared) => {
                if shared.app_key != session.app_key() {
                    return Err(AuthError::ForeignToken);
                }
            }
        }
        session.refresh_container_permissions().await
    }

    /// Re-establish a dropped session without touching account state
    pub async fn reconnect(&self, session: &Session<N>) -> Result<(), AuthError> {
        tracing::info!("reconnecting session");
        session.reconnect().await
    }
}
