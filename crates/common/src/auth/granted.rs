use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::crypto::{PublicKey, SecretKey};
use crate::network::AccessContainer;

use super::error::AuthError;
use super::request::ShareMData;

/// What an authenticator hands back once an auth request is approved
///
/// The app key is the identity the network checks permissions against;
///  the owner is the account every container the app creates belongs to.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthGranted {
    pub app_key: SecretKey,
    pub owner: PublicKey,
    pub access_container: AccessContainer,
}

/// Acknowledgement that an app key was given the requested permissions
///  on containers it does not own
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SharedGrant {
    pub app_key: PublicKey,
    pub mdata: Vec<ShareMData>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthResponse {
    Granted(AuthGranted),
    Shared(SharedGrant),
}

/// Opaque capability token carrying an [`AuthResponse`]
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "AuthToken({}..)", prefix)
    }
}

impl std::fmt::Display for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for AuthToken {
    fn from(token: String) -> Self {
        AuthToken(token.trim().to_string())
    }
}

impl AuthToken {
    pub fn encode(response: &AuthResponse) -> Result<Self, AuthError> {
        let json = serde_json::to_vec(response)?;
        Ok(AuthToken(URL_SAFE_NO_PAD.encode(json)))
    }

    pub fn decode(&self) -> Result<AuthResponse, AuthError> {
        let json = URL_SAFE_NO_PAD.decode(self.0.as_bytes())?;
        Ok(serde_json::from_slice(&json)?)
    }

    /// Decode a token that must carry a full grant
    pub fn decode_granted(&self) -> Result<AuthGranted, AuthError> {
        match self.decode()? {
            AuthResponse::Granted(granted) => Ok(granted),
            AuthResponse::Shared(_) => Err(AuthError::UnexpectedToken("shared mdata")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_token_carries_grant() {
        let granted = AuthGranted {
            app_key: SecretKey::generate(),
            owner: SecretKey::generate().public(),
            access_container: AccessContainer::default(),
        };
        let token = AuthToken::encode(&AuthResponse::Granted(granted.clone())).unwrap();
        let decoded = AuthToken::from(token.to_string()).decode_granted().unwrap();
        assert_eq!(decoded.app_key.public(), granted.app_key.public());
        assert_eq!(decoded.owner, granted.owner);
    }

    #[test]
    fn test_share_token_is_not_a_grant() {
        let token = AuthToken::encode(&AuthResponse::Shared(SharedGrant {
            app_key: SecretKey::generate().public(),
            mdata: Vec::new(),
        }))
        .unwrap();
        assert!(matches!(token.decode(), Ok(AuthResponse::Shared(_))));
        assert!(matches!(
            token.decode_granted(),
            Err(AuthError::UnexpectedToken(_))
        ));
    }

    #[test]
    fn test_garbage_token() {
        let token = AuthToken::from("not a token!".to_string());
        assert!(matches!(token.decode(), Err(AuthError::TokenEncoding(_))));
    }
}
