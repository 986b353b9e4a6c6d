use uuid::Uuid;

use crate::network::NetworkError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("malformed auth token: {0}")]
    TokenEncoding(#[from] base64::DecodeError),
    #[error("malformed auth grant: {0}")]
    TokenPayload(#[from] serde_json::Error),
    /// The grant was rejected by the network (revoked or unknown app key)
    #[error("stored authorisation is no longer valid")]
    StaleAuthorization,
    #[error("expected a full grant, got a {0} token")]
    UnexpectedToken(&'static str),
    #[error("token was issued to a different app")]
    ForeignToken,
    #[error("no pending request with id {0}")]
    NoSuchRequest(Uuid),
    #[error("container {0} was not granted")]
    NoSuchContainer(String),
    #[error("network error: {0}")]
    Network(#[from] NetworkError),
    #[error("token store i/o error: {0}")]
    Io(#[from] std::io::Error),
}
