use crate::auth::AuthError;
use crate::crypto::{SealError, SecretError};
use crate::network::{Action, NetworkError};

/// A step of a multi-step operation that has no rollback
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    CreateInbox,
    CreateArchive,
    CreateServiceDirectory,
    RegisterPublicId,
    AttachService,
    RequestShare,
    WriteConfig,
    InboxInsert,
    ArchiveInsert,
    InboxRemove,
    ArchiveRemove,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::CreateInbox => "create inbox",
            Step::CreateArchive => "create archive",
            Step::CreateServiceDirectory => "create service directory",
            Step::RegisterPublicId => "register public id",
            Step::AttachService => "attach service",
            Step::RequestShare => "request shared access",
            Step::WriteConfig => "write account config",
            Step::InboxInsert => "insert into inbox",
            Step::ArchiveInsert => "insert into archive",
            Step::InboxRemove => "remove from inbox",
            Step::ArchiveRemove => "remove from archive",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {action} on {container}")]
    PermissionDenied { container: String, action: Action },
    /// `expected` is the version the mutation named, `actual` the entry's
    ///  current version
    #[error("version conflict on {container} entry {key}: named version {expected}, entry is at {actual}")]
    VersionConflict {
        container: String,
        key: String,
        expected: u64,
        actual: u64,
    },
    #[error("decryption failed: {0}")]
    Decryption(String),
    #[error("email id not found: {0}")]
    EmailIdNotFound(String),
    #[error("authorisation is no longer valid")]
    StaleAuthorization,
    #[error("email service already exists: {0}")]
    ServiceExists(String),
    #[error("invalid email id: {0:?}")]
    InvalidEmailId(String),
    /// A composite operation failed part way; earlier steps stay applied
    #[error("{step} failed: {source}")]
    StepFailed {
        step: Step,
        #[source]
        source: Box<MailError>,
    },
    #[error("network error: {0}")]
    Network(NetworkError),
    #[error("auth error: {0}")]
    Auth(AuthError),
    #[error("malformed document: {0}")]
    Document(#[from] serde_json::Error),
}

impl From<NetworkError> for MailError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::NoSuchData(address) => MailError::NotFound(address.to_string()),
            NetworkError::NoSuchEntry(key) => MailError::NotFound(key),
            NetworkError::NoSuchIData(name) => MailError::NotFound(name.to_string()),
            NetworkError::AccessDenied {
                action, address, ..
            } => MailError::PermissionDenied {
                container: address.to_string(),
                action,
            },
            NetworkError::InvalidSuccessor {
                address,
                key,
                current,
                requested,
            } => MailError::VersionConflict {
                container: address.to_string(),
                key,
                expected: requested,
                actual: current,
            },
            NetworkError::UnknownApp(_) => MailError::StaleAuthorization,
            e => MailError::Network(e),
        }
    }
}

impl From<AuthError> for MailError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::StaleAuthorization => MailError::StaleAuthorization,
            AuthError::Network(e) => e.into(),
            e => MailError::Auth(e),
        }
    }
}

impl From<SealError> for MailError {
    fn from(err: SealError) -> Self {
        MailError::Decryption(err.to_string())
    }
}

impl From<SecretError> for MailError {
    fn from(err: SecretError) -> Self {
        MailError::Decryption(err.to_string())
    }
}

/// Tag the error of one step of a composite operation
pub(crate) trait StepExt<T> {
    fn step(self, step: Step) -> Result<T, MailError>;
}

impl<T, E: Into<MailError>> StepExt<T> for Result<T, E> {
    fn step(self, step: Step) -> Result<T, MailError> {
        self.map_err(|e| MailError::StepFailed {
            step,
            source: Box::new(e.into()),
        })
    }
}

impl MailError {
    /// The error a step failure wraps, or the error itself
    pub fn root(&self) -> &MailError {
        match self {
            MailError::StepFailed { source, .. } => source.root(),
            e => e,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::network::{MdAddress, XorName};

    #[test]
    fn test_invalid_successor_is_version_conflict() {
        let address = MdAddress {
            name: XorName([7u8; 32]),
            type_tag: 15003,
        };
        let err: MailError = NetworkError::InvalidSuccessor {
            address,
            key: "k".to_string(),
            current: 1,
            requested: 1,
        }
        .into();
        assert!(matches!(
            err,
            MailError::VersionConflict {
                expected: 1,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_step_root() {
        let result: Result<(), NetworkError> = Err(NetworkError::NoSuchEntry("k".to_string()));
        let err = result.step(Step::InboxRemove).unwrap_err();
        assert_eq!(err.to_string(), "remove from inbox failed: not found: k");
        assert!(matches!(err.root(), MailError::NotFound(_)));
    }
}
