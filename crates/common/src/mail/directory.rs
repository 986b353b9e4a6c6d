use crate::auth::PUBLIC_NAMES_CONTAINER;
use crate::crypto::name_hash;
use crate::network::{
    Action, Entries, EntryActions, MDataInfo, Metadata, Network, NetworkError, Value, XorName,
};
use crate::session::Session;

use super::constants::{
    MD_META_KEY, SERVICE_METADATA_DESCRIPTION, SERVICE_METADATA_NAME, SERVICE_NAME_POSTFIX,
    TYPE_TAG_DNS,
};
use super::error::MailError;

/// An email address split into its parts
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceInfo {
    pub email_id: String,
    pub public_id: String,
    /// Key of the service inside the public id's service directory
    pub service_name: String,
    pub service_address: XorName,
}

impl ServiceInfo {
    pub fn directory(&self) -> MDataInfo {
        service_directory(self.service_address)
    }
}

/// A public id registered in the account's public names container
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicIdEntry {
    pub id: String,
    pub service_address: XorName,
}

/// Deterministic address of a public id's service directory
pub fn service_address(public_id: &str) -> XorName {
    XorName(name_hash(public_id.as_bytes()))
}

pub fn service_directory(address: XorName) -> MDataInfo {
    MDataInfo::new_public(address, TYPE_TAG_DNS)
}

/// Split `[service.]publicId` and derive the service address
///
/// The public id is everything after the last dot and the service part
///  becomes `<service>@email`. A bare public id maps to the default
///  `@email` service; an empty service before the dot is invalid.
pub fn resolve_service_info(email_id: &str) -> Result<ServiceInfo, MailError> {
    let email_id = email_id.trim();
    let (service, public_id) = match email_id.rsplit_once('.') {
        Some(("", _)) => return Err(MailError::InvalidEmailId(email_id.to_string())),
        Some(split) => split,
        None => ("", email_id),
    };
    if public_id.is_empty() {
        return Err(MailError::InvalidEmailId(email_id.to_string()));
    }
    Ok(ServiceInfo {
        email_id: email_id.to_string(),
        public_id: public_id.to_string(),
        service_name: format!("{}{}", service, SERVICE_NAME_POSTFIX),
        service_address: service_address(public_id),
    })
}

/// Render a service key of a public id's directory back into an email
///  id, if it names an email service
pub fn email_id_for(service_key: &str, public_id: &str) -> Option<String> {
    let service = service_key.strip_suffix(SERVICE_NAME_POSTFIX)?;
    if service.is_empty() {
        Some(public_id.to_string())
    } else {
        Some(format!("{}.{}", service, public_id))
    }
}

/// Resolves public ids to service directories and maintains both the
///  public names container and the directories themselves
#[derive(Clone, Debug)]
pub struct Directory<N: Network> {
    session: Session<N>,
}

impl<N: Network> Directory<N> {
    pub fn new(session: Session<N>) -> Self {
        Self { session }
    }

    fn public_names(&self) -> Result<MDataInfo, MailError> {
        Ok(self.session.container(PUBLIC_NAMES_CONTAINER)?)
    }

    /// The service address registered for `public_id`, `None` if the id was
    ///  never registered
    pub async fn lookup_service_directory(
        &self,
        public_id: &str,
    ) -> Result<Option<XorName>, MailError> {
        let names = self.public_names()?;
        let key = names.enc_entry_key(public_id.as_bytes())?;
        let value = match self.session.get_value(&names, &key).await {
            Ok(value) if !value.is_tombstone() => value,
            Ok(_) | Err(NetworkError::NoSuchEntry(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let address = names.decrypt(&value.content)?;
        XorName::from_slice(&address)
            .map(Some)
            .ok_or_else(|| MailError::Decryption(format!("bad service address for {}", public_id)))
    }

    /// Record `public_id -> address` in the public names container
    pub async fn register_service_directory(
        &self,
        public_id: &str,
        address: XorName,
    ) -> Result<(), MailError> {
        let names = self.public_names()?;
        let key = names.enc_entry_key(public_id.as_bytes())?;
        let value = names.enc_entry_value(&address.0)?;
        self.session
            .mutate(&names, EntryActions::new().ins(key, value, 0))
            .await?;
        tracing::info!("registered public id {}", public_id);
        Ok(())
    }

    /// Create the service directory for a new public id with its first
    ///  service already in it
    pub async fn create_service_directory(
        &self,
        info: &ServiceInfo,
        inbox: &MDataInfo,
    ) -> Result<(), MailError> {
        let metadata = Metadata {
            name: format!("{}: '{}'", SERVICE_METADATA_NAME, info.public_id),
            description: format!("{}: '{}'", SERVICE_METADATA_DESCRIPTION, info.public_id),
        };
        let entries: Entries = [(
            info.service_name.clone().into_bytes(),
            Value {
                content: inbox.serialise(),
                entry_version: 0,
            },
        )]
        .into();
        self.session
            .put_mdata(&info.directory(), entries, Some(metadata))
            .await?;
        tracing::info!("created service directory for {}", info.public_id);
        Ok(())
    }

    /// Whether a live service is already registered under `service_name`
    pub async fn service_exists(
        &self,
        address: XorName,
        service_name: &str,
    ) -> Result<bool, MailError> {
        match self
            .session
            .get_value(&service_directory(address), service_name.as_bytes())
            .await
        {
            Ok(value) => Ok(!value.is_tombstone()),
            Err(NetworkError::NoSuchEntry(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether this app may add services to an existing directory
    pub async fn can_attach(&self, address: XorName) -> Result<bool, MailError> {
        match self
            .session
            .own_permissions(&service_directory(address))
            .await
        {
            Ok(permissions) => Ok(permissions.is_allowed(Action::Insert)),
            Err(NetworkError::NoSuchUser(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Map `service_name` to `inbox` in an existing service directory
    pub async fn attach_service(
        &self,
        address: XorName,
        service_name: &str,
        inbox: &MDataInfo,
    ) -> Result<(), MailError> {
        let directory = service_directory(address);
        let actions = match self
            .session
            .get_value(&directory, service_name.as_bytes())
            .await
        {
            Ok(value) if value.is_tombstone() => EntryActions::new().update(
                service_name.as_bytes().to_vec(),
                inbox.serialise(),
                value.entry_version + 1,
            ),
            Ok(_) => return Err(MailError::ServiceExists(service_name.to_string())),
            Err(NetworkError::NoSuchEntry(_)) => {
                EntryActions::new().ins(service_name.as_bytes().to_vec(), inbox.serialise(), 0)
            }
            Err(e) => return Err(e.into()),
        };
        self.session.mutate(&directory, actions).await?;
        tracing::info!("attached service {} to {}", service_name, address);
        Ok(())
    }

    /// The inbox a service is mapped to
    ///
    /// A missing directory, service key or removed service means the email
    ///  id is unknown. Transport and authorisation failures pass through.
    pub async fn service_inbox(&self, info: &ServiceInfo) -> Result<MDataInfo, MailError> {
        let not_found = || MailError::EmailIdNotFound(info.email_id.clone());
        let value = match self
            .session
            .get_value(&info.directory(), info.service_name.as_bytes())
            .await
        {
            Ok(value) => value,
            Err(e @ (NetworkError::NoSuchData(_) | NetworkError::NoSuchEntry(_))) => {
                tracing::debug!("service lookup for {} failed: {}", info.email_id, e);
                return Err(not_found());
            }
            Err(e) => return Err(e.into()),
        };
        if value.is_tombstone() {
            return Err(not_found());
        }
        MDataInfo::deserialise(&value.content).map_err(|_| not_found())
    }

    /// Every public id registered for this account
    pub async fn fetch_public_ids(&self) -> Result<Vec<PublicIdEntry>, MailError> {
        let names = self.public_names()?;
        let mut ids = Vec::new();
        for (key, value) in self.session.list_entries(&names).await? {
            if value.is_tombstone() {
                continue;
            }
            let id = String::from_utf8_lossy(&names.decrypt(&key)?).into_owned();
            if id == MD_META_KEY {
                continue;
            }
            let address = names.decrypt(&value.content)?;
            match XorName::from_slice(&address) {
                Some(service_address) => ids.push(PublicIdEntry {
                    id,
                    service_address,
                }),
                None => tracing::warn!("skipping public id {} with bad service address", id),
            }
        }
        Ok(ids)
    }

    /// Every email id hosted under this account's public ids
    pub async fn fetch_email_ids(&self) -> Result<Vec<String>, MailError> {
        let public_ids = self.fetch_public_ids().await?;
        self.email_ids_of(&public_ids).await
    }

    /// The email ids hosted under already fetched public ids
    pub async fn email_ids_of(
        &self,
        public_ids: &[PublicIdEntry],
    ) -> Result<Vec<String>, MailError> {
        let mut email_ids = Vec::new();
        for public_id in public_ids {
            let directory = service_directory(public_id.service_address);
            for (key, value) in self.session.list_entries(&directory).await? {
                if value.is_tombstone() {
                    continue;
                }
                if let Some(email_id) = email_id_for(&String::from_utf8_lossy(&key), &public_id.id)
                {
                    email_ids.push(email_id);
                }
            }
        }
        Ok(email_ids)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_resolve_default_service() {
        let info = resolve_service_info("alice").unwrap();
        assert_eq!(info.public_id, "alice");
        assert_eq!(info.service_name, "@email");
        assert_eq!(info.service_address, service_address("alice"));
    }

    #[test]
    fn test_resolve_named_service() {
        let info = resolve_service_info("work.alice").unwrap();
        assert_eq!(info.public_id, "alice");
        assert_eq!(info.service_name, "work@email");
        // same public id, same directory
        assert_eq!(
            info.service_address,
            resolve_service_info("alice").unwrap().service_address
        );
    }

    #[test]
    fn test_service_address_is_deterministic() {
        assert_eq!(service_address("bob"), service_address("bob"));
        assert_ne!(service_address("bob"), service_address("alice"));
    }

    #[test]
    fn test_invalid_email_ids() {
        assert!(matches!(
            resolve_service_info(""),
            Err(MailError::InvalidEmailId(_))
        ));
        assert!(matches!(
            resolve_service_info("work."),
            Err(MailError::InvalidEmailId(_))
        ));
        // the default service is only spelled as a bare public id
        assert!(matches!(
            resolve_service_info(".alice"),
            Err(MailError::InvalidEmailId(_))
        ));
    }

    #[test]
    fn test_email_id_for() {
        assert_eq!(email_id_for("@email", "alice").unwrap(), "alice");
        assert_eq!(email_id_for("work@email", "alice").unwrap(), "work.alice");
        assert!(email_id_for("www", "alice").is_none());
        assert!(email_id_for(MD_META_KEY, "alice").is_none());
    }
}
