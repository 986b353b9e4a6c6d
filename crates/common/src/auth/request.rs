use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crypto::PublicKey;
use crate::network::{Action, PermissionSet, XorName};

/// Shared container every account keeps its registered public ids in
pub const PUBLIC_NAMES_CONTAINER: &str = "_publicNames";

/// Identity an app presents to the authenticator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    pub id: String,
    pub name: String,
    pub vendor: String,
}

impl AppInfo {
    /// Name of the app's own private container in the access container
    pub fn own_container(&self) -> String {
        format!("apps/{}", self.id)
    }
}

/// Request for an account-wide grant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub app: AppInfo,
    /// Whether the app wants a private container of its own
    pub own_container: bool,
    pub containers: BTreeMap<String, PermissionSet>,
}

impl AuthRequest {
    /// What the mail client asks for: read and insert on the public names
    ///  container, plus an own container for account configs
    pub fn mail(app: AppInfo) -> Self {
        let mut containers = BTreeMap::new();
        containers.insert(
            PUBLIC_NAMES_CONTAINER.to_string(),
            PermissionSet::new()
                .allow(Action::Read)
                .allow(Action::Insert),
        );
        Self {
            app,
            own_container: true,
            containers,
        }
    }
}

/// One container an app wants extra permissions on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareMData {
    pub type_tag: u64,
    pub name: XorName,
    pub permissions: PermissionSet,
}

/// Request for elevated permissions on containers the app did not create
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareMDataRequest {
    pub app: AppInfo,
    pub app_key: PublicKey,
    pub mdata: Vec<ShareMData>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_mail_request() {
        let app = AppInfo {
            id: "net.sealmail".to_string(),
            name: "Sealmail".to_string(),
            vendor: "Sealmail".to_string(),
        };
        let request = AuthRequest::mail(app.clone());
        assert!(request.own_container);
        let perms = request.containers.get(PUBLIC_NAMES_CONTAINER).unwrap();
        assert!(perms.is_allowed(Action::Read));
        assert!(perms.is_allowed(Action::Insert));
        assert!(!perms.is_allowed(Action::Delete));
        assert_eq!(app.own_container(), "apps/net.sealmail");
    }
}
