use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::crypto::{PublicKey, Secret, SecretError};

/// Size of a network address in bytes
pub const XOR_NAME_LEN: usize = 32;

/// A 256-bit network address
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct XorName(pub [u8; XOR_NAME_LEN]);

impl std::fmt::Debug for XorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "XorName({})", &self.to_hex()[..12])
    }
}

impl std::fmt::Display for XorName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; XOR_NAME_LEN]> for XorName {
    fn from(bytes: [u8; XOR_NAME_LEN]) -> Self {
        XorName(bytes)
    }
}

impl XorName {
    pub fn random() -> Self {
        let mut bytes = [0u8; XOR_NAME_LEN];
        getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
        XorName(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != XOR_NAME_LEN {
            return None;
        }
        let mut buff = [0u8; XOR_NAME_LEN];
        buff.copy_from_slice(bytes);
        Some(XorName(buff))
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let mut buff = [0u8; XOR_NAME_LEN];
        hex::decode_to_slice(hex, &mut buff).ok()?;
        Some(XorName(buff))
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Location of a mutable data container: its name plus a type tag that
///  namespaces what kind of container lives there
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MdAddress {
    pub name: XorName,
    pub type_tag: u64,
}

impl std::fmt::Display for MdAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.type_tag, &self.name.to_hex()[..12])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MdKind {
    /// Readable by anyone; entries stored as given
    Public,
    /// Readable by the owner and principals granted `Read`
    Private,
}

/// Serialisable reference to a mutable data container
///
/// For private containers this also carries the container-local
///  [`Secret`] used to encrypt entry keys and values, so holding the
///  reference is what lets a client read the container's contents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MDataInfo {
    pub name: XorName,
    pub type_tag: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    enc_info: Option<Secret>,
}

impl MDataInfo {
    pub fn new_public(name: XorName, type_tag: u64) -> Self {
        Self {
            name,
            type_tag,
            enc_info: None,
        }
    }

    pub fn new_private(name: XorName, type_tag: u64, secret: Secret) -> Self {
        Self {
            name,
            type_tag,
            enc_info: Some(secret),
        }
    }

    pub fn random_public(type_tag: u64) -> Self {
        Self::new_public(XorName::random(), type_tag)
    }

    pub fn random_private(type_tag: u64) -> Self {
        Self::new_private(XorName::random(), type_tag, Secret::generate())
    }

    pub fn address(&self) -> MdAddress {
        MdAddress {
            name: self.name,
            type_tag: self.type_tag,
        }
    }

    pub fn kind(&self) -> MdKind {
        match self.enc_info {
            Some(_) => MdKind::Private,
            None => MdKind::Public,
        }
    }

    /// Encrypt an entry key for lookup in this container
    ///
    /// Deterministic for private containers, identity for public ones.
    pub fn enc_entry_key(&self, key: &[u8]) -> Result<Vec<u8>, SecretError> {
        match &self.enc_info {
            Some(secret) => secret.encrypt_deterministic(key),
            None => Ok(key.to_vec()),
        }
    }

    /// Encrypt an entry value for storage in this container
    pub fn enc_entry_value(&self, value: &[u8]) -> Result<Vec<u8>, SecretError> {
        match &self.enc_info {
            Some(secret) => secret.encrypt(value),
            None => Ok(value.to_vec()),
        }
    }

    /// Decrypt an entry key or value read from this container
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        match &self.enc_info {
            Some(secret) => secret.decrypt(data),
            None => Ok(data.to_vec()),
        }
    }

    pub fn serialise(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("mdata info is always serialisable")
    }

    pub fn deserialise(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// An entry value together with its version
///
/// A removed entry stays listed as a tombstone: empty content and a
///  bumped version.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub content: Vec<u8>,
    pub entry_version: u64,
}

impl Value {
    pub fn is_tombstone(&self) -> bool {
        self.content.is_empty()
    }
}

pub type Entries = BTreeMap<Vec<u8>, Value>;

/// A single entry mutation. Versions name the successor version, i.e.
///  the current entry version plus one.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryAction {
    Ins(Value),
    Update(Value),
    Del(u64),
}

/// Batch of entry mutations applied atomically to one container
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryActions {
    actions: BTreeMap<Vec<u8>, EntryAction>,
}

impl EntryActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ins(mut self, key: Vec<u8>, content: Vec<u8>, version: u64) -> Self {
        self.actions.insert(
            key,
            EntryAction::Ins(Value {
                content,
                entry_version: version,
            }),
        );
        self
    }

    pub fn update(mut self, key: Vec<u8>, content: Vec<u8>, version: u64) -> Self {
        self.actions.insert(
            key,
            EntryAction::Update(Value {
                content,
                entry_version: version,
            }),
        );
        self
    }

    pub fn del(mut self, key: Vec<u8>, version: u64) -> Self {
        self.actions.insert(key, EntryAction::Del(version));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn into_actions(self) -> BTreeMap<Vec<u8>, EntryAction> {
        self.actions
    }
}

/// Operations a principal can be allowed on a container
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Action {
    Insert,
    Update,
    Delete,
    ManagePermissions,
    Read,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Insert => "Insert",
            Action::Update => "Update",
            Action::Delete => "Delete",
            Action::ManagePermissions => "ManagePermissions",
            Action::Read => "Read",
        };
        write!(f, "{}", name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    allowed: BTreeSet<Action>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, action: Action) -> Self {
        self.allowed.insert(action);
        self
    }

    /// Every action, as granted to the app that creates a container
    pub fn all() -> Self {
        [
            Action::Insert,
            Action::Update,
            Action::Delete,
            Action::ManagePermissions,
            Action::Read,
        ]
        .into_iter()
        .fold(Self::new(), Self::allow)
    }

    pub fn is_allowed(&self, action: Action) -> bool {
        self.allowed.contains(&action)
    }

    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.allowed.iter()
    }
}

impl FromIterator<Action> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self {
            allowed: iter.into_iter().collect(),
        }
    }
}

/// A principal in a container's permission table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum User {
    /// Any requester, authenticated or not
    Anyone,
    Key(PublicKey),
}

/// Human-readable description attached to a container at creation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    pub description: String,
}

/// Everything needed to create a container on the network
#[derive(Clone, Debug)]
pub struct NewMutableData {
    pub info: MDataInfo,
    pub owner: PublicKey,
    pub entries: Entries,
    pub permissions: BTreeMap<User, PermissionSet>,
    pub metadata: Option<Metadata>,
}

/// Containers an app was granted, with the permissions it holds on each
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessContainer {
    pub containers: BTreeMap<String, (MDataInfo, PermissionSet)>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NetworkState {
    Connected,
    Disconnected,
}

/// Observer invoked on every network state transition
pub type NetworkStatusCallback = Arc<dyn Fn(NetworkState) + Send + Sync>;
