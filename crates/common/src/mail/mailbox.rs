use serde::{Deserialize, Serialize};

use crate::crypto::EncPublicKey;
use crate::network::{
    Action, Entries, EntryActions, MDataInfo, Network, NetworkError, PermissionSet, User, Value,
};
use crate::session::Session;

use super::constants::{MD_KEY_EMAIL_ENC_PUBLIC_KEY, TYPE_TAG_ARCHIVE, TYPE_TAG_INBOX};
use super::error::{MailError, Step, StepExt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MailboxKind {
    Inbox,
    Archive,
}

impl std::fmt::Display for MailboxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailboxKind::Inbox => write!(f, "inbox"),
            MailboxKind::Archive => write!(f, "archive"),
        }
    }
}

/// Handle on one of an account's mail containers
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mailbox {
    pub kind: MailboxKind,
    pub info: MDataInfo,
}

impl Mailbox {
    fn insert_step(&self) -> Step {
        match self.kind {
            MailboxKind::Inbox => Step::InboxInsert,
            MailboxKind::Archive => Step::ArchiveInsert,
        }
    }

    fn remove_step(&self) -> Step {
        match self.kind {
            MailboxKind::Inbox => Step::InboxRemove,
            MailboxKind::Archive => Step::ArchiveRemove,
        }
    }
}

/// A decrypted container entry
///
/// Removed entries come through with an empty value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailboxEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub version: u64,
}

impl MailboxEntry {
    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }

    pub fn key_string(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }
}

/// Entries of one listing request, decrypted one at a time as they are
///  pulled. Not restartable; list again for a fresh view.
pub struct MailboxEntries {
    info: MDataInfo,
    raw: std::collections::btree_map::IntoIter<Vec<u8>, Value>,
}

impl MailboxEntries {
    fn new(info: MDataInfo, entries: Entries) -> Self {
        Self {
            info,
            raw: entries.into_iter(),
        }
    }
}

impl Iterator for MailboxEntries {
    type Item = Result<MailboxEntry, MailError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.raw.next()?;
        Some(decrypt_entry(&self.info, &key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.raw.size_hint()
    }
}

impl ExactSizeIterator for MailboxEntries {}

fn decrypt_entry(info: &MDataInfo, key: &[u8], value: Value) -> Result<MailboxEntry, MailError> {
    let key = info.decrypt(key)?;
    let content = if value.is_tombstone() {
        Vec::new()
    } else {
        info.decrypt(&value.content)?
    };
    Ok(MailboxEntry {
        key,
        value: content,
        version: value.entry_version,
    })
}

/// Creates and mutates inboxes and archives
#[derive(Clone, Debug)]
pub struct MailboxStore<N: Network> {
    session: Session<N>,
}

impl<N: Network> MailboxStore<N> {
    pub fn new(session: Session<N>) -> Self {
        Self { session }
    }

    /// A public container at a random address, holding the owner's
    ///  encryption key, that anyone may insert into
    pub async fn create_inbox(&self, enc_pk: &EncPublicKey) -> Result<Mailbox, MailError> {
        let info = MDataInfo::random_public(TYPE_TAG_INBOX);
        let entries: Entries = [(
            MD_KEY_EMAIL_ENC_PUBLIC_KEY.as_bytes().to_vec(),
            Value {
                content: enc_pk.to_hex().into_bytes(),
                entry_version: 0,
            },
        )]
        .into();
        self.session.put_mdata(&info, entries, None).await?;
        self.session
            .set_user_permissions(
                &info,
                User::Anyone,
                PermissionSet::new().allow(Action::Insert),
                1,
            )
            .await?;
        tracing::debug!("created inbox {}", info.address());
        Ok(Mailbox {
            kind: MailboxKind::Inbox,
            info,
        })
    }

    /// An empty private container at a random address
    pub async fn create_archive(&self) -> Result<Mailbox, MailError> {
        let info = MDataInfo::random_private(TYPE_TAG_ARCHIVE);
        self.session
            .put_mdata(&info, Default::default(), None)
            .await?;
        tracing::debug!("created archive {}", info.address());
        Ok(Mailbox {
            kind: MailboxKind::Archive,
            info,
        })
    }

    pub async fn list_entries(&self, mailbox: &Mailbox) -> Result<MailboxEntries, MailError> {
        let entries = self.session.list_entries(&mailbox.info).await?;
        Ok(MailboxEntries::new(mailbox.info.clone(), entries))
    }

    /// A live entry; removed entries are reported as not found
    pub async fn get(&self, mailbox: &Mailbox, key: &[u8]) -> Result<MailboxEntry, MailError> {
        let enc_key = mailbox.info.enc_entry_key(key)?;
        let value = self.session.get_value(&mailbox.info, &enc_key).await?;
        if value.is_tombstone() {
            return Err(MailError::NotFound(String::from_utf8_lossy(key).into_owned()));
        }
        Ok(MailboxEntry {
            key: key.to_vec(),
            value: mailbox.info.decrypt(&value.content)?,
            version: value.entry_version,
        })
    }

    pub async fn insert(
        &self,
        mailbox: &Mailbox,
        key: &[u8],
        value: &[u8],
        version: u64,
    ) -> Result<(), MailError> {
        let actions = EntryActions::new().ins(
            mailbox.info.enc_entry_key(key)?,
            mailbox.info.enc_entry_value(value)?,
            version,
        );
        self.session.mutate(&mailbox.info, actions).await?;
        Ok(())
    }

    /// Remove an entry; `version` must be the successor of the entry's
    ///  current version
    pub async fn remove(&self, mailbox: &Mailbox, key: &[u8], version: u64) -> Result<(), MailError> {
        let actions = EntryActions::new().del(mailbox.info.enc_entry_key(key)?, version);
        self.session
            .mutate(&mailbox.info, actions)
            .await
            .map_err(|e| match e {
                NetworkError::NoSuchEntry(_) => {
                    MailError::NotFound(String::from_utf8_lossy(key).into_owned())
                }
                e => e.into(),
            })
    }

    /// Copy an entry to `dest` under `new_key`, then remove it from
    ///  `source`
    ///
    /// The two mutations are independent: if the removal fails the value
    ///  is left in both containers and the error names the failed step.
    pub async fn move_entry(
        &self,
        source: &Mailbox,
        dest: &Mailbox,
        key: &[u8],
        new_key: &[u8],
    ) -> Result<(), MailError> {
        let entry = self.get(source, key).await?;
        self.insert(dest, new_key, &entry.value, 0)
            .await
            .step(dest.insert_step())?;
        self.remove(source, key, entry.version + 1)
            .await
            .step(source.remove_step())?;
        Ok(())
    }
}
