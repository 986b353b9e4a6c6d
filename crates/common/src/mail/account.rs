use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crypto::{EncKeyPair, EncPublicKey};
use crate::network::{MDataInfo, XorName};

use super::error::MailError;
use super::mailbox::{Mailbox, MailboxKind};

/// An active email account: its id, mail containers and key pair
#[derive(Clone, Debug)]
pub struct Account {
    pub id: String,
    pub inbox: Mailbox,
    pub archive: Mailbox,
    pub keys: EncKeyPair,
}

impl Account {
    pub fn enc_public_key(&self) -> &EncPublicKey {
        self.keys.public()
    }

    pub fn mailbox(&self, kind: MailboxKind) -> &Mailbox {
        match kind {
            MailboxKind::Inbox => &self.inbox,
            MailboxKind::Archive => &self.archive,
        }
    }
}

/// An email service waiting on shared access to an existing directory
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingService {
    pub email_id: String,
    pub service_name: String,
    pub service_address: XorName,
    /// Id of the share request issued to the authenticator
    pub request: Uuid,
}

#[derive(Debug)]
pub enum SetupOutcome {
    Created(Account),
    /// Account creation resumes with
    ///  [`MailClient::connect_with_shared_md`](super::MailClient::connect_with_shared_md)
    ///  once the share is granted
    SharePending(PendingService),
}

/// The bundle stored in the app's own container, one per email id
#[derive(Serialize, Deserialize)]
pub(crate) struct StoredAccount {
    id: String,
    enc_public_key: String,
    enc_secret_key: String,
    inbox: MDataInfo,
    archive: MDataInfo,
}

impl From<&Account> for StoredAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            enc_public_key: account.keys.public().to_hex(),
            enc_secret_key: account.keys.secret().to_hex(),
            inbox: account.inbox.info.clone(),
            archive: account.archive.info.clone(),
        }
    }
}

impl TryFrom<StoredAccount> for Account {
    type Error = MailError;

    fn try_from(stored: StoredAccount) -> Result<Self, MailError> {
        let keys = EncKeyPair::from_hex(&stored.enc_public_key, &stored.enc_secret_key)
            .map_err(|e| MailError::Decryption(e.to_string()))?;
        Ok(Account {
            id: stored.id,
            inbox: Mailbox {
                kind: MailboxKind::Inbox,
                info: stored.inbox,
            },
            archive: Mailbox {
                kind: MailboxKind::Archive,
                info: stored.archive,
            },
            keys,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stored_account_rehydrates() {
        let account = Account {
            id: "alice".to_string(),
            inbox: Mailbox {
                kind: MailboxKind::Inbox,
                info: MDataInfo::random_public(15003),
            },
            archive: Mailbox {
                kind: MailboxKind::Archive,
                info: MDataInfo::random_private(15004),
            },
            keys: EncKeyPair::generate(),
        };
        let json = serde_json::to_vec(&StoredAccount::from(&account)).unwrap();
        let stored: StoredAccount = serde_json::from_slice(&json).unwrap();
        let back = Account::try_from(stored).unwrap();

        assert_eq!(back.id, "alice");
        assert_eq!(back.inbox, account.inbox);
        assert_eq!(back.archive, account.archive);
        assert_eq!(back.enc_public_key(), account.enc_public_key());
    }
}
