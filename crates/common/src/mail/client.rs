use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use crate::auth::{AuthBridge, AuthToken, ShareMData};
use crate::crypto::{open, seal, EncKeyPair, EncPublicKey};
use crate::network::{Action, EntryActions, Network, NetworkError, PermissionSet, XorName};
use crate::session::Session;

use super::account::{Account, PendingService, SetupOutcome, StoredAccount};
use super::constants::{MD_KEY_EMAIL_ENC_PUBLIC_KEY, TYPE_TAG_DNS};
use super::directory::{resolve_service_info, Directory, PublicIdEntry};
use super::email::{Email, ReadReport, ReceivedEmail};
use super::error::{MailError, Step, StepExt};
use super::mailbox::{Mailbox, MailboxKind, MailboxStore};

/// Fresh opaque key for a delivered or archived entry
fn random_entry_key() -> String {
    Uuid::new_v4().simple().to_string()
}

/// The inbox's public key entry is not an email and never leaves the inbox
fn ensure_email_key(kind: MailboxKind, key: &str) -> Result<(), MailError> {
    if kind == MailboxKind::Inbox && key == MD_KEY_EMAIL_ENC_PUBLIC_KEY {
        return Err(MailError::NotFound(key.to_string()));
    }
    Ok(())
}

/// Account-level mail operations over one session
#[derive(Clone, Debug)]
pub struct MailClient<N: Network> {
    bridge: AuthBridge<N>,
    session: Session<N>,
    directory: Directory<N>,
    mailboxes: MailboxStore<N>,
}

impl<N: Network> MailClient<N> {
    pub fn new(bridge: AuthBridge<N>, session: Session<N>) -> Self {
        Self {
            directory: Directory::new(session.clone()),
            mailboxes: MailboxStore::new(session.clone()),
            bridge,
            session,
        }
    }

    pub fn session(&self) -> &Session<N> {
        &self.session
    }

    pub fn directory(&self) -> &Directory<N> {
        &self.directory
    }

    pub fn mailboxes(&self) -> &MailboxStore<N> {
        &self.mailboxes
    }

    /// Register an email id for this account
    ///
    /// A public id seen for the first time gets a new service directory
    ///  and public names entry. For a known public id the service is
    ///  attached to its existing directory, or, when this app may not
    ///  insert there, a share request is issued and the setup finishes in
    ///  [`MailClient::connect_with_shared_md`]. The new account's config is
    ///  written before returning.
    pub async fn setup_account(&self, email_id: &str) -> Result<SetupOutcome, MailError> {
        let info = resolve_service_info(email_id)?;

        let Some(address) = self
            .directory
            .lookup_service_directory(&info.public_id)
            .await?
        else {
            let account = self.new_account(&info.email_id).await?;
            self.directory
                .create_service_directory(&info, &account.inbox.info)
                .await
                .step(Step::CreateServiceDirectory)?;
            self.directory
                .register_service_directory(&info.public_id, info.service_address)
                .await
                .step(Step::RegisterPublicId)?;
            self.write_account(&account).await.step(Step::WriteConfig)?;
            tracing::info!("created email id {} with a new public id", info.email_id);
            return Ok(SetupOutcome::Created(account));
        };

        if self
            .directory
            .service_exists(address, &info.service_name)
            .await?
        {
            return Err(MailError::ServiceExists(info.email_id));
        }

        if self.directory.can_attach(address).await? {
            let account = self
                .register_email_service(&info.email_id, address, &info.service_name)
                .await?;
            return Ok(SetupOutcome::Created(account));
        }

        tracing::info!(
            "no insert permission on the service directory of {}, requesting share",
            info.public_id
        );
        let request = self
            .bridge
            .request_shared_container_access(
                &self.session,
                vec![ShareMData {
                    type_tag: TYPE_TAG_DNS,
                    name: address,
                    permissions: PermissionSet::new().allow(Action::Insert),
                }],
            )
            .await
            .step(Step::RequestShare)?;
        Ok(SetupOutcome::SharePending(PendingService {
            email_id: info.email_id,
            service_name: info.service_name,
            service_address: address,
            request,
        }))
    }

    /// Finish a setup that was waiting on a share grant
    pub async fn connect_with_shared_md(
        &self,
        token: &AuthToken,
        pending: &PendingService,
    ) -> Result<Account, MailError> {
        self.bridge.login_from_token(&self.session, token).await?;
        self.register_email_service(
            &pending.email_id,
            pending.service_address,
            &pending.service_name,
        )
        .await
    }

    async fn new_account(&self, email_id: &str) -> Result<Account, MailError> {
        let keys = EncKeyPair::generate();
        let inbox = self
            .mailboxes
            .create_inbox(keys.public())
            .await
            .step(Step::CreateInbox)?;
        let archive = self
            .mailboxes
            .create_archive()
            .await
            .step(Step::CreateArchive)?;
        Ok(Account {
            id: email_id.to_string(),
            inbox,
            archive,
            keys,
        })
    }

    async fn register_email_service(
        &self,
        email_id: &str,
        address: XorName,
        service_name: &str,
    ) -> Result<Account, MailError> {
        let account = self.new_account(email_id).await?;
        self.directory
            .attach_service(address, service_name, &account.inbox.info)
            .await
            .step(Step::AttachService)?;
        self.write_account(&account).await.step(Step::WriteConfig)?;
        tracing::info!("attached email id {} to an existing public id", email_id);
        Ok(account)
    }

    /// Load the account stored for `email_id` in the app's own container
    pub async fn read_account(&self, email_id: &str) -> Result<Account, MailError> {
        let own = self.session.own_container()?;
        let key = own.enc_entry_key(email_id.as_bytes())?;
        let value = match self.session.get_value(&own, &key).await {
            Ok(value) if !value.is_tombstone() => value,
            Ok(_) | Err(NetworkError::NoSuchEntry(_)) => {
                return Err(MailError::NotFound(email_id.to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        let stored: StoredAccount = serde_json::from_slice(&own.decrypt(&value.content)?)?;
        let mut account = Account::try_from(stored)?;
        account.id = email_id.to_string();
        Ok(account)
    }

    /// Store the account bundle, replacing any earlier one for its id
    pub async fn write_account(&self, account: &Account) -> Result<(), MailError> {
        let own = self.session.own_container()?;
        let key = own.enc_entry_key(account.id.as_bytes())?;
        let value = own.enc_entry_value(&serde_json::to_vec(&StoredAccount::from(account))?)?;
        let actions = match self.session.get_value(&own, &key).await {
            Ok(existing) => EntryActions::new().update(key, value, existing.entry_version + 1),
            Err(NetworkError::NoSuchEntry(_)) => EntryActions::new().ins(key, value, 0),
            Err(e) => return Err(e.into()),
        };
        self.session.mutate(&own, actions).await?;
        tracing::debug!("wrote account config for {}", account.id);
        Ok(())
    }

    /// Seal `email` for the owner of `to` and drop it in their inbox,
    ///  returning the inbox entry key
    pub async fn send_email<E: Serialize + Sync>(
        &self,
        email: &E,
        to: &str,
    ) -> Result<String, MailError> {
        let info = resolve_service_info(to)?;
        let inbox = Mailbox {
            kind: MailboxKind::Inbox,
            info: self.directory.service_inbox(&info).await?,
        };

        let pk_entry = match self
            .mailboxes
            .get(&inbox, MD_KEY_EMAIL_ENC_PUBLIC_KEY.as_bytes())
            .await
        {
            Ok(entry) => entry,
            Err(MailError::NotFound(_)) => {
                return Err(MailError::EmailIdNotFound(info.email_id.clone()))
            }
            Err(e) => return Err(e),
        };
        let pk = std::str::from_utf8(&pk_entry.value)
            .ok()
            .and_then(|hex| EncPublicKey::from_hex(hex).ok())
            .ok_or_else(|| {
                MailError::Default(anyhow::anyhow!("inbox of {} has a malformed key", to))
            })?;

        let content = seal(&serde_json::to_vec(email)?, &pk)?;
        let address = self.session.put_idata(content).await?;
        let pointer = seal(address.to_hex().as_bytes(), &pk)?;

        let key = random_entry_key();
        self.mailboxes
            .insert(&inbox, key.as_bytes(), &pointer, 0)
            .await?;
        tracing::info!("delivered email to {}", info.email_id);
        Ok(key)
    }

    async fn open_email(&self, account: &Account, pointer: &[u8]) -> Result<Email, MailError> {
        let address = open(pointer, &account.keys)?;
        let address = std::str::from_utf8(&address)
            .ok()
            .and_then(XorName::from_hex)
            .ok_or_else(|| MailError::Decryption("pointer is not a content address".to_string()))?;
        let content = self.session.get_idata(&address).await?;
        let json = open(&content, &account.keys)?;
        Ok(serde_json::from_slice(&json)?)
    }

    async fn read_mailbox<F>(
        &self,
        account: &Account,
        kind: MailboxKind,
        mut on_email: F,
    ) -> Result<ReadReport, MailError>
    where
        F: FnMut(ReceivedEmail) + Send,
    {
        let mailbox = account.mailbox(kind);
        let entries = self.mailboxes.list_entries(mailbox).await?;
        let mut report = ReadReport {
            total_entries: entries.len(),
            ..Default::default()
        };

        let mut live = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("skipping undecryptable {} entry: {}", kind, e);
                    report.failures.push((String::new(), e.to_string()));
                    continue;
                }
            };
            if entry.is_tombstone()
                || (kind == MailboxKind::Inbox
                    && entry.key == MD_KEY_EMAIL_ENC_PUBLIC_KEY.as_bytes())
            {
                continue;
            }
            live.push(entry);
        }

        // fetch contents concurrently, deliver in key order
        let opened = join_all(live.iter().map(|entry| self.open_email(account, &entry.value))).await;
        for (entry, result) in live.iter().zip(opened) {
            let key = entry.key_string();
            match result {
                Ok(email) => {
                    on_email(ReceivedEmail { key, email });
                    report.delivered += 1;
                }
                Err(
                    e @ (MailError::Decryption(_)
                    | MailError::NotFound(_)
                    | MailError::Document(_)),
                ) => {
                    tracing::warn!("skipping {} entry {}: {}", kind, key, e);
                    report.failures.push((key, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Open every email in the inbox, handing each to `on_email`
    ///
    /// Entries that fail to open are reported, not fatal.
    pub async fn read_inbox<F>(&self, account: &Account, on_email: F) -> Result<ReadReport, MailError>
    where
        F: FnMut(ReceivedEmail) + Send,
    {
        self.read_mailbox(account, MailboxKind::Inbox, on_email)
            .await
    }

    pub async fn read_archive<F>(
        &self,
        account: &Account,
        on_email: F,
    ) -> Result<ReadReport, MailError>
    where
        F: FnMut(ReceivedEmail) + Send,
    {
        self.read_mailbox(account, MailboxKind::Archive, on_email)
            .await
    }

    /// Move an inbox entry into the archive, returning its archive key
    pub async fn archive_email(&self, account: &Account, key: &str) -> Result<String, MailError> {
        ensure_email_key(MailboxKind::Inbox, key)?;
        let new_key = random_entry_key();
        self.mailboxes
            .move_entry(
                &account.inbox,
                &account.archive,
                key.as_bytes(),
                new_key.as_bytes(),
            )
            .await?;
        tracing::info!("archived {} as {}", key, new_key);
        Ok(new_key)
    }

    /// Remove an entry at whatever version it currently has
    pub async fn delete_email(
        &self,
        account: &Account,
        kind: MailboxKind,
        key: &str,
    ) -> Result<(), MailError> {
        ensure_email_key(kind, key)?;
        let mailbox = account.mailbox(kind);
        let entry = self.mailboxes.get(mailbox, key.as_bytes()).await?;
        self.mailboxes
            .remove(mailbox, key.as_bytes(), entry.version + 1)
            .await
    }

    /// Remove an entry naming the version the removal should produce;
    ///  fails with a version conflict if the entry moved on
    pub async fn delete_email_at(
        &self,
        account: &Account,
        kind: MailboxKind,
        key: &str,
        version: u64,
    ) -> Result<(), MailError> {
        ensure_email_key(kind, key)?;
        self.mailboxes
            .remove(account.mailbox(kind), key.as_bytes(), version)
            .await
    }

    pub async fn fetch_public_ids(&self) -> Result<Vec<PublicIdEntry>, MailError> {
        self.directory.fetch_public_ids().await
    }

    pub async fn fetch_email_ids(&self) -> Result<Vec<String>, MailError> {
        self.directory.fetch_email_ids().await
    }

    pub async fn email_ids_of(
        &self,
        public_ids: &[PublicIdEntry],
    ) -> Result<Vec<String>, MailError> {
        self.directory.email_ids_of(public_ids).await
    }
}
