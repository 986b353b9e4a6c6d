//! End-to-end encrypted mail over the storage network
//!
//! Each email id maps to a service entry in its public id's service
//!  directory, pointing at an inbox anyone may insert into. Senders seal
//!  the email for the inbox owner's key, store it as immutable data and
//!  insert a sealed pointer to it under a random key. Owners open
//!  pointers and content with their key pair, and move or remove entries
//!  with version-gated mutations.

mod account;
mod client;
pub mod constants;
mod directory;
mod email;
mod error;
mod mailbox;

pub use account::{Account, PendingService, SetupOutcome};
pub use client::MailClient;
pub use directory::{
    email_id_for, resolve_service_info, service_address, service_directory, Directory,
    PublicIdEntry, ServiceInfo,
};
pub use email::{Email, ReadReport, ReceivedEmail};
pub use error::{MailError, Step};
pub use mailbox::{Mailbox, MailboxEntries, MailboxEntry, MailboxKind, MailboxStore};
