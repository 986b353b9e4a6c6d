/**
 * Authorization against the network.
 *  - Requests to an external authenticator
 *  - Capability tokens and where they are kept
 *  - Turning a token into a session
 */
pub mod auth;
/**
 * Cryptographic types and operations.
 *  - Signing identities for apps and account owners
 *  - Sealed boxes for mail content
 *  - Container-level symmetric encryption
 */
pub mod crypto;
/**
 * Mail protocol: directories, mailboxes, accounts.
 */
pub mod mail;
/**
 * The permissioned storage network and a local
 *  implementation of it, backed by an iroh-blobs
 *  store for immutable data.
 */
pub mod network;
/**
 * A connected handle on the network, scoped
 *  to what the current grant allows.
 */
pub mod session;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::auth::{AppInfo, AuthBridge, AuthToken, Authorization};
    pub use crate::crypto::{EncKeyPair, PublicKey, SecretKey};
    pub use crate::mail::{Account, Email, MailClient, MailError, MailboxKind, SetupOutcome};
    pub use crate::network::{MemoryNetwork, Network};
    pub use crate::session::Session;
    pub use crate::version::BuildInfo;
}
