//! Obtaining and keeping the capability grant the app runs under
//!
//! An [`Authenticator`] answers [`AuthRequest`]s and
//!  [`ShareMDataRequest`]s with [`AuthToken`]s; the [`AuthBridge`] turns
//!  tokens into a [`Session`](crate::session::Session) and keeps the
//!  current one in a [`TokenStore`].

mod authenticator;
mod bridge;
mod error;
mod granted;
mod request;
mod token_store;

pub use authenticator::{Authenticator, MemoryAuthenticator, CONTAINER_TYPE_TAG};
pub use bridge::{AuthBridge, Authorization};
pub use error::AuthError;
pub use granted::{AuthGranted, AuthResponse, AuthToken, SharedGrant};
pub use request::{AppInfo, AuthRequest, ShareMData, ShareMDataRequest, PUBLIC_NAMES_CONTAINER};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
