pub mod archive;
pub mod auth;
pub mod delete;
pub mod ids;
pub mod init;
pub mod read;
pub mod send;
pub mod setup;
pub mod version;

pub use archive::Archive;
pub use auth::Auth;
pub use delete::Delete;
pub use ids::Ids;
pub use init::Init;
pub use read::{Archived, Inbox};
pub use send::SendEmail;
pub use setup::Setup;
pub use version::Version;
