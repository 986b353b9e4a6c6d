/// Type tag of service directories
pub const TYPE_TAG_DNS: u64 = 15001;
pub const TYPE_TAG_INBOX: u64 = 15003;
pub const TYPE_TAG_ARCHIVE: u64 = 15004;

/// Reserved inbox entry holding the owner's encryption public key (hex)
pub const MD_KEY_EMAIL_ENC_PUBLIC_KEY: &str = "__email_enc_pk";

/// Reserved metadata entry some containers carry
pub const MD_META_KEY: &str = "_metadata";

/// Service names ending with this are email services
pub const SERVICE_NAME_POSTFIX: &str = "@email";

pub const SERVICE_METADATA_NAME: &str = "Email Service";
pub const SERVICE_METADATA_DESCRIPTION: &str = "Container where all the email services are mapped";
