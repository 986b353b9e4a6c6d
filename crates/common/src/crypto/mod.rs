//! Cryptographic primitives for sealmail
//!
//! - **Identity**: Ed25519 keypairs (`SecretKey`/`PublicKey`) identify apps
//!   and account owners to the network's permission checks
//! - **Mailbox keys**: X25519 keypairs (`EncKeyPair`) published per inbox
//! - **Sealed boxes**: anonymous public-key encryption of email content and
//!   of the pointers to it, see [`seal`] and [`open`]
//! - **Container encryption**: a ChaCha20-Poly1305 `Secret` per private
//!   container, applied to both entry keys and entry values
//! - **Naming**: [`name_hash`] turns a public id into its service address

mod enc_keys;
mod keys;
mod sealed;
mod secret;

use sha2::{Digest, Sha256};

pub use enc_keys::{generate_key_pair, EncKeyPair, EncPublicKey, EncSecretKey, ENC_KEY_SIZE};
pub use keys::{KeyError, PublicKey, SecretKey, PUBLIC_KEY_SIZE};
pub use sealed::{open, seal, SealError, SEAL_OVERHEAD};
pub use secret::{Secret, SecretError, SECRET_SIZE};

/// One-way hash of a name, used to derive deterministic network addresses
pub fn name_hash(name: &[u8]) -> [u8; 32] {
    Sha256::digest(name).into()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_name_hash_deterministic() {
        assert_eq!(name_hash(b"alice"), name_hash(b"alice"));
        assert_ne!(name_hash(b"alice"), name_hash(b"bob"));
    }
}
