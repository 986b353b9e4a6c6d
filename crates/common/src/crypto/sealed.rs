//! Anonymous sealed boxes
//!
//! Anyone holding a mailbox's [`EncPublicKey`] can seal a payload for it
//! without owning a keypair themselves. Only the matching secret key can
//! open it, and the recipient learns nothing about the sender.
//!
//! # Wire Format
//!
//! ```text
//! [ ephemeral_pubkey: 32 ][ nonce: 12 ][ ciphertext || tag: 16 ]
//! ```
//!
//! The ChaCha20-Poly1305 key is derived with BLAKE3 in key-derivation mode
//! over `shared_secret || ephemeral_pubkey || recipient_pubkey`.

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Key, Nonce,
};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use super::enc_keys::{EncKeyPair, EncPublicKey, ENC_KEY_SIZE};

const SEAL_CONTEXT: &str = "sealmail 2024 sealed box v1";
const NONCE_SIZE: usize = 12;
const TAG_SIZE: usize = 16;
/// Bytes a sealed box adds on top of its plaintext
pub const SEAL_OVERHEAD: usize = ENC_KEY_SIZE + NONCE_SIZE + TAG_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum SealError {
    #[error("sealed box too short: {0} bytes")]
    TooShort(usize),
    #[error("key agreement produced a non-contributory shared secret")]
    NonContributory,
    #[error("encrypt error")]
    Encrypt,
    #[error("sealed box could not be opened with this keypair")]
    Decrypt,
}

fn derive_key(
    shared: &[u8; 32],
    ephemeral: &X25519PublicKey,
    recipient: &X25519PublicKey,
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new_derive_key(SEAL_CONTEXT);
    hasher.update(shared);
    hasher.update(ephemeral.as_bytes());
    hasher.update(recipient.as_bytes());
    *hasher.finalize().as_bytes()
}

/// Seal `plaintext` for the holder of `recipient`'s secret key
pub fn seal(plaintext: &[u8], recipient: &EncPublicKey) -> Result<Vec<u8>, SealError> {
    let mut ephemeral_bytes = [0u8; ENC_KEY_SIZE];
    getrandom::getrandom(&mut ephemeral_bytes).map_err(|_| SealError::Encrypt)?;
    let ephemeral = StaticSecret::from(ephemeral_bytes);
    let ephemeral_public = X25519PublicKey::from(&ephemeral);

    let shared = ephemeral.diffie_hellman(recipient.as_x25519());
    if !shared.was_contributory() {
        return Err(SealError::NonContributory);
    }
    let key = derive_key(shared.as_bytes(), &ephemeral_public, recipient.as_x25519());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    getrandom::getrandom(&mut nonce_bytes).map_err(|_| SealError::Encrypt)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|_| SealError::Encrypt)?;

    let mut out = Vec::with_capacity(SEAL_OVERHEAD + plaintext.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce_bytes);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Open a sealed box with the recipient's keypair
///
/// # Errors
///
/// Returns [`SealError::TooShort`] for empty or truncated input and
///  [`SealError::Decrypt`] when the box was sealed for another key or was
///  tampered with.
pub fn open(sealed: &[u8], keys: &EncKeyPair) -> Result<Vec<u8>, SealError> {
    if sealed.len() < SEAL_OVERHEAD {
        return Err(SealError::TooShort(sealed.len()));
    }

    let mut ephemeral_bytes = [0u8; ENC_KEY_SIZE];
    ephemeral_bytes.copy_from_slice(&sealed[..ENC_KEY_SIZE]);
    let ephemeral_public = X25519PublicKey::from(ephemeral_bytes);
    let nonce = Nonce::from_slice(&sealed[ENC_KEY_SIZE..ENC_KEY_SIZE + NONCE_SIZE]);

    let shared = keys.secret().as_x25519().diffie_hellman(&ephemeral_public);
    if !shared.was_contributory() {
        return Err(SealError::NonContributory);
    }
    let key = derive_key(
        shared.as_bytes(),
        &ephemeral_public,
        keys.public().as_x25519(),
    );

    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    cipher
        .decrypt(nonce, &sealed[ENC_KEY_SIZE + NONCE_SIZE..])
        .map_err(|_| SealError::Decrypt)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_seal_open() {
        let keys = EncKeyPair::generate();
        let message = br#"{"subject":"hi"}"#;

        let sealed = seal(message, keys.public()).unwrap();
        assert_eq!(sealed.len(), message.len() + SEAL_OVERHEAD);
        assert_eq!(open(&sealed, &keys).unwrap(), message.to_vec());
    }

    #[test]
    fn test_seal_empty_plaintext() {
        let keys = EncKeyPair::generate();
        let sealed = seal(b"", keys.public()).unwrap();
        assert!(open(&sealed, &keys).unwrap().is_empty());
    }

    #[test]
    fn test_open_with_wrong_keys() {
        let keys = EncKeyPair::generate();
        let other = EncKeyPair::generate();
        let sealed = seal(b"for keys only", keys.public()).unwrap();
        assert!(matches!(open(&sealed, &other), Err(SealError::Decrypt)));
    }

    #[test]
    fn test_open_empty_or_garbage() {
        let keys = EncKeyPair::generate();
        assert!(matches!(open(&[], &keys), Err(SealError::TooShort(0))));
        assert!(open(&[7u8; 96], &keys).is_err());
    }

    #[test]
    fn test_open_tampered() {
        let keys = EncKeyPair::generate();
        let mut sealed = seal(b"integrity matters", keys.public()).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0xFF;
        assert!(matches!(open(&sealed, &keys), Err(SealError::Decrypt)));
    }
}
