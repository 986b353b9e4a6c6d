//! Container-local symmetric encryption using ChaCha20-Poly1305
//!
//! Private mutable data carries one `Secret`. Entry keys are encrypted
//! deterministically so the owner can look an entry up by its plaintext
//! key; entry values use a fresh random nonce on every write.

use std::ops::Deref;

use chacha20poly1305::Key;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use serde::{Deserialize, Serialize};

/// Size of ChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 12;
/// Size of ChaCha20-Poly1305 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;

/// Errors that can occur during encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A 256-bit symmetric key scoped to one private container
///
/// The encrypted format is: `nonce (12 bytes) || ciphertext || tag (16 bytes)`.
///
/// # Examples
///
/// ```ignore
/// let secret = Secret::generate();
///
/// let key = secret.encrypt_deterministic(b"alice")?;
/// assert_eq!(key, secret.encrypt_deterministic(b"alice")?);
///
/// let value = secret.encrypt(b"sensitive data")?;
/// assert_eq!(secret.decrypt(&value)?, b"sensitive data");
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Secret([u8; SECRET_SIZE]);

impl Deref for Secret {
    type Target = [u8; SECRET_SIZE];
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl Secret {
    /// Generate a new random secret using a cryptographically secure RNG
    pub fn generate() -> Self {
        let mut buff = [0; SECRET_SIZE];
        getrandom::getrandom(&mut buff).expect("failed to generate random bytes");
        Self(buff)
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(anyhow::anyhow!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            )
            .into());
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn seal_with_nonce(&self, nonce_bytes: [u8; NONCE_SIZE], data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let cipher = ChaCha20Poly1305::new(Key::from_slice(self.bytes()));
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, data)
            .map_err(|_| anyhow::anyhow!("encrypt error"))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Encrypt data under a random nonce
    pub fn encrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        getrandom::getrandom(&mut nonce_bytes)
            .map_err(|e| anyhow::anyhow!("failed to generate nonce: {}", e))?;
        self.seal_with_nonce(nonce_bytes, data)
    }

    /// Encrypt data so that equal plaintexts give equal ciphertexts
    ///
    /// The nonce is a BLAKE3 MAC of the plaintext under this secret, so
    ///  distinct plaintexts never share a nonce.
    pub fn encrypt_deterministic(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        let mac = blake3::keyed_hash(&self.0, data);
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        nonce_bytes.copy_from_slice(&mac.as_bytes()[..NONCE_SIZE]);
        self.seal_with_nonce(nonce_bytes, data)
    }

    /// Decrypt output of either [`Secret::encrypt`] or
    ///  [`Secret::encrypt_deterministic`]
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Data is too short to contain a nonce
    /// - Authentication tag verification fails (data was tampered with or wrong key)
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>, SecretError> {
        if data.len() < NONCE_SIZE {
            return Err(anyhow::anyhow!("data too short for nonce").into());
        }

        let cipher = ChaCha20Poly1305::new(Key::from_slice(self.bytes()));
        let nonce = Nonce::from_slice(&data[..NONCE_SIZE]);
        let decrypted = cipher
            .decrypt(nonce, &data[NONCE_SIZE..])
            .map_err(|_| anyhow::anyhow!("decrypt error"))?;
        Ok(decrypted)
    }
}
