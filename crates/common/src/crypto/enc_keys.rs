use serde::{Deserialize, Serialize};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

use super::keys::KeyError;

/// Size of an X25519 key (public or secret) in bytes
pub const ENC_KEY_SIZE: usize = 32;

fn decode_key(hex: &str, what: &str) -> Result<[u8; ENC_KEY_SIZE], KeyError> {
    let hex = hex.strip_prefix("0x").unwrap_or(hex);
    let mut buff = [0; ENC_KEY_SIZE];
    hex::decode_to_slice(hex, &mut buff)
        .map_err(|_| anyhow::anyhow!("{} hex decode error", what))?;
    Ok(buff)
}

/// Public half of a mailbox encryption keypair
///
/// Published in the reserved entry of an inbox so senders can seal
///  messages for its owner. Serialized as hex.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct EncPublicKey(X25519PublicKey);

impl std::fmt::Debug for EncPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EncPublicKey({})", self.to_hex())
    }
}

impl From<[u8; ENC_KEY_SIZE]> for EncPublicKey {
    fn from(bytes: [u8; ENC_KEY_SIZE]) -> Self {
        EncPublicKey(X25519PublicKey::from(bytes))
    }
}

impl EncPublicKey {
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        Ok(decode_key(hex, "encryption public key")?.into())
    }

    pub fn to_bytes(&self) -> [u8; ENC_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub(crate) fn as_x25519(&self) -> &X25519PublicKey {
        &self.0
    }
}

/// Secret half of a mailbox encryption keypair
#[derive(Clone)]
pub struct EncSecretKey(StaticSecret);

impl From<[u8; ENC_KEY_SIZE]> for EncSecretKey {
    fn from(bytes: [u8; ENC_KEY_SIZE]) -> Self {
        EncSecretKey(StaticSecret::from(bytes))
    }
}

impl EncSecretKey {
    pub fn generate() -> Self {
        let mut bytes = [0u8; ENC_KEY_SIZE];
        getrandom::getrandom(&mut bytes).expect("failed to generate random bytes");
        Self::from(bytes)
    }

    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        Ok(decode_key(hex, "encryption secret key")?.into())
    }

    pub fn public(&self) -> EncPublicKey {
        EncPublicKey(X25519PublicKey::from(&self.0))
    }

    pub fn to_bytes(&self) -> [u8; ENC_KEY_SIZE] {
        self.0.to_bytes()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    pub(crate) fn as_x25519(&self) -> &StaticSecret {
        &self.0
    }
}

/// Asymmetric encryption keypair owned by a mailbox
///
/// Serializes as `{ "public_key": <hex>, "secret_key": <hex> }`, which is
///  the shape stored inside the account config bundle.
#[derive(Clone)]
pub struct EncKeyPair {
    public: EncPublicKey,
    secret: EncSecretKey,
}

impl std::fmt::Debug for EncKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncKeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize, Deserialize)]
struct HexKeyPair {
    public_key: String,
    secret_key: String,
}

impl Serialize for EncKeyPair {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        HexKeyPair {
            public_key: self.public.to_hex(),
            secret_key: self.secret.to_hex(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for EncKeyPair {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = HexKeyPair::deserialize(deserializer)?;
        EncKeyPair::from_hex(&raw.public_key, &raw.secret_key).map_err(serde::de::Error::custom)
    }
}

impl EncKeyPair {
    /// Generate a fresh keypair
    pub fn generate() -> Self {
        let secret = EncSecretKey::generate();
        Self {
            public: secret.public(),
            secret,
        }
    }

    /// Rebuild a keypair from its hex-encoded halves
    ///
    /// # Errors
    ///
    /// Fails if either half does not decode, or if the public key does not
    ///  belong to the secret key.
    pub fn from_hex(public_key: &str, secret_key: &str) -> Result<Self, KeyError> {
        let public = EncPublicKey::from_hex(public_key)?;
        let secret = EncSecretKey::from_hex(secret_key)?;
        if secret.public() != public {
            return Err(anyhow::anyhow!("encryption public key does not match secret key").into());
        }
        Ok(Self { public, secret })
    }

    pub fn public(&self) -> &EncPublicKey {
        &self.public
    }

    pub fn secret(&self) -> &EncSecretKey {
        &self.secret
    }
}

/// Produce a new encryption keypair, returned as `(public, secret)` hex strings
pub fn generate_key_pair() -> (String, String) {
    let pair = EncKeyPair::generate();
    (pair.public.to_hex(), pair.secret.to_hex())
}
