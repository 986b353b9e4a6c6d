use std::future::IntoFuture;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use anyhow::anyhow;
use bytes::Bytes;
use iroh_blobs::{
    api::{blobs::BlobStatus, blobs::Blobs, RequestError},
    store::{fs::FsStore, mem::MemStore},
    BlobsProtocol, Hash,
};

use super::types::XorName;

/// Client over a local iroh-blob store.
/// Backs the network's immutable data: every blob is addressed by the
///  BLAKE3 hash of its bytes, which doubles as its [`XorName`].
#[derive(Clone, Debug)]
pub struct BlobsStore {
    pub inner: Arc<BlobsProtocol>,
}

impl Deref for BlobsStore {
    type Target = Arc<BlobsProtocol>;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlobsStoreError {
    #[error("blobs store error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("blob store i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("request error: {0}")]
    Request(#[from] RequestError),
}

impl From<XorName> for Hash {
    fn from(name: XorName) -> Self {
        Hash::from_bytes(name.0)
    }
}

impl From<Hash> for XorName {
    fn from(hash: Hash) -> Self {
        XorName(*hash.as_bytes())
    }
}

impl BlobsStore {
    /// Load a blob store from the given path
    pub async fn fs(path: &Path) -> Result<Self, BlobsStoreError> {
        tracing::debug!("BlobsStore::fs called with path: {:?}", path);
        let store = FsStore::load(path).await?;
        let blobs = BlobsProtocol::new(&store, None);
        Ok(Self {
            inner: Arc::new(blobs),
        })
    }

    /// Load a memory blobs store
    pub async fn memory() -> Result<Self, BlobsStoreError> {
        let store = MemStore::new();
        let blobs = BlobsProtocol::new(&store, None);
        Ok(Self {
            inner: Arc::new(blobs),
        })
    }

    pub fn blobs(&self) -> &Blobs {
        self.inner.store().blobs()
    }

    /// Get a blob as bytes
    pub async fn get(&self, name: &XorName) -> Result<Bytes, BlobsStoreError> {
        let bytes = self
            .blobs()
            .get_bytes(Hash::from(*name))
            .await
            .map_err(|err| BlobsStoreError::Default(anyhow!(err)))?;
        Ok(bytes)
    }

    /// Store a vec of bytes as a blob
    pub async fn put(&self, data: Vec<u8>) -> Result<XorName, BlobsStoreError> {
        let hash = self.blobs().add_bytes(data).into_future().await?.hash;
        Ok(hash.into())
    }

    /// Check whether a blob is fully present
    pub async fn has(&self, name: &XorName) -> Result<bool, BlobsStoreError> {
        let stat = self
            .blobs()
            .status(Hash::from(*name))
            .await
            .map_err(|err| BlobsStoreError::Default(anyhow!(err)))?;
        Ok(matches!(stat, BlobStatus::Complete { .. }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_put_get() {
        let store = BlobsStore::memory().await.unwrap();
        let name = store.put(b"sealed email".to_vec()).await.unwrap();

        assert!(store.has(&name).await.unwrap());
        assert_eq!(store.get(&name).await.unwrap().as_ref(), b"sealed email");
        assert_eq!(name, XorName(*blake3::hash(b"sealed email").as_bytes()));
    }

    #[tokio::test]
    async fn test_missing_blob() {
        let store = BlobsStore::memory().await.unwrap();
        assert!(!store.has(&XorName::random()).await.unwrap());
    }
}
