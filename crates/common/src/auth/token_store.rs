use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::AuthError;
use super::granted::AuthToken;

/// Where the bridge keeps its one capability token between runs
pub trait TokenStore: Send + Sync + std::fmt::Debug {
    fn load(&self) -> Result<Option<AuthToken>, AuthError>;

    fn save(&self, token: &AuthToken) -> Result<(), AuthError>;

    fn clear(&self) -> Result<(), AuthError>;
}

/// Token persisted as a single line in a file
#[derive(Clone, Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<AuthToken>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let token = std::fs::read_to_string(&self.path)?;
        if token.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(AuthToken::from(token)))
    }

    fn save(&self, token: &AuthToken) -> Result<(), AuthError> {
        std::fs::write(&self.path, token.as_str())?;
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryTokenStore {
    inner: Arc<Mutex<Option<AuthToken>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<AuthToken>, AuthError> {
        Ok(self.inner.lock().clone())
    }

    fn save(&self, token: &AuthToken) -> Result<(), AuthError> {
        *self.inner.lock() = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        self.inner.lock().take();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_file_store() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let store = FileTokenStore::new(temp_dir.path().join("auth.token"));
        assert!(store.load().unwrap().is_none());

        let token = AuthToken::from("abc123".to_string());
        store.save(&token).unwrap();
        assert_eq!(store.load().unwrap(), Some(token));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        // clearing twice is fine
        store.clear().unwrap();
    }
}
