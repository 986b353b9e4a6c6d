use std::{fs, path::PathBuf};

use common::auth::AppInfo;
use common::prelude::SecretKey;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

pub const APP_NAME: &str = "sealmail";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const VAULT_FILE_NAME: &str = "vault.bin";
pub const KEY_FILE_NAME: &str = "owner.pem";
pub const TOKEN_FILE_NAME: &str = "auth.token";
pub const BLOBS_DIR_NAME: &str = "blobs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default log level, overridable with RUST_LOG
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for daily rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    /// Identity this client presents to the authenticator
    #[serde(default = "default_app_id")]
    pub app_id: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_app_vendor")]
    pub app_vendor: String,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_app_id() -> String {
    "net.sealmail.cli".to_string()
}

fn default_app_name() -> String {
    "Sealmail CLI".to_string()
}

fn default_app_vendor() -> String {
    "Sealmail".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: None,
            app_id: default_app_id(),
            app_name: default_app_name(),
            app_vendor: default_app_vendor(),
        }
    }
}

impl AppConfig {
    pub fn app_info(&self) -> AppInfo {
        AppInfo {
            id: self.app_id.clone(),
            name: self.app_name.clone(),
            vendor: self.app_vendor.clone(),
        }
    }

    /// Parsed log level, falling back to `warn` for anything unrecognised
    pub fn log_level(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::WARN)
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the sealmail directory (~/.sealmail)
    pub sealmail_dir: PathBuf,
    /// Path to the persisted mutable data vault
    pub vault_path: PathBuf,
    /// Path to the account owner key PEM file
    pub key_path: PathBuf,
    /// Path to the stored capability token
    pub token_path: PathBuf,
    /// Path to the blobs directory
    pub blobs_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the sealmail directory path (custom or default ~/.sealmail)
    pub fn sealmail_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new sealmail state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let sealmail_dir = Self::sealmail_dir(custom_path)?;

        if sealmail_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&sealmail_dir)?;

        let blobs_path = sealmail_dir.join(BLOBS_DIR_NAME);
        fs::create_dir_all(&blobs_path)?;

        // the local account every container is created under
        let key = SecretKey::generate();
        let key_path = sealmail_dir.join(KEY_FILE_NAME);
        fs::write(&key_path, key.to_pem())?;

        let config = config.unwrap_or_default();
        let config_path = sealmail_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        Ok(Self {
            vault_path: sealmail_dir.join(VAULT_FILE_NAME),
            token_path: sealmail_dir.join(TOKEN_FILE_NAME),
            sealmail_dir,
            key_path,
            blobs_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the sealmail directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let sealmail_dir = Self::sealmail_dir(custom_path)?;

        if !sealmail_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let key_path = sealmail_dir.join(KEY_FILE_NAME);
        let blobs_path = sealmail_dir.join(BLOBS_DIR_NAME);
        let config_path = sealmail_dir.join(CONFIG_FILE_NAME);

        // the vault and token appear on first use
        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !blobs_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", BLOBS_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            vault_path: sealmail_dir.join(VAULT_FILE_NAME),
            token_path: sealmail_dir.join(TOKEN_FILE_NAME),
            sealmail_dir,
            key_path,
            blobs_path,
            config_path,
            config,
        })
    }

    /// Load the account owner key from the key file
    pub fn load_key(&self) -> Result<SecretKey, StateError> {
        let pem = fs::read_to_string(&self.key_path)?;
        let key = SecretKey::from_pem(&pem).map_err(|e| StateError::InvalidKey(e.to_string()))?;
        Ok(key)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("sealmail directory not initialized. Run 'sealmail init' first")]
    NotInitialized,

    #[error("sealmail directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("sealmail");

        let state = AppState::init(Some(dir.clone()), None).unwrap();
        assert!(state.key_path.exists());
        assert!(!state.vault_path.exists());

        let loaded = AppState::load(Some(dir.clone())).unwrap();
        assert_eq!(loaded.config.app_id, "net.sealmail.cli");
        assert_eq!(
            loaded.load_key().unwrap().public(),
            state.load_key().unwrap().public()
        );

        assert!(matches!(
            AppState::init(Some(dir), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let temp = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppState::load(Some(temp.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = toml::from_str("log_level = \"debug\"").unwrap();
        assert_eq!(config.log_level(), LevelFilter::DEBUG);
        assert!(config.log_dir.is_none());
        assert_eq!(config.app_info().own_container(), "apps/net.sealmail.cli");
    }
}
