use clap::Args;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Default log level written to the config
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Directory for daily rolling log files
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,

    /// App id presented to the authenticator
    #[arg(long)]
    pub app_id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut config = AppConfig {
            log_level: self.log_level.clone(),
            log_dir: self.log_dir.clone(),
            ..AppConfig::default()
        };
        if let Some(app_id) = &self.app_id {
            config.app_id = app_id.clone();
        }

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let log_dir_str = match &state.config.log_dir {
            Some(dir) => dir.display().to_string(),
            None => "stderr only".to_string(),
        };

        let output = format!(
            "Initialized sealmail directory at: {}\n\
             - Owner key: {}\n\
             - Vault: {}\n\
             - Blobs: {}\n\
             - Config: {}\n\
             - App id: {}\n\
             - Logs: {}",
            state.sealmail_dir.display(),
            state.key_path.display(),
            state.vault_path.display(),
            state.blobs_path.display(),
            state.config_path.display(),
            state.config.app_id,
            log_dir_str
        );

        Ok(output)
    }
}
