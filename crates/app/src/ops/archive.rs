use clap::Args;

use common::mail::MailError;

use crate::local::LocalError;

/// Move an inbox entry into the archive
#[derive(Args, Debug, Clone)]
pub struct Archive {
    pub email_id: String,
    /// Inbox entry key, as printed by `sealmail inbox`
    pub key: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("archive failed: {0}")]
    Local(#[from] LocalError),
    #[error("archive failed: {0}")]
    Mail(#[from] MailError),
}

#[async_trait::async_trait]
impl crate::op::Op for Archive {
    type Error = ArchiveError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let local = ctx.local().await?;
        let client = local.client().await?;
        let account = client.read_account(&self.email_id).await?;

        let result = client.archive_email(&account, &self.key).await;
        local.save()?;
        let archived = result?;

        Ok(format!("Archived {} as {}", self.key, archived))
    }
}
