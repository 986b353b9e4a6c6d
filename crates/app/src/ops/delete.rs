use clap::Args;

use common::mail::{MailError, MailboxKind};

use crate::local::LocalError;

/// Remove an entry from the inbox (or the archive)
#[derive(Args, Debug, Clone)]
pub struct Delete {
    pub email_id: String,
    pub key: String,

    /// Delete from the archive instead of the inbox
    #[arg(long)]
    pub archive: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("delete failed: {0}")]
    Local(#[from] LocalError),
    #[error("delete failed: {0}")]
    Mail(#[from] MailError),
}

#[async_trait::async_trait]
impl crate::op::Op for Delete {
    type Error = DeleteError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let local = ctx.local().await?;
        let client = local.client().await?;
        let account = client.read_account(&self.email_id).await?;

        let kind = if self.archive {
            MailboxKind::Archive
        } else {
            MailboxKind::Inbox
        };
        client.delete_email(&account, kind, &self.key).await?;
        local.save()?;

        Ok(format!("Deleted {} from the {}", self.key, kind))
    }
}
