use clap::Args;

use common::auth::AuthError;
use common::mail::{MailError, SetupOutcome};

use crate::local::LocalError;

/// Create an email id (`publicId` or `service.publicId`)
#[derive(Args, Debug, Clone)]
pub struct Setup {
    pub email_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("setup failed: {0}")]
    Local(#[from] LocalError),
    #[error("setup failed: {0}")]
    Mail(#[from] MailError),
    #[error("share approval failed: {0}")]
    Share(#[from] AuthError),
}

#[async_trait::async_trait]
impl crate::op::Op for Setup {
    type Error = SetupError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let local = ctx.local().await?;
        let client = local.client().await?;

        let result = match client.setup_account(&self.email_id).await {
            Ok(SetupOutcome::Created(account)) => Ok(account),
            Ok(SetupOutcome::SharePending(pending)) => {
                // the directory was made by another app on this account;
                //  the local authenticator answers the share request itself
                tracing::info!(
                    "requesting access to the service directory of {}",
                    pending.email_id
                );
                let token = local.authenticator.approve(pending.request).await?;
                client.connect_with_shared_md(&token, &pending).await
            }
            Err(e) => Err(e),
        };
        // partial progress is kept either way
        local.save()?;
        let account = result?;

        Ok(format!(
            "Created email id: {}\n- Encryption key: {}",
            account.id,
            account.enc_public_key().to_hex()
        ))
    }
}
