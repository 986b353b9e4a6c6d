use clap::Args;

use common::mail::{Email, MailError};

use crate::local::LocalError;

/// Seal an email for a recipient and deliver it to their inbox
#[derive(Args, Debug, Clone)]
pub struct SendEmail {
    /// Sender email id, written into the message
    #[arg(long)]
    pub from: String,

    /// Recipient email id
    #[arg(long)]
    pub to: String,

    #[arg(long, default_value = "")]
    pub subject: String,

    #[arg(long, default_value = "")]
    pub body: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    #[error("send failed: {0}")]
    Local(#[from] LocalError),
    #[error("send failed: {0}")]
    Mail(#[from] MailError),
}

#[async_trait::async_trait]
impl crate::op::Op for SendEmail {
    type Error = SendError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let local = ctx.local().await?;
        let client = local.client().await?;

        let email = Email::new(&self.from, &self.to, &self.subject, &self.body);
        let key = client.send_email(&email, &self.to).await?;
        local.save()?;

        Ok(format!("Sent to {} (entry {})", self.to, key))
    }
}
