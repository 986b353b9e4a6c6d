use clap::Args;

use common::mail::MailError;

use crate::local::LocalError;

/// List the public ids and email ids of this account
#[derive(Args, Debug, Clone)]
pub struct Ids;

#[derive(Debug, thiserror::Error)]
pub enum IdsError {
    #[error("listing ids failed: {0}")]
    Local(#[from] LocalError),
    #[error("listing ids failed: {0}")]
    Mail(#[from] MailError),
}

#[async_trait::async_trait]
impl crate::op::Op for Ids {
    type Error = IdsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let client = ctx.local().await?.client().await?;

        let public_ids = client.fetch_public_ids().await?;
        if public_ids.is_empty() {
            return Ok("No public ids registered".to_string());
        }
        let mut email_ids = client.email_ids_of(&public_ids).await?;
        email_ids.sort();

        let mut lines = vec!["Public ids:".to_string()];
        for entry in &public_ids {
            lines.push(format!("  {} -> {}", entry.id, entry.service_address));
        }
        lines.push("Email ids:".to_string());
        for id in &email_ids {
            lines.push(format!("  {}", id));
        }
        Ok(lines.join("\n"))
    }
}
