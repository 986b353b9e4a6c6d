use clap::Args;

use crate::local::LocalError;

/// Authorise this app against the local account
#[derive(Args, Debug, Clone)]
pub struct Auth;

#[derive(Debug, thiserror::Error)]
pub enum AuthOpError {
    #[error("auth failed: {0}")]
    Local(#[from] LocalError),
}

#[async_trait::async_trait]
impl crate::op::Op for Auth {
    type Error = AuthOpError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        let local = ctx.local().await?;
        let (session, granted) = local.authorize(true).await?;
        local.save()?;

        let verb = if granted {
            "Authorised"
        } else {
            "Already authorised"
        };
        Ok(format!(
            "{} {} as {}\n- Account: {}\n- Containers: {}",
            verb,
            session.app().id,
            session.app_key(),
            session.owner(),
            session.granted().access_container.containers.len()
        ))
    }
}
