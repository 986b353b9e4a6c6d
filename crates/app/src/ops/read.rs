use clap::Args;

use common::mail::{MailError, MailboxKind, ReceivedEmail};

use crate::local::LocalError;

/// List the emails in an account's inbox
#[derive(Args, Debug, Clone)]
pub struct Inbox {
    pub email_id: String,
}

/// List the emails in an account's archive
#[derive(Args, Debug, Clone)]
pub struct Archived {
    pub email_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("reading mail failed: {0}")]
    Local(#[from] LocalError),
    #[error("reading mail failed: {0}")]
    Mail(#[from] MailError),
}

fn render(received: &ReceivedEmail) -> String {
    let email = &received.email;
    if !email.as_value().is_object() {
        return format!("{}  {}", received.key, email.as_value());
    }
    let time = email
        .time()
        .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let mut line = format!(
        "{}  {}  from {}: {}",
        received.key,
        time,
        email.sender().unwrap_or("-"),
        email.subject().unwrap_or("")
    );
    if let Some(body) = email.body().filter(|body| !body.is_empty()) {
        line.push_str(&format!("\n    {}", body.replace('\n', "\n    ")));
    }
    line
}

async fn read(
    ctx: &crate::op::OpContext,
    email_id: &str,
    kind: MailboxKind,
) -> Result<String, ReadError> {
    let client = ctx.local().await?.client().await?;
    let account = client.read_account(email_id).await?;

    let mut lines = Vec::new();
    let on_email = |received: ReceivedEmail| lines.push(render(&received));
    let report = match kind {
        MailboxKind::Inbox => client.read_inbox(&account, on_email).await?,
        MailboxKind::Archive => client.read_archive(&account, on_email).await?,
    };

    if lines.is_empty() {
        lines.push(format!("No emails in the {} of {}", kind, email_id));
    }
    for (key, reason) in &report.failures {
        lines.push(format!("! could not open {}: {}", key, reason));
    }
    Ok(lines.join("\n"))
}

#[async_trait::async_trait]
impl crate::op::Op for Inbox {
    type Error = ReadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        read(ctx, &self.email_id, MailboxKind::Inbox).await
    }
}

#[async_trait::async_trait]
impl crate::op::Op for Archived {
    type Error = ReadError;
    type Output = String;

    async fn execute(&self, ctx: &crate::op::OpContext) -> Result<Self::Output, Self::Error> {
        read(ctx, &self.email_id, MailboxKind::Archive).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use common::mail::Email;
    use serde_json::json;

    #[test]
    fn test_render_indents_body() {
        let received = ReceivedEmail {
            key: "abc".to_string(),
            email: Email::from(json!({
                "from": "alice",
                "subject": "hi",
                "body": "line one\nline two",
                "time": "2024-05-01T18:30:00.000Z",
            })),
        };
        assert_eq!(
            render(&received),
            "abc  2024-05-01 18:30  from alice: hi\n    line one\n    line two"
        );
    }

    #[test]
    fn test_render_other_documents() {
        let untimed = ReceivedEmail {
            key: "abc".to_string(),
            email: Email::from(json!({"subject": "hi"})),
        };
        assert_eq!(render(&untimed), "abc  -  from -: hi");

        let text = ReceivedEmail {
            key: "def".to_string(),
            email: Email::from(json!("hello")),
        };
        assert_eq!(render(&text), "def  \"hello\"");
    }
}
