use async_trait::async_trait;

use super::{Mailer, OutgoingMail};

/// Used when no SMTP relay is configured: mail is written to the log only.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        tracing::info!(to = %mail.to, subject = %mail.subject, body = %mail.body, "email (not sent, SMTP disabled)");
        Ok(())
    }
}
