use anyhow::Context;
use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};

use super::{Mailer, OutgoingMail};

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(host: &str, port: u16, user: &str, pass: &str, from: &str) -> anyhow::Result<Self> {
        let mut builder = SmtpTransport::starttls_relay(host)
            .with_context(|| format!("invalid SMTP relay: {host}"))?
            .port(port);
        if !user.is_empty() {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }
        let from: Mailbox = from.parse().context("invalid EMAIL_FROM address")?;

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> anyhow::Result<()> {
        let to: Mailbox = mail
            .to
            .parse()
            .with_context(|| format!("invalid recipient address: {}", mail.to))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(mail.body.clone())
            .context("failed to build email")?;

        // lettre's blocking transport; keep it off the async workers
        let transport = self.transport.clone();
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .context("email task failed")?
            .context("SMTP send failed")?;

        Ok(())
    }
}
