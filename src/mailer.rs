use anyhow::Context;
use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::info;

use crate::config::SmtpConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(cfg: &SmtpConfig) -> anyhow::Result<Self> {
        // Local catchers (mailhog, mailpit) speak plain SMTP.
        let mut builder = if cfg.host == "localhost" || cfg.host == "127.0.0.1" {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&cfg.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&cfg.host)
                .context("smtp relay")?
        };
        builder = builder.port(cfg.port);
        if let (Some(user), Some(pass)) = (&cfg.username, &cfg.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }
        let from = cfg.from.parse::<Mailbox>().context("parse MAIL_FROM")?;
        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

pub(crate) fn reset_body(reset_url: &str) -> String {
    format!(
        "Hello,\n\n\
         We received a request to reset your TravelHub password.\n\
         Open the link below to choose a new one. The link works once and expires soon.\n\n\
         {reset_url}\n\n\
         If you did not ask for this, you can ignore this email.\n"
    )
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> anyhow::Result<()> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(to.parse::<Mailbox>().context("parse recipient")?)
            .subject("Reset your TravelHub password")
            .header(ContentType::TEXT_PLAIN)
            .body(reset_body(reset_url))
            .context("build reset email")?;
        self.transport.send(email).await.context("smtp send")?;
        info!(to, "password reset email sent");
        Ok(())
    }
}

/// Used when SMTP is not configured. Never logs the link itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, _reset_url: &str) -> anyhow::Result<()> {
        info!(to, "smtp disabled; password reset email not delivered");
        Ok(())
    }
}

#[cfg(test)]
pub use fakes::{FailingMailer, RecordingMailer};


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_body_contains_link() {
        let body = reset_body("http://localhost:3000/reset-password?token=abc");
        assert!(body.contains("http://localhost:3000/reset-password?token=abc"));
    }

    #[test]
    fn smtp_mailer_rejects_bad_from_address() {
        let cfg = SmtpConfig {
            host: "localhost".into(),
            port: 1025,
            username: None,
            password: None,
            from: "not an address".into(),
        };
        assert!(SmtpMailer::new(&cfg).is_err());
    }

    #[tokio::test]
    async fn log_mailer_always_succeeds() {
        LogMailer
            .send_password_reset("a@b.co", "http://x/reset-password?token=t")
            .await
            .unwrap();
    }
}
