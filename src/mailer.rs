use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::debug;

use crate::config::SmtpConfig;

/// Outbound email seam. Workflows only ever see `send(to, subject, html)`.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()>;
}

pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl SmtpMailer {
    pub fn new(config: &SmtpConfig) -> anyhow::Result<Self> {
        let builder = match (&config.username, &config.password) {
            (Some(username), Some(password)) => {
                AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
                    .credentials(Credentials::new(username.clone(), password.clone()))
            }
            // No credentials configured: plain connection for local development relays.
            _ => AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host),
        };
        let transport = builder.port(config.port).build();
        Ok(Self {
            transport,
            from: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        let message = Message::builder()
            .from(self.from.parse()?)
            .to(to.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())?;
        self.transport.send(message).await?;
        debug!(to = %to, subject = %subject, "email sent");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Recording mailer used by the in-memory app state and the test suite.
#[derive(Default)]
pub struct MockMailer {
    pub sent: Mutex<Vec<SentEmail>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            anyhow::bail!("smtp transport unavailable");
        }
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }
}

pub fn verification_email(public_url: &str, token: &str) -> (String, String) {
    let link = format!("{public_url}/user/verify-email/{token}");
    (
        "Verify your Gatherly email".to_string(),
        format!(
            "<p>Welcome to Gatherly!</p>\
             <p>Please confirm your email address by clicking the link below. \
             The link is valid for one hour.</p>\
             <p><a href=\"{link}\">Verify my email</a></p>"
        ),
    )
}

pub fn password_reset_email(public_url: &str, token: &str) -> (String, String) {
    let link = format!("{public_url}/reset-password/{token}");
    (
        "Reset your Gatherly password".to_string(),
        format!(
            "<p>We received a request to reset your password.</p>\
             <p>Follow the link below within one hour to choose a new one. \
             If you did not request this, you can ignore this email.</p>\
             <p><a href=\"{link}\">Reset my password</a></p>"
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_mailer_records_sent_messages() {
        let mailer = MockMailer::default();
        mailer
            .send("user@example.com", "Hello", "<p>hi</p>")
            .await
            .expect("send should succeed");
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "user@example.com");
        assert_eq!(sent[0].subject, "Hello");
    }

    #[tokio::test]
    async fn mock_mailer_fails_when_flagged() {
        let mailer = MockMailer::default();
        mailer.fail.store(true, Ordering::Relaxed);
        assert!(mailer.send("a@b.co", "s", "h").await.is_err());
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn lifecycle_emails_embed_the_token_link() {
        let (_, verify) = verification_email("https://app.local", "tok123");
        assert!(verify.contains("https://app.local/user/verify-email/tok123"));

        let (_, reset) = password_reset_email("https://app.local", "tok456");
        assert!(reset.contains("https://app.local/reset-password/tok456"));
    }
}
