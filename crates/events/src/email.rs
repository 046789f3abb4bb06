//! Outbound email transport.
//!
//! [`EmailSender`] is the port the [`Notifier`](crate::Notifier) talks to.
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport; [`LogMailer`] is
//! used when `SMTP_HOST` is not configured and only logs what would be sent.

use async_trait::async_trait;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for email delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `EMAIL_FROM_ADDRESS` is not set.
pub const DEFAULT_FROM_ADDRESS: &str = "noreply@onboard.local";

/// Default sender display name when `EMAIL_FROM_NAME` is not set.
pub const DEFAULT_FROM_NAME: &str = "Client Onboarding";

/// Sender identity, used by every transport.
#[derive(Debug, Clone)]
pub struct Sender {
    pub address: String,
    pub name: String,
}

impl Sender {
    /// Load from `EMAIL_FROM_ADDRESS` / `EMAIL_FROM_NAME`.
    pub fn from_env() -> Self {
        Self {
            address: std::env::var("EMAIL_FROM_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            name: std::env::var("EMAIL_FROM_NAME")
                .unwrap_or_else(|_| DEFAULT_FROM_NAME.to_string()),
        }
    }
}

impl Default for Sender {
    fn default() -> Self {
        Self {
            address: DEFAULT_FROM_ADDRESS.to_string(),
            name: DEFAULT_FROM_NAME.to_string(),
        }
    }
}

/// Configuration for the SMTP email delivery service.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
    pub sender: Sender,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that the log-only
    /// mailer should be used instead.
    ///
    /// | Variable             | Required | Default                  |
    /// |----------------------|----------|--------------------------|
    /// | `SMTP_HOST`          | yes      | --                       |
    /// | `SMTP_PORT`          | no       | `587`                    |
    /// | `SMTP_USER`          | no       | --                       |
    /// | `SMTP_PASSWORD`      | no       | --                       |
    /// | `EMAIL_FROM_ADDRESS` | no       | `noreply@onboard.local`  |
    /// | `EMAIL_FROM_NAME`    | no       | `Client Onboarding`      |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            sender: Sender::from_env(),
        })
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// A fully rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Transport abstraction. Implementations return the message id on success.
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError>;
}

fn new_message_id(sender: &Sender) -> String {
    let domain = sender
        .address
        .rsplit_once('@')
        .map(|(_, d)| d)
        .unwrap_or("localhost");
    format!("<{}@{domain}>", uuid::Uuid::new_v4().simple())
}

// ---------------------------------------------------------------------------
// SMTP
// ---------------------------------------------------------------------------

/// Sends multipart (text + HTML) emails via SMTP.
pub struct SmtpMailer {
    sender: Sender,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailer {
    /// Build the STARTTLS transport. No connection is opened until the first send.
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            sender: config.sender,
            transport: builder.build(),
        })
    }
}

#[async_trait]
impl EmailSender for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError> {
        let from = Mailbox::new(Some(self.sender.name.clone()), self.sender.address.parse()?);
        let message_id = new_message_id(&self.sender);

        let message = Message::builder()
            .from(from)
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .message_id(Some(message_id.clone()))
            .multipart(MultiPart::alternative_plain_html(
                email.text.clone(),
                email.html.clone(),
            ))
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent");
        Ok(message_id)
    }
}

// ---------------------------------------------------------------------------
// Log only
// ---------------------------------------------------------------------------

/// Fallback transport when SMTP is not configured: logs instead of sending.
#[derive(Debug, Default)]
pub struct LogMailer {
    sender: Sender,
}

impl LogMailer {
    pub fn new(sender: Sender) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl EmailSender for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError> {
        let _: lettre::Address = email.to.parse()?;
        let message_id = new_message_id(&self.sender);
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            message_id = %message_id,
            "SMTP not configured; email logged only"
        );
        Ok(message_id)
    }
}

// ---------------------------------------------------------------------------
// Recording (tests)
// ---------------------------------------------------------------------------

/// Captures every message in memory. Can be told to fail for one recipient.
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: std::sync::Mutex<Vec<OutgoingEmail>>,
    fail_for: std::sync::Mutex<Option<String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message accepted so far.
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Reject every future message to `recipient`.
    pub fn fail_for(&self, recipient: &str) {
        if let Ok(mut guard) = self.fail_for.lock() {
            *guard = Some(recipient.to_string());
        }
    }

    /// The most recent message to `recipient`.
    pub fn last_to(&self, recipient: &str) -> Option<OutgoingEmail> {
        self.sent().into_iter().rev().find(|m| m.to == recipient)
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<String, EmailError> {
        let rejected = self
            .fail_for
            .lock()
            .map(|f| f.as_deref() == Some(email.to.as_str()))
            .unwrap_or(false);
        if rejected {
            return Err(EmailError::Build(format!("recipient {} rejected", email.to)));
        }
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| EmailError::Build("recording mailer lock poisoned".into()))?;
        sent.push(email.clone());
        Ok(format!("<recorded-{}@test>", sent.len()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
