//! Notification dispatcher: email transport, canned templates, and the
//! [`Notifier`] that sends them and records every attempt.

pub mod email;
pub mod notifier;
pub mod templates;

pub use email::{EmailConfig, EmailError, EmailSender, LogMailer, OutgoingEmail, Sender, SmtpMailer};
pub use notifier::{BroadcastSummary, Notifier, RecipientError, SendOutcome};

#[cfg(any(test, feature = "test-support"))]
pub use email::RecordingMailer;
