/// Outbound email
///
/// - [`Mailer`]: delivery backend trait
/// - [`sendgrid::SendGridMailer`]: SendGrid v3 REST backend with bounded retries
/// - [`LogMailer`]: logs instead of sending, for development without an API key
/// - [`templates`]: message rendering
/// - [`dispatcher::MailDispatcher`]: background queue that decouples request
///   handling from provider latency
///
/// # Example
///
/// ```
/// use dusky_shared::mailer::{templates, LogMailer, Mailer};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let message = templates::invitation(
///     "alice",
///     "alice@x.com",
///     "https://dusky.example/auth/confirm?token=abc",
/// );
/// LogMailer.send(&message, true).await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use std::fmt;

pub mod dispatcher;
pub mod sendgrid;
pub mod templates;

/// Display name used in the From header
pub const FROM_NAME: &str = "Dusky Team";

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Network-level failure talking to the provider
    #[error("Mail transport error: {0}")]
    Transport(String),

    /// Provider refused the message (4xx); not retried
    #[error("Mail rejected by provider ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Every attempt failed
    #[error("Mail delivery failed after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// Dispatcher queue is full or shut down
    #[error("Mail queue unavailable: {0}")]
    Queue(String),

    /// Mailer misconfiguration detected at construction time
    #[error("Invalid mailer configuration: {0}")]
    Config(String),
}

/// A fully rendered message
///
/// `Debug` omits the body, which may contain one-time tokens.
#[derive(Clone, PartialEq, Eq)]
pub struct OutboundEmail {
    pub to_name: String,
    pub to_email: String,
    pub subject: String,
    pub html_body: String,
}

impl fmt::Debug for OutboundEmail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundEmail")
            .field("to_email", &self.to_email)
            .field("subject", &self.subject)
            .finish_non_exhaustive()
    }
}

/// Mail delivery backend
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers `message`
    ///
    /// With `sandbox` set the provider validates the message without
    /// delivering it.
    async fn send(&self, message: &OutboundEmail, sandbox: bool) -> Result<(), MailError>;
}

/// Mailer that only logs recipient and subject
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &OutboundEmail, sandbox: bool) -> Result<(), MailError> {
        tracing::info!(
            to = %message.to_email,
            subject = %message.subject,
            sandbox,
            "Mail delivery skipped (no provider configured)"
        );
        Ok(())
    }
}
