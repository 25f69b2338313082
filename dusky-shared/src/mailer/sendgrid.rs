/// SendGrid v3 mail backend
///
/// Sends through `POST {base_url}/v3/mail/send` with a bearer API key.
///
/// # Retries
///
/// Up to `max_retries` attempts. Transport errors and 5xx responses are
/// retried after a linearly increasing pause (`backoff * attempt`); a 4xx
/// response fails immediately since resending the same payload cannot help.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;

use super::{MailError, Mailer, OutboundEmail, FROM_NAME};

/// Public SendGrid API endpoint
pub const SENDGRID_BASE_URL: &str = "https://api.sendgrid.com";

/// Per-request HTTP timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct SendGridMailer {
    client: Client,
    api_key: String,
    from_email: String,
    base_url: String,
    max_retries: u32,
    backoff: Duration,
}

impl std::fmt::Debug for SendGridMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridMailer")
            .field("from_email", &self.from_email)
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl SendGridMailer {
    /// Creates a mailer against the public SendGrid endpoint
    ///
    /// # Errors
    ///
    /// `MailError::Config` if the API key is empty, `max_retries` is zero or
    /// the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        from_email: impl Into<String>,
        max_retries: u32,
    ) -> Result<Self, MailError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(MailError::Config("SendGrid API key must not be empty".to_string()));
        }
        if max_retries == 0 {
            return Err(MailError::Config("max_retries must be at least 1".to_string()));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MailError::Config(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            from_email: from_email.into(),
            base_url: SENDGRID_BASE_URL.to_string(),
            max_retries,
            backoff: Duration::from_secs(1),
        })
    }

    /// Overrides the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Overrides the base backoff between attempts
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    fn payload(&self, message: &OutboundEmail, sandbox: bool) -> serde_json::Value {
        json!({
            "personalizations": [{
                "to": [{ "email": message.to_email, "name": message.to_name }]
            }],
            "from": { "email": self.from_email, "name": FROM_NAME },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html_body }],
            "mail_settings": {
                "sandbox_mode": { "enable": sandbox }
            }
        })
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff * attempt
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: &OutboundEmail, sandbox: bool) -> Result<(), MailError> {
        let payload = self.payload(message, sandbox);
        let url = format!("{}/v3/mail/send", self.base_url);
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&payload)
                .send()
                .await;

            match result {
                Ok(response) if response.status().is_success() => {
                    tracing::info!(
                        to = %message.to_email,
                        attempt,
                        sandbox,
                        "Mail accepted by SendGrid"
                    );
                    return Ok(());
                }
                Ok(response) if is_retryable(response.status()) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    tracing::warn!(status = status.as_u16(), attempt, "SendGrid server error");
                    last_error = format!("server error {}: {}", status, body);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    tracing::error!(status = status.as_u16(), "SendGrid rejected message");
                    return Err(MailError::Rejected {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempt, "SendGrid transport error");
                    last_error = MailError::Transport(e.to_string()).to_string();
                }
            }

            if attempt < self.max_retries {
                tokio::time::sleep(self.backoff_for(attempt)).await;
            }
        }

        Err(MailError::RetriesExhausted {
            attempts: self.max_retries,
            last_error,
        })
    }
}

/// Whether a status would be retried
pub fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error()
}
