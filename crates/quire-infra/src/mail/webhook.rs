//! Webhook mailer - hands messages to an HTTP mail relay as JSON.

use async_trait::async_trait;

use quire_core::ports::{MailError, Mailer, OutgoingMail};

/// POSTs each [`OutgoingMail`] to a relay URL.
///
/// The body is the message serialized as
/// `{"subject", "body", "from", "to": [..]}`. Any non-2xx answer counts as a
/// rejection.
pub struct WebhookMailer {
    url: String,
    client: reqwest::Client,
}

impl WebhookMailer {
    pub fn new(url: String) -> Self {
        Self {
            url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.url)
            .json(&mail)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(format!("relay answered {}", status)));
        }

        tracing::info!(subject = %mail.subject, recipients = mail.to.len(), "Mail relayed");
        Ok(())
    }
}
