//! Console mailer - writes messages to the log (for development).

use async_trait::async_trait;

use quire_core::ports::{MailError, Mailer, OutgoingMail};

/// Logs each message instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleMailer;

#[async_trait]
impl Mailer for ConsoleMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        tracing::info!(
            subject = %mail.subject,
            from = %mail.from,
            to = ?mail.to,
            body = %mail.body,
            "Mail written to console"
        );
        Ok(())
    }
}
