//! Outbound mail port.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A message ready to hand to a mail channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    pub subject: String,
    pub body: String,
    pub from: String,
    pub to: Vec<String>,
}

/// Mail channel trait - abstraction over delivery backends.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver one message. Failures are returned to the caller unchanged.
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError>;
}

/// Mail delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Mail transport failed: {0}")]
    Transport(String),

    #[error("Mail rejected by relay: {0}")]
    Rejected(String),
}
