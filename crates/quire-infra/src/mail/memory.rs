//! In-memory outbox - records messages so tests can inspect them.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use quire_core::ports::{MailError, Mailer, OutgoingMail};

/// Collects sent messages. Can be switched into a failing mode to exercise
/// delivery errors.
#[derive(Default)]
pub struct InMemoryMailer {
    outbox: RwLock<Vec<OutgoingMail>>,
    failing: AtomicBool,
}

impl InMemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A mailer that rejects every message.
    pub fn failing() -> Self {
        let mailer = Self::default();
        mailer.set_failing(true);
        mailer
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Messages accepted so far, oldest first.
    pub async fn sent(&self) -> Vec<OutgoingMail> {
        self.outbox.read().await.clone()
    }
}

#[async_trait]
impl Mailer for InMemoryMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Transport("outbox unavailable".to_string()));
        }
        self.outbox.write().await.push(mail);
        Ok(())
    }
}
