//! Verification mailers.
//!
//! [`LoggingMailer`] stands in for an SMTP transport and emits each message
//! as a structured `info` event; [`RecordingMailer`] keeps messages in
//! memory for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::info;

use crate::domain::ports::{MailerError, VerificationEmail, VerificationMailer};

/// Mailer that logs each verification message instead of sending it.
#[derive(Debug, Clone)]
pub struct LoggingMailer {
    from: String,
}

impl LoggingMailer {
    /// Create a mailer that reports `from` as the sender address.
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }

    /// Sender address shown on logged messages.
    pub fn from_address(&self) -> &str {
        &self.from
    }
}

#[async_trait]
impl VerificationMailer for LoggingMailer {
    async fn send_verification(&self, email: &VerificationEmail) -> Result<(), MailerError> {
        if self.from.trim().is_empty() {
            return Err(MailerError::delivery("sender address is not configured"));
        }
        info!(
            from = %self.from,
            to = %email.to,
            subject = VerificationEmail::SUBJECT,
            link = %email.link,
            body = %email.body(),
            "verification email"
        );
        Ok(())
    }
}

/// Mailer that keeps every message in memory.
///
/// Used by the integration tests to follow verification links. Clones share
/// the same outbox.
#[derive(Debug, Clone, Default)]
pub struct RecordingMailer {
    outbox: Arc<Mutex<Vec<VerificationEmail>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message sent so far, oldest first.
    pub fn sent(&self) -> Vec<VerificationEmail> {
        self.outbox
            .lock()
            .map(|outbox| outbox.clone())
            .unwrap_or_default()
    }

    /// The most recent message to `to`, if any.
    pub fn last_to(&self, to: &str) -> Option<VerificationEmail> {
        self.sent()
            .into_iter()
            .rev()
            .find(|email| email.to.as_ref() == to)
    }
}

#[async_trait]
impl VerificationMailer for RecordingMailer {
    async fn send_verification(&self, email: &VerificationEmail) -> Result<(), MailerError> {
        let mut outbox = self
            .outbox
            .lock()
            .map_err(|_| MailerError::delivery("outbox lock poisoned"))?;
        outbox.push(email.clone());
        Ok(())
    }
}
