//! Port for sending email verification messages.

use async_trait::async_trait;

use crate::domain::EmailAddress;

use super::define_port_error;

define_port_error! {
    /// Errors raised by mail adapters.
    pub enum MailerError {
        /// The message could not be handed to the transport.
        Delivery { message: String } => "verification email delivery failed: {message}",
    }
}

/// A verification message addressed to a newly registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationEmail {
    pub to: EmailAddress,
    pub full_name: String,
    /// Absolute link the user follows to verify their address.
    pub link: String,
}

impl VerificationEmail {
    /// Subject line used for every verification message.
    pub const SUBJECT: &'static str = "Verify your LifeLine account";

    /// Plain-text body.
    pub fn body(&self) -> String {
        format!(
            "Hello {},\n\nThank you for registering with LifeLine. \
             Confirm your email address by opening the link below:\n\n{}\n",
            self.full_name, self.link
        )
    }
}

/// Outbound mail transport for verification messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VerificationMailer: Send + Sync {
    /// Send one verification message.
    async fn send_verification(&self, email: &VerificationEmail) -> Result<(), MailerError>;
}
