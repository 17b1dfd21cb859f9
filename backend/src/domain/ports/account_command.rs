//! Driving port for account mutations: sign-up, verification, login and
//! profile edits.

use async_trait::async_trait;

use crate::domain::{
    Error, LoginCredentials, ProfileChanges, RegistrationForm, SettingsChanges, User, UserId,
    UserProfile, VerificationToken,
};

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationOutcome {
    pub user_id: UserId,
    /// False when the account exists but the verification mail failed.
    pub email_sent: bool,
}

/// Result of following a verification link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationOutcome {
    Verified,
    AlreadyVerified,
}

/// Domain use-case port for account changes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountCommand: Send + Sync {
    /// Create an unverified account and mail its verification link.
    async fn register(&self, form: RegistrationForm) -> Result<RegistrationOutcome, Error>;

    /// Confirm the email address owning `token`.
    async fn verify_email(&self, token: VerificationToken) -> Result<VerificationOutcome, Error>;

    /// Validate credentials and return the authenticated user id.
    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<UserId, Error>;

    /// Apply profile edits for `user_id`.
    async fn update_profile(&self, user_id: &UserId, changes: ProfileChanges)
    -> Result<User, Error>;

    /// Apply settings edits for `user_id`.
    async fn update_settings(
        &self,
        user_id: &UserId,
        changes: SettingsChanges,
    ) -> Result<UserProfile, Error>;

    /// Set whether `user_id` is available to donate; returns the new value.
    async fn set_availability(&self, user_id: &UserId, available: bool) -> Result<bool, Error>;
}
