//! Port abstraction for user persistence adapters and their errors.
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::eligibility::DonorFilter;
use crate::domain::{
    Page, PageRequest, ProfileUpdate, User, UserId, UserProfile, VerificationToken,
};

use super::define_port_error;

define_port_error! {
    /// Persistence errors raised by user repository adapters.
    pub enum UserRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } => "user repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } => "user repository query failed: {message}",
        /// Another account already uses this email address.
        DuplicateEmail { email: String } => "email already registered: {email}",
    }
}

/// A user row together with its stored password hash.
///
/// Only credential checks ever see the hash.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCredentials {
    pub user: User,
    pub password_hash: String,
}

/// Storage for users, their profiles and password hashes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user and its profile atomically.
    ///
    /// Fails with [`UserRepositoryError::DuplicateEmail`] if the email is taken.
    async fn create(
        &self,
        user: &User,
        profile: &UserProfile,
        password_hash: &str,
    ) -> Result<(), UserRepositoryError>;

    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserRepositoryError>;

    /// Fetch the user holding an email verification token.
    async fn find_by_verification_token(
        &self,
        token: &VerificationToken,
    ) -> Result<Option<User>, UserRepositoryError>;

    /// Fetch a user and password hash by normalised email.
    async fn find_credentials(
        &self,
        email: &str,
    ) -> Result<Option<StoredCredentials>, UserRepositoryError>;

    /// Whether any account uses the normalised email.
    async fn email_exists(&self, email: &str) -> Result<bool, UserRepositoryError>;

    /// Persist changes to an existing user.
    async fn update(&self, user: &User) -> Result<(), UserRepositoryError>;

    /// Write a profile edit, leaving every other column as stored.
    async fn update_details(
        &self,
        id: &UserId,
        update: &ProfileUpdate,
    ) -> Result<(), UserRepositoryError>;

    /// Set the donation availability flag alone.
    async fn set_availability(
        &self,
        id: &UserId,
        available: bool,
        at: DateTime<Utc>,
    ) -> Result<(), UserRepositoryError>;

    /// Fetch the profile belonging to a user.
    async fn find_profile(&self, id: &UserId)
    -> Result<Option<UserProfile>, UserRepositoryError>;

    /// Persist changes to an existing profile.
    async fn update_profile(&self, profile: &UserProfile) -> Result<(), UserRepositoryError>;

    /// Donors matching `filter`, ordered by first then last name.
    async fn search_donors(
        &self,
        filter: &DonorFilter,
        page: PageRequest,
    ) -> Result<Page<User>, UserRepositoryError>;

    /// Number of users with a verified email address.
    async fn count_verified(&self) -> Result<u64, UserRepositoryError>;
}
