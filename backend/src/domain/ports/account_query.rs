//! Driving port for account reads.

use async_trait::async_trait;

use crate::domain::eligibility::DonorFilter;
use crate::domain::{Error, Page, User, UserId, UserProfile};

/// A user's profile with the derived donor facts shown alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub user: User,
    pub profile: UserProfile,
    pub age: Option<i32>,
    pub can_donate: bool,
    pub is_eligible: bool,
    /// Whether the viewer is looking at their own profile.
    pub is_own: bool,
}

/// Domain use-case port for reading accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountQuery: Send + Sync {
    /// Whether no account uses `email` yet.
    async fn email_available(&self, email: &str) -> Result<bool, Error>;

    /// Load `subject`'s profile as seen by `viewer`.
    ///
    /// Profiles the viewer may not see are reported as not found.
    async fn profile(&self, viewer: &UserId, subject: &UserId) -> Result<ProfileView, Error>;

    /// One page of verified, available donors matching `filter`.
    async fn search_donors(&self, filter: DonorFilter, page: u32) -> Result<Page<User>, Error>;
}
