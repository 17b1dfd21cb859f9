//! Account domain service.
//!
//! Implements [`AccountCommand`] and [`AccountQuery`] over the user
//! repository, the password hasher and the verification mailer.

use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::domain::eligibility::{self, DonorFilter};
use crate::domain::ports::{
    AccountCommand, AccountQuery, PasswordHashError, PasswordHasher, ProfileView,
    RegistrationOutcome, UserRepository, UserRepositoryError, VerificationEmail,
    VerificationMailer, VerificationOutcome,
};
use crate::domain::{
    AccountFormError, Error, LoginCredentials, Page, PageRequest, ProfileChanges, Registration,
    RegistrationForm, SettingsChanges, User, UserId, UserProfile, VerificationToken,
};

/// Donor search page size.
pub const DONORS_PER_PAGE: u32 = 12;

const INVALID_CREDENTIALS: &str = "Invalid email or password.";
const INACTIVE_ACCOUNT: &str = "This account is inactive.";
const UNVERIFIED_EMAIL: &str = "Please verify your email address before logging in.";
const DUPLICATE_EMAIL: &str = "A user with this email already exists.";
const DECOY_PASSWORD: &str = "lifeline-decoy-password";

/// Account service implementing the account driving ports.
#[derive(Clone)]
pub struct AccountService<U, H, M> {
    users: Arc<U>,
    hasher: Arc<H>,
    mailer: Arc<M>,
    clock: Arc<dyn Clock>,
    public_base_url: String,
    decoy_hash: Arc<OnceLock<Option<String>>>,
}

impl<U, H, M> AccountService<U, H, M> {
    /// Create a new service.
    ///
    /// `public_base_url` is the externally reachable origin used to build
    /// verification links, e.g. `https://lifeline.example.org`.
    pub fn new(
        users: Arc<U>,
        hasher: Arc<H>,
        mailer: Arc<M>,
        clock: Arc<dyn Clock>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            hasher,
            mailer,
            clock,
            public_base_url: public_base_url.into(),
            decoy_hash: Arc::default(),
        }
    }

    fn verification_link(&self, token: &VerificationToken) -> String {
        format!(
            "{}/api/v1/verify-email/{token}",
            self.public_base_url.trim_end_matches('/')
        )
    }
}

pub(crate) fn map_user_error(error: UserRepositoryError) -> Error {
    debug!(kind = error.kind(), %error, "user repository call failed");
    match error {
        UserRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("user repository unavailable: {message}"))
        }
        UserRepositoryError::Query { message } => {
            Error::internal(format!("user repository error: {message}"))
        }
        UserRepositoryError::DuplicateEmail { .. } => duplicate_email(),
    }
}

fn map_hash_error(error: PasswordHashError) -> Error {
    Error::internal(format!("password hasher failed: {error}"))
}

fn duplicate_email() -> Error {
    Error::conflict(DUPLICATE_EMAIL).with_details(json!({
        "field": "email",
        "code": "duplicate",
    }))
}

fn form_error(error: AccountFormError) -> Error {
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": error.field(),
        "code": error.code(),
    }))
}

fn user_not_found() -> Error {
    Error::not_found("user not found")
}

impl<U, H, M> AccountService<U, H, M>
where
    U: UserRepository,
    H: PasswordHasher,
    M: VerificationMailer,
{
    async fn load_user(&self, user_id: &UserId) -> Result<User, Error> {
        self.users
            .find_by_id(user_id)
            .await
            .map_err(map_user_error)?
            .ok_or_else(user_not_found)
    }

    /// Spend one hash verification on a login for an unknown email, so its
    /// latency matches a wrong password for a real account.
    fn verify_decoy(&self, password: &str) {
        let decoy = self
            .decoy_hash
            .get_or_init(|| self.hasher.hash(DECOY_PASSWORD).ok());
        if let Some(hash) = decoy {
            self.hasher.verify(password, hash).ok();
        }
    }

    async fn load_profile(&self, user: &User) -> Result<UserProfile, Error> {
        let profile = self
            .users
            .find_profile(&user.id)
            .await
            .map_err(map_user_error)?;
        Ok(profile.unwrap_or_else(|| UserProfile::new(user.id.clone(), user.created_at)))
    }

    async fn send_verification(&self, user: &User, token: &VerificationToken) -> bool {
        let email = VerificationEmail {
            to: user.email.clone(),
            full_name: user.full_name(),
            link: self.verification_link(token),
        };
        match self.mailer.send_verification(&email).await {
            Ok(()) => true,
            Err(error) => {
                warn!(user_id = %user.id, %error, "verification email not sent");
                false
            }
        }
    }
}

#[async_trait]
impl<U, H, M> AccountCommand for AccountService<U, H, M>
where
    U: UserRepository,
    H: PasswordHasher,
    M: VerificationMailer,
{
    async fn register(&self, form: RegistrationForm) -> Result<RegistrationOutcome, Error> {
        let now = self.clock.utc();
        let registration = Registration::validate(form, now.date_naive()).map_err(form_error)?;

        let taken = self
            .users
            .email_exists(registration.email().as_ref())
            .await
            .map_err(map_user_error)?;
        if taken {
            return Err(duplicate_email());
        }

        let password_hash = self
            .hasher
            .hash(registration.password())
            .map_err(map_hash_error)?;
        let token = VerificationToken::generate();
        let user = registration.into_user(UserId::random(), token, now);
        let profile = UserProfile::new(user.id.clone(), now);
        self.users
            .create(&user, &profile, &password_hash)
            .await
            .map_err(map_user_error)?;
        info!(user_id = %user.id, "account registered");

        let email_sent = self.send_verification(&user, &token).await;
        Ok(RegistrationOutcome {
            user_id: user.id,
            email_sent,
        })
    }

    async fn verify_email(&self, token: VerificationToken) -> Result<VerificationOutcome, Error> {
        let mut user = self
            .users
            .find_by_verification_token(&token)
            .await
            .map_err(map_user_error)?
            .ok_or_else(|| Error::not_found("Invalid verification token."))?;

        if user.is_email_verified {
            return Ok(VerificationOutcome::AlreadyVerified);
        }

        user.is_email_verified = true;
        user.updated_at = self.clock.utc();
        self.users.update(&user).await.map_err(map_user_error)?;
        info!(user_id = %user.id, "email verified");
        Ok(VerificationOutcome::Verified)
    }

    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<UserId, Error> {
        let Some(stored) = self
            .users
            .find_credentials(credentials.email())
            .await
            .map_err(map_user_error)?
        else {
            self.verify_decoy(credentials.password());
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };

        let matches = self
            .hasher
            .verify(credentials.password(), &stored.password_hash)
            .map_err(map_hash_error)?;
        if !matches {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }
        if !stored.user.is_active {
            return Err(Error::forbidden(INACTIVE_ACCOUNT));
        }
        if !stored.user.is_email_verified {
            return Err(Error::forbidden(UNVERIFIED_EMAIL));
        }
        Ok(stored.user.id)
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        changes: ProfileChanges,
    ) -> Result<User, Error> {
        let now = self.clock.utc();
        let changes = changes.validate(now.date_naive()).map_err(form_error)?;
        let mut user = self.load_user(user_id).await?;
        let update = changes.into_update(&user, now);
        self.users
            .update_details(&user.id, &update)
            .await
            .map_err(map_user_error)?;
        update.apply_to(&mut user);
        Ok(user)
    }

    async fn update_settings(
        &self,
        user_id: &UserId,
        changes: SettingsChanges,
    ) -> Result<UserProfile, Error> {
        let changes = changes.validate().map_err(form_error)?;
        let user = self.load_user(user_id).await?;
        let mut profile = self.load_profile(&user).await?;
        changes.apply_to(&mut profile, self.clock.utc());
        self.users
            .update_profile(&profile)
            .await
            .map_err(map_user_error)?;
        Ok(profile)
    }

    async fn set_availability(&self, user_id: &UserId, available: bool) -> Result<bool, Error> {
        let user = self.load_user(user_id).await?;
        self.users
            .set_availability(&user.id, available, self.clock.utc())
            .await
            .map_err(map_user_error)?;
        info!(user_id = %user.id, available, "donation availability changed");
        Ok(available)
    }
}

#[async_trait]
impl<U, H, M> AccountQuery for AccountService<U, H, M>
where
    U: UserRepository,
    H: PasswordHasher,
    M: VerificationMailer,
{
    async fn email_available(&self, email: &str) -> Result<bool, Error> {
        let normalised = email.trim().to_lowercase();
        if normalised.is_empty() {
            return Err(Error::invalid_request("email is required").with_details(json!({
                "field": "email",
                "code": "required",
            })));
        }
        let taken = self
            .users
            .email_exists(&normalised)
            .await
            .map_err(map_user_error)?;
        Ok(!taken)
    }

    async fn profile(&self, viewer: &UserId, subject: &UserId) -> Result<ProfileView, Error> {
        let user = self.load_user(subject).await?;
        let profile = self.load_profile(&user).await?;
        let is_own = viewer == subject;

        if !is_own {
            if !user.is_email_verified {
                return Err(user_not_found());
            }
            let viewer_is_donor = self
                .users
                .find_by_id(viewer)
                .await
                .map_err(map_user_error)?
                .is_some_and(|viewer| viewer.is_donor);
            if !profile.visible_to(viewer, viewer_is_donor) {
                return Err(user_not_found());
            }
        }

        let today = self.clock.utc().date_naive();
        Ok(ProfileView {
            age: eligibility::age(&user, today),
            can_donate: eligibility::can_donate(&user, today),
            is_eligible: eligibility::is_eligible_donor(&user, today),
            user,
            profile,
            is_own,
        })
    }

    async fn search_donors(&self, filter: DonorFilter, page: u32) -> Result<Page<User>, Error> {
        self.users
            .search_donors(&filter, PageRequest::new(page, DONORS_PER_PAGE))
            .await
            .map_err(map_user_error)
    }
}

#[cfg(test)]
#[path = "account_service_tests.rs"]
mod tests;
