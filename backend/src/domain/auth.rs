//! Login credentials and password policy.
//!
//! Inbound adapters build these values from raw strings before talking to
//! the account service, so services never see unnormalised input.

use std::fmt;

use zeroize::Zeroizing;

/// Minimum accepted password length.
pub const PASSWORD_MIN_LEN: usize = 8;

/// Domain error returned when login payload values are invalid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginValidationError {
    /// Email was missing or blank once trimmed.
    EmptyEmail,
    /// Password was blank.
    EmptyPassword,
}

impl fmt::Display for LoginValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyEmail => write!(f, "email must not be empty"),
            Self::EmptyPassword => write!(f, "password must not be empty"),
        }
    }
}

impl std::error::Error for LoginValidationError {}

/// Validated login credentials.
///
/// ## Invariants
/// - `email` is trimmed, lower-cased and non-empty. It is deliberately not
///   checked against the address grammar: an unknown address simply fails
///   authentication.
/// - `password` is non-empty and keeps caller-provided whitespace.
///
/// # Examples
/// ```
/// use lifeline::domain::LoginCredentials;
///
/// let creds = LoginCredentials::try_from_parts(" Ada@Example.org ", "s3cret-pass").unwrap();
/// assert_eq!(creds.email(), "ada@example.org");
/// assert_eq!(creds.password(), "s3cret-pass");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    email: String,
    password: Zeroizing<String>,
}

impl LoginCredentials {
    /// Construct credentials from raw email/password inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, LoginValidationError> {
        let normalised = email.trim().to_lowercase();
        if normalised.is_empty() {
            return Err(LoginValidationError::EmptyEmail);
        }

        if password.is_empty() {
            return Err(LoginValidationError::EmptyPassword);
        }

        Ok(Self {
            email: normalised,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised email suitable for user lookups.
    pub fn email(&self) -> &str {
        self.email.as_str()
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

/// Reasons a new password is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordPolicyError {
    #[error("password must be at least 8 characters")]
    TooShort,
    #[error("password must not be entirely numeric")]
    AllNumeric,
    #[error("passwords do not match")]
    Mismatch,
}

/// Check a new password and its confirmation.
pub fn check_new_password(password: &str, confirmation: &str) -> Result<(), PasswordPolicyError> {
    if password != confirmation {
        return Err(PasswordPolicyError::Mismatch);
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(PasswordPolicyError::TooShort);
    }
    if password.chars().all(|c| c.is_ascii_digit()) {
        return Err(PasswordPolicyError::AllNumeric);
    }
    Ok(())
}
