//! Account registration form and its validation.

use chrono::{DateTime, NaiveDate, Utc};
use zeroize::Zeroizing;

use super::auth::{PasswordPolicyError, check_new_password};
use super::eligibility::years_between;
use super::{BloodGroup, EmailAddress, Gender, User, UserId, UserValidationError, VerificationToken};

/// Longest accepted first or last name.
pub const NAME_MAX: usize = 30;
/// Longest accepted phone number, before separators are stripped.
pub const PHONE_MAX: usize = 15;
/// Longest accepted city.
pub const CITY_MAX: usize = 100;
/// Youngest age at which an account may be opened.
pub const MIN_REGISTRATION_AGE: i32 = 16;
/// Oldest age at which an account may be opened.
pub const MAX_REGISTRATION_AGE: i32 = 65;
/// Accepted weight range in kilograms.
pub const WEIGHT_RANGE_KG: std::ops::RangeInclusive<f64> = 30.0..=200.0;

/// Field-level failures for registration and profile forms.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AccountFormError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{0}")]
    Email(UserValidationError),
    #[error("please enter a valid phone number")]
    InvalidPhone { field: &'static str },
    #[error("you must be between 16 and 65 years old to register")]
    AgeOutOfRange,
    #[error("weight must be between 30 and 200 kg")]
    WeightOutOfRange,
    #[error("you must accept the terms and conditions")]
    TermsNotAccepted,
    #[error("last donation date cannot be in the future")]
    LastDonationInFuture,
    #[error("{0}")]
    Password(PasswordPolicyError),
}

impl AccountFormError {
    /// Name of the offending input field (camelCase, as sent by clients).
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::TooLong { field, .. }
            | Self::InvalidPhone { field } => *field,
            Self::Email(_) => "email",
            Self::AgeOutOfRange => "dateOfBirth",
            Self::WeightOutOfRange => "weightKg",
            Self::TermsNotAccepted => "termsAccepted",
            Self::LastDonationInFuture => "lastDonationDate",
            Self::Password(PasswordPolicyError::Mismatch) => "passwordConfirmation",
            Self::Password(_) => "password",
        }
    }

    /// Machine-readable failure code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Required { .. } => "required",
            Self::TooLong { .. } => "too_long",
            Self::Email(_) | Self::InvalidPhone { .. } => "invalid_format",
            Self::AgeOutOfRange | Self::WeightOutOfRange => "out_of_range",
            Self::LastDonationInFuture => "in_future",
            Self::TermsNotAccepted => "terms_not_accepted",
            Self::Password(PasswordPolicyError::Mismatch) => "mismatch",
            Self::Password(_) => "weak_password",
        }
    }
}

/// Unvalidated sign-up input.
#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_group: Option<BloodGroup>,
    pub city: String,
    pub weight_kg: Option<f64>,
    pub terms_accepted: bool,
    pub password: Zeroizing<String>,
    pub password_confirmation: Zeroizing<String>,
}

/// A registration that passed every field check.
///
/// Email uniqueness is not covered; the account service checks it against
/// the repository.
#[derive(Debug, Clone)]
pub struct Registration {
    email: EmailAddress,
    first_name: String,
    last_name: String,
    phone_number: String,
    date_of_birth: NaiveDate,
    gender: Gender,
    blood_group: BloodGroup,
    address: String,
    weight_kg: Option<f64>,
    password: Zeroizing<String>,
}

pub(crate) fn bounded(
    value: &str,
    field: &'static str,
    max: usize,
) -> Result<String, AccountFormError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AccountFormError::Required { field });
    }
    if trimmed.chars().count() > max {
        return Err(AccountFormError::TooLong { field, max });
    }
    Ok(trimmed.to_owned())
}

/// Accept digits separated by `+`, `-` or spaces, at most [`PHONE_MAX`] long.
pub(crate) fn phone(value: &str, field: &'static str) -> Result<String, AccountFormError> {
    let trimmed = bounded(value, field, PHONE_MAX)?;
    let digits: String = trimmed
        .chars()
        .filter(|c| !matches!(c, '+' | '-' | ' '))
        .collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AccountFormError::InvalidPhone { field });
    }
    Ok(trimmed)
}

pub(crate) fn weight(value: Option<f64>) -> Result<Option<f64>, AccountFormError> {
    match value {
        Some(kg) if !WEIGHT_RANGE_KG.contains(&kg) => Err(AccountFormError::WeightOutOfRange),
        other => Ok(other),
    }
}

impl Registration {
    /// Validate a sign-up form as of `today`.
    pub fn validate(form: RegistrationForm, today: NaiveDate) -> Result<Self, AccountFormError> {
        let email = EmailAddress::new(&form.email).map_err(AccountFormError::Email)?;
        let first_name = bounded(&form.first_name, "firstName", NAME_MAX)?;
        let last_name = bounded(&form.last_name, "lastName", NAME_MAX)?;
        let phone_number = phone(&form.phone_number, "phoneNumber")?;

        let date_of_birth = form.date_of_birth.ok_or(AccountFormError::Required {
            field: "dateOfBirth",
        })?;
        let years = years_between(date_of_birth, today);
        if !(MIN_REGISTRATION_AGE..=MAX_REGISTRATION_AGE).contains(&years) {
            return Err(AccountFormError::AgeOutOfRange);
        }

        let gender = form
            .gender
            .ok_or(AccountFormError::Required { field: "gender" })?;
        let blood_group = form
            .blood_group
            .ok_or(AccountFormError::Required { field: "bloodGroup" })?;
        let address = bounded(&form.city, "city", CITY_MAX)?;
        let weight_kg = weight(form.weight_kg)?;

        if !form.terms_accepted {
            return Err(AccountFormError::TermsNotAccepted);
        }
        check_new_password(&form.password, &form.password_confirmation)
            .map_err(AccountFormError::Password)?;

        Ok(Self {
            email,
            first_name,
            last_name,
            phone_number,
            date_of_birth,
            gender,
            blood_group,
            address,
            weight_kg,
            password: form.password,
        })
    }

    /// Normalised email address.
    pub fn email(&self) -> &EmailAddress {
        &self.email
    }

    /// Plain-text password, to be hashed before storage.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }

    /// Build the new unverified user awaiting `token` confirmation.
    pub fn into_user(self, id: UserId, token: VerificationToken, now: DateTime<Utc>) -> User {
        let mut user = User::new(id, self.email, now);
        user.first_name = self.first_name;
        user.last_name = self.last_name;
        user.phone_number = self.phone_number;
        user.date_of_birth = Some(self.date_of_birth);
        user.gender = Some(self.gender);
        user.blood_group = Some(self.blood_group);
        user.address = self.address;
        user.weight_kg = self.weight_kg;
        user.verification_token = Some(token);
        user.verification_sent_at = Some(now);
        user
    }
}
