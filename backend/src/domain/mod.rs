//! Domain primitives, aggregates and services.
//!
//! Purpose: Define the strongly typed entities shared by the HTTP and
//! persistence layers, the donor eligibility rules, and the services that
//! implement the driving ports. Nothing in here performs I/O directly;
//! services reach storage, hashing and mail through [`ports`].
//!
//! Public surface:
//! - Error (alias to `error::Error`) — API error response payload.
//! - User, UserProfile — account identity, donor attributes and settings.
//! - BloodRequest, DonationResponse — the request aggregate and its replies.
//! - [`eligibility`] — pure predicates deciding who may donate and respond.
//! - AccountService, BloodRequestService — driving port implementations.

pub mod account_service;
pub mod auth;
pub mod blood_group;
pub mod blood_request;
pub mod blood_request_service;
pub mod donation_response;
pub mod eligibility;
pub mod error;
pub mod pagination;
pub mod ports;
pub mod profile;
pub mod profile_changes;
pub mod registration;
pub mod trace_id;
pub mod user;

#[cfg(test)]
pub(crate) mod fixtures;

pub use self::account_service::AccountService;
pub use self::auth::{
    check_new_password, LoginCredentials, LoginValidationError, PasswordPolicyError,
};
pub use self::blood_group::{BloodGroup, BloodGroupParseError};
pub use self::blood_request::{
    BloodRequest, BloodRequestDraft, BloodRequestId, BloodRequestInput,
    BloodRequestValidationError, RequestStatus, Urgency,
};
pub use self::blood_request_service::BloodRequestService;
pub use self::donation_response::{
    DonationResponse, ResponseId, ResponseOutcome, ResponseReply, ResponseReplyError,
};
pub use self::eligibility::DonorFilter;
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::pagination::{Page, PageRequest};
pub use self::profile::{EmergencyContact, PrivacyLevel, UserProfile};
pub use self::profile_changes::{ProfileChanges, ProfileUpdate, SettingsChanges};
pub use self::registration::{AccountFormError, Registration, RegistrationForm};
pub use self::trace_id::TraceId;
pub use self::user::{EmailAddress, Gender, User, UserId, UserValidationError, VerificationToken};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use lifeline::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::forbidden("nope"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
