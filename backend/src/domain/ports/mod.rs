//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driving ports (`*Command`, `*Query`) are implemented by domain services
//! and called by inbound adapters. Driven ports (repositories, the password
//! hasher and the mailer) are implemented by outbound adapters.

mod macros;
pub(crate) use macros::define_port_error;

mod account_command;
mod account_query;
mod blood_request_command;
mod blood_request_query;
mod blood_request_repository;
mod password_hasher;
mod response_repository;
mod user_repository;
mod verification_mailer;

#[cfg(test)]
pub use account_command::MockAccountCommand;
pub use account_command::{AccountCommand, RegistrationOutcome, VerificationOutcome};
#[cfg(test)]
pub use account_query::MockAccountQuery;
pub use account_query::{AccountQuery, ProfileView};
#[cfg(test)]
pub use blood_request_command::MockBloodRequestCommand;
pub use blood_request_command::BloodRequestCommand;
#[cfg(test)]
pub use blood_request_query::MockBloodRequestQuery;
pub use blood_request_query::{
    BloodRequestQuery, Dashboard, HomeSummary, OutcomeCounts, PublicRequests, RequestDetail,
    RequestSearch, RequestStats, ResponseList, ResponseSearch,
};
#[cfg(test)]
pub use blood_request_repository::MockBloodRequestRepository;
pub use blood_request_repository::{
    BloodRequestRepository, BloodRequestRepositoryError, RequestFilter,
};
#[cfg(test)]
pub use password_hasher::MockPasswordHasher;
pub use password_hasher::{PasswordHashError, PasswordHasher};
#[cfg(test)]
pub use response_repository::MockResponseRepository;
pub use response_repository::{
    DonationCompletion, ResponseFilter, ResponseRecord, ResponseRepository,
    ResponseRepositoryError,
};
#[cfg(test)]
pub use user_repository::MockUserRepository;
pub use user_repository::{StoredCredentials, UserRepository, UserRepositoryError};
#[cfg(test)]
pub use verification_mailer::MockVerificationMailer;
pub use verification_mailer::{MailerError, VerificationEmail, VerificationMailer};
