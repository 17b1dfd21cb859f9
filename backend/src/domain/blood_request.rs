//! Blood request aggregate and its validated draft.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{BloodGroup, UserId};

/// Fewest units a request may ask for.
pub const UNITS_MIN: u32 = 1;
/// Most units a single request may ask for.
pub const UNITS_MAX: u32 = 10;
/// Maximum length of patient and hospital names.
pub const NAME_MAX: usize = 200;
/// Maximum length of a contact phone number.
pub const PHONE_MAX: usize = 15;

/// Identifier of a blood request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct BloodRequestId(Uuid);

impl BloodRequestId {
    /// Generate a new identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap a stored identifier.
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Access the underlying UUID.
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for BloodRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! storage_enum {
    (
        $(#[$outer:meta])*
        pub enum $name:ident { $($(#[$vmeta:meta])* $variant:ident => $code:literal),+ $(,)? }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Storage and wire code.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($code => Ok(Self::$variant),)+
                    other => Err(format!(concat!("unknown ", stringify!($name), ": {}"), other)),
                }
            }
        }
    };
}

pub(crate) use storage_enum;

storage_enum! {
    /// How soon the blood is needed.
    pub enum Urgency {
        Low => "LOW",
        Medium => "MEDIUM",
        High => "HIGH",
        Critical => "CRITICAL",
    }
}

impl Urgency {
    /// Tiers counted as urgent in request statistics.
    pub const URGENT: [Self; 2] = [Self::High, Self::Critical];
}

impl Default for Urgency {
    fn default() -> Self {
        Self::Medium
    }
}

storage_enum! {
    /// Lifecycle state of a request.
    pub enum RequestStatus {
        /// Open for responses.
        Active => "ACTIVE",
        /// Enough donations were completed.
        Fulfilled => "FULFILLED",
        /// Withdrawn by the requester.
        Cancelled => "CANCELLED",
        /// The needed-by date passed while still active.
        Expired => "EXPIRED",
    }
}

/// A request for units of a given blood group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloodRequest {
    pub id: BloodRequestId,
    pub requester: UserId,
    pub patient_name: String,
    pub blood_group_needed: BloodGroup,
    pub units_needed: u32,
    pub hospital_name: String,
    pub hospital_address: String,
    pub urgency: Urgency,
    pub needed_by: DateTime<Utc>,
    pub description: String,
    pub contact_phone: String,
    pub status: RequestStatus,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BloodRequest {
    /// Open a new active request from a validated draft.
    pub fn open(requester: UserId, draft: BloodRequestDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: BloodRequestId::random(),
            requester,
            patient_name: draft.patient_name,
            blood_group_needed: draft.blood_group_needed,
            units_needed: draft.units_needed,
            hospital_name: draft.hospital_name,
            hospital_address: draft.hospital_address,
            urgency: draft.urgency,
            needed_by: draft.needed_by,
            description: draft.description,
            contact_phone: draft.contact_phone,
            status: RequestStatus::Active,
            is_public: draft.is_public,
            created_at: now,
            updated_at: now,
        }
    }

    /// Overwrite the editable fields with a validated draft.
    pub fn apply(&mut self, draft: BloodRequestDraft, now: DateTime<Utc>) {
        self.patient_name = draft.patient_name;
        self.blood_group_needed = draft.blood_group_needed;
        self.units_needed = draft.units_needed;
        self.hospital_name = draft.hospital_name;
        self.hospital_address = draft.hospital_address;
        self.urgency = draft.urgency;
        self.needed_by = draft.needed_by;
        self.description = draft.description;
        self.contact_phone = draft.contact_phone;
        self.is_public = draft.is_public;
        self.updated_at = now;
    }

    /// Whether `user` created this request.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        &self.requester == user
    }
}

/// Field-level validation failures for request drafts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BloodRequestValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("units needed must be between 1 and 10")]
    UnitsOutOfRange,
    #[error("the needed by date must be in the future")]
    NeededByInPast,
}

impl BloodRequestValidationError {
    /// Name of the offending input field (camelCase, as sent by clients).
    pub const fn field(&self) -> &'static str {
        match self {
            Self::Required { field } | Self::TooLong { field, .. } => *field,
            Self::UnitsOutOfRange => "unitsNeeded",
            Self::NeededByInPast => "neededBy",
        }
    }

    /// Machine-readable failure code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Required { .. } => "required",
            Self::TooLong { .. } => "too_long",
            Self::UnitsOutOfRange => "out_of_range",
            Self::NeededByInPast => "not_in_future",
        }
    }
}

/// Unvalidated request fields as supplied by a client.
#[derive(Debug, Clone)]
pub struct BloodRequestInput {
    pub patient_name: String,
    pub blood_group_needed: BloodGroup,
    pub units_needed: u32,
    pub hospital_name: String,
    pub hospital_address: String,
    pub urgency: Urgency,
    pub needed_by: DateTime<Utc>,
    pub description: String,
    pub contact_phone: String,
    pub is_public: bool,
}

/// Validated editable fields of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloodRequestDraft {
    patient_name: String,
    blood_group_needed: BloodGroup,
    units_needed: u32,
    hospital_name: String,
    hospital_address: String,
    urgency: Urgency,
    needed_by: DateTime<Utc>,
    description: String,
    contact_phone: String,
    is_public: bool,
}

fn required(
    value: String,
    field: &'static str,
    max: Option<usize>,
) -> Result<String, BloodRequestValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BloodRequestValidationError::Required { field });
    }
    match max {
        Some(max) if trimmed.chars().count() > max => {
            Err(BloodRequestValidationError::TooLong { field, max })
        }
        _ => Ok(trimmed.to_owned()),
    }
}

impl BloodRequestDraft {
    /// Validate client input against the current time.
    pub fn validate(
        input: BloodRequestInput,
        now: DateTime<Utc>,
    ) -> Result<Self, BloodRequestValidationError> {
        let patient_name = required(input.patient_name, "patientName", Some(NAME_MAX))?;
        if !(UNITS_MIN..=UNITS_MAX).contains(&input.units_needed) {
            return Err(BloodRequestValidationError::UnitsOutOfRange);
        }
        let hospital_name = required(input.hospital_name, "hospitalName", Some(NAME_MAX))?;
        let hospital_address = required(input.hospital_address, "hospitalAddress", None)?;
        if input.needed_by <= now {
            return Err(BloodRequestValidationError::NeededByInPast);
        }
        let description = required(input.description, "description", None)?;
        let contact_phone = required(input.contact_phone, "contactPhone", Some(PHONE_MAX))?;

        Ok(Self {
            patient_name,
            blood_group_needed: input.blood_group_needed,
            units_needed: input.units_needed,
            hospital_name,
            hospital_address,
            urgency: input.urgency,
            needed_by: input.needed_by,
            description,
            contact_phone,
            is_public: input.is_public,
        })
    }
}
