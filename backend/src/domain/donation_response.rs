//! A donor's reply to a blood request.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::blood_request::storage_enum;
use super::{BloodRequestId, UserId};

/// Maximum length of the donor's phone on a response.
pub const DONOR_PHONE_MAX: usize = 15;
/// Maximum length of the preferred contact time note.
pub const CONTACT_TIME_MAX: usize = 100;

/// Identifier of a donation response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct ResponseId(Uuid);

impl ResponseId {
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

impl fmt::Display for ResponseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

storage_enum! {
    /// What the donor said, and whether the donation happened.
    pub enum ResponseOutcome {
        Accepted => "ACCEPTED",
        Declined => "DECLINED",
        /// The requester confirmed the donation took place.
        Completed => "COMPLETED",
    }
}

/// A donor's reply; at most one per (donor, request) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationResponse {
    pub id: ResponseId,
    pub request_id: BloodRequestId,
    pub donor: UserId,
    pub outcome: ResponseOutcome,
    pub message: String,
    pub donor_phone: String,
    pub preferred_contact_time: String,
    pub responded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Donor-supplied reply fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseReply {
    pub outcome: ResponseOutcome,
    pub message: String,
    pub donor_phone: String,
    pub preferred_contact_time: String,
}

/// Validation failures for a reply.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResponseReplyError {
    /// Donors may only accept or decline; completion is recorded by the requester.
    #[error("a response must either accept or decline the request")]
    OutcomeNotAllowed,
    #[error("donor phone is required")]
    MissingPhone,
    #[error("{field} is too long")]
    TooLong { field: &'static str },
}

impl ResponseReply {
    /// Check the reply before it is stored.
    pub fn validate(self) -> Result<Self, ResponseReplyError> {
        if self.outcome == ResponseOutcome::Completed {
            return Err(ResponseReplyError::OutcomeNotAllowed);
        }
        let donor_phone = self.donor_phone.trim().to_owned();
        if donor_phone.is_empty() {
            return Err(ResponseReplyError::MissingPhone);
        }
        if donor_phone.chars().count() > DONOR_PHONE_MAX {
            return Err(ResponseReplyError::TooLong { field: "donorPhone" });
        }
        let preferred_contact_time = self.preferred_contact_time.trim().to_owned();
        if preferred_contact_time.chars().count() > CONTACT_TIME_MAX {
            return Err(ResponseReplyError::TooLong {
                field: "preferredContactTime",
            });
        }
        Ok(Self {
            outcome: self.outcome,
            message: self.message.trim().to_owned(),
            donor_phone,
            preferred_contact_time,
        })
    }
}

impl DonationResponse {
    /// Record a validated reply from `donor` to `request_id`.
    pub fn new(
        request_id: BloodRequestId,
        donor: UserId,
        reply: ResponseReply,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ResponseId::random(),
            request_id,
            donor,
            outcome: reply.outcome,
            message: reply.message,
            donor_phone: reply.donor_phone,
            preferred_contact_time: reply.preferred_contact_time,
            responded_at: now,
            updated_at: now,
        }
    }
}
