//! Response payloads shared by several handler modules.
//!
//! Identifiers are rendered as strings and timestamps as RFC 3339 text so
//! the JSON shape does not depend on serde defaults of domain types.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::ports::ResponseRecord;
use crate::domain::{
    BloodGroup, BloodRequest, DonationResponse, EmergencyContact, Gender, Page, PrivacyLevel,
    RequestStatus, ResponseOutcome, Urgency, User, UserProfile,
};

/// One page of a listing.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    /// Convert a domain page, mapping every item.
    pub fn from_page<U>(page: Page<U>, f: impl FnMut(U) -> T) -> Self {
        let page = page.map(f);
        Self {
            items: page.items,
            page: page.page,
            per_page: page.per_page,
            total_items: page.total_items,
            total_pages: page.total_pages,
        }
    }
}

/// Full account details, returned to the account owner.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub phone_number: String,
    /// `YYYY-MM-DD`.
    pub date_of_birth: Option<String>,
    pub gender: Option<Gender>,
    pub address: String,
    pub blood_group: Option<BloodGroup>,
    pub weight_kg: Option<f64>,
    pub last_donation_date: Option<String>,
    pub medical_conditions: String,
    pub is_donor: bool,
    pub is_recipient: bool,
    pub is_available_for_donation: bool,
    pub is_email_verified: bool,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        let full_name = user.full_name();
        Self {
            id: user.id.to_string(),
            email: user.email.to_string(),
            first_name: user.first_name,
            last_name: user.last_name,
            full_name,
            phone_number: user.phone_number,
            date_of_birth: user.date_of_birth.map(|date| date.to_string()),
            gender: user.gender,
            address: user.address,
            blood_group: user.blood_group,
            weight_kg: user.weight_kg,
            last_donation_date: user.last_donation_date.map(|date| date.to_string()),
            medical_conditions: user.medical_conditions,
            is_donor: user.is_donor,
            is_recipient: user.is_recipient,
            is_available_for_donation: user.is_available_for_donation,
            is_email_verified: user.is_email_verified,
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Donor card shown in search results and compatible-donor lists.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonorResponse {
    pub id: String,
    pub full_name: String,
    pub blood_group: Option<BloodGroup>,
    pub address: String,
    pub phone_number: String,
    pub last_donation_date: Option<String>,
}

impl From<User> for DonorResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.to_string(),
            full_name: user.full_name(),
            blood_group: user.blood_group,
            address: user.address,
            phone_number: user.phone_number,
            last_donation_date: user.last_donation_date.map(|date| date.to_string()),
        }
    }
}

/// Profile settings and donation counters.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub emergency_contact: EmergencyContact,
    pub total_donations: u32,
    pub total_requests_fulfilled: u32,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub privacy_level: PrivacyLevel,
}

impl From<UserProfile> for ProfileResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            emergency_contact: profile.emergency_contact,
            total_donations: profile.total_donations,
            total_requests_fulfilled: profile.total_requests_fulfilled,
            email_notifications: profile.email_notifications,
            sms_notifications: profile.sms_notifications,
            privacy_level: profile.privacy_level,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BloodRequestResponse {
    #[schema(example = "8c1f0a0e-2f5e-4b57-9d0c-3d2f6c1e9a44")]
    pub id: String,
    pub requester_id: String,
    pub patient_name: String,
    pub blood_group_needed: BloodGroup,
    pub units_needed: u32,
    pub hospital_name: String,
    pub hospital_address: String,
    pub urgency: Urgency,
    pub needed_by: String,
    pub description: String,
    pub contact_phone: String,
    pub status: RequestStatus,
    pub is_public: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<BloodRequest> for BloodRequestResponse {
    fn from(request: BloodRequest) -> Self {
        Self {
            id: request.id.to_string(),
            requester_id: request.requester.to_string(),
            patient_name: request.patient_name,
            blood_group_needed: request.blood_group_needed,
            units_needed: request.units_needed,
            hospital_name: request.hospital_name,
            hospital_address: request.hospital_address,
            urgency: request.urgency,
            needed_by: request.needed_by.to_rfc3339(),
            description: request.description,
            contact_phone: request.contact_phone,
            status: request.status,
            is_public: request.is_public,
            created_at: request.created_at.to_rfc3339(),
            updated_at: request.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DonationResponseResponse {
    pub id: String,
    pub request_id: String,
    pub donor_id: String,
    pub outcome: ResponseOutcome,
    pub message: String,
    pub donor_phone: String,
    pub preferred_contact_time: String,
    pub responded_at: String,
    pub updated_at: String,
}

impl From<DonationResponse> for DonationResponseResponse {
    fn from(response: DonationResponse) -> Self {
        Self {
            id: response.id.to_string(),
            request_id: response.request_id.to_string(),
            donor_id: response.donor.to_string(),
            outcome: response.outcome,
            message: response.message,
            donor_phone: response.donor_phone,
            preferred_contact_time: response.preferred_contact_time,
            responded_at: response.responded_at.to_rfc3339(),
            updated_at: response.updated_at.to_rfc3339(),
        }
    }
}

/// A response together with its request and the donor's name.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRecordResponse {
    pub response: DonationResponseResponse,
    pub request: BloodRequestResponse,
    pub donor_name: String,
}

impl From<ResponseRecord> for ResponseRecordResponse {
    fn from(record: ResponseRecord) -> Self {
        Self {
            response: record.response.into(),
            request: record.request.into(),
            donor_name: record.donor_name,
        }
    }
}
