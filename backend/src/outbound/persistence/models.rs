//! Internal Diesel row structs and their conversions to domain types.
//!
//! These types never leave the persistence layer. Reading a row can fail if
//! a column holds a code the domain does not recognise; such rows surface as
//! query errors rather than panics.

use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::{
    BloodGroup, BloodRequest, BloodRequestId, DonationResponse, EmailAddress, EmergencyContact,
    Gender, PrivacyLevel, ProfileUpdate, RequestStatus, ResponseId, ResponseOutcome, Urgency, User,
    UserId, UserProfile, VerificationToken,
};

use super::schema::{blood_request_responses, blood_requests, user_profiles, users};

fn corrupt(column: &str, detail: impl std::fmt::Display) -> String {
    format!("unreadable {column} column: {detail}")
}

fn to_u32(column: &str, value: i32) -> Result<u32, String> {
    u32::try_from(value).map_err(|err| corrupt(column, err))
}

/// Convert a domain counter into a database integer.
pub(crate) fn to_i32(column: &str, value: u32) -> Result<i32, String> {
    i32::try_from(value).map_err(|err| corrupt(column, err))
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// Row struct for reading from the users table, without the password hash.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub address: String,
    pub blood_group: Option<String>,
    pub weight_kg: Option<f64>,
    pub last_donation_date: Option<NaiveDate>,
    pub medical_conditions: String,
    pub is_donor: bool,
    pub is_recipient: bool,
    pub is_available_for_donation: bool,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub verification_token: Option<Uuid>,
    pub verification_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub(crate) fn into_domain(self) -> Result<User, String> {
        let email = EmailAddress::new(&self.email).map_err(|err| corrupt("email", err))?;
        let gender = self
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()
            .map_err(|err| corrupt("gender", err))?;
        let blood_group = self
            .blood_group
            .as_deref()
            .map(str::parse::<BloodGroup>)
            .transpose()
            .map_err(|err| corrupt("blood_group", err))?;

        Ok(User {
            id: UserId::from_uuid(self.id),
            email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            date_of_birth: self.date_of_birth,
            gender,
            address: self.address,
            blood_group,
            weight_kg: self.weight_kg,
            last_donation_date: self.last_donation_date,
            medical_conditions: self.medical_conditions,
            is_donor: self.is_donor,
            is_recipient: self.is_recipient,
            is_available_for_donation: self.is_available_for_donation,
            is_active: self.is_active,
            is_email_verified: self.is_email_verified,
            verification_token: self.verification_token.map(VerificationToken::from_uuid),
            verification_sent_at: self.verification_sent_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Insertable struct for new accounts.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: &'a str,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<&'static str>,
    pub address: &'a str,
    pub blood_group: Option<&'static str>,
    pub weight_kg: Option<f64>,
    pub last_donation_date: Option<NaiveDate>,
    pub medical_conditions: &'a str,
    pub is_donor: bool,
    pub is_recipient: bool,
    pub is_available_for_donation: bool,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub verification_token: Option<Uuid>,
    pub verification_sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> NewUserRow<'a> {
    pub(crate) fn new(user: &'a User, password_hash: &'a str) -> Self {
        Self {
            id: *user.id.as_uuid(),
            email: user.email.as_ref(),
            password_hash,
            first_name: &user.first_name,
            last_name: &user.last_name,
            phone_number: &user.phone_number,
            date_of_birth: user.date_of_birth,
            gender: user.gender.map(Gender::as_str),
            address: &user.address,
            blood_group: user.blood_group.map(BloodGroup::as_str),
            weight_kg: user.weight_kg,
            last_donation_date: user.last_donation_date,
            medical_conditions: &user.medical_conditions,
            is_donor: user.is_donor,
            is_recipient: user.is_recipient,
            is_available_for_donation: user.is_available_for_donation,
            is_active: user.is_active,
            is_email_verified: user.is_email_verified,
            verification_token: user.verification_token.map(|token| *token.as_uuid()),
            verification_sent_at: user.verification_sent_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Changeset for profile edits, verification and donation stamps.
///
/// Email, password hash and creation time are never rewritten.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct UserUpdate<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: &'a str,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<&'static str>,
    pub address: &'a str,
    pub blood_group: Option<&'static str>,
    pub weight_kg: Option<f64>,
    pub last_donation_date: Option<NaiveDate>,
    pub medical_conditions: &'a str,
    pub is_donor: bool,
    pub is_recipient: bool,
    pub is_available_for_donation: bool,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub verification_token: Option<Uuid>,
    pub verification_sent_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a User> for UserUpdate<'a> {
    fn from(user: &'a User) -> Self {
        Self {
            first_name: &user.first_name,
            last_name: &user.last_name,
            phone_number: &user.phone_number,
            date_of_birth: user.date_of_birth,
            gender: user.gender.map(Gender::as_str),
            address: &user.address,
            blood_group: user.blood_group.map(BloodGroup::as_str),
            weight_kg: user.weight_kg,
            last_donation_date: user.last_donation_date,
            medical_conditions: &user.medical_conditions,
            is_donor: user.is_donor,
            is_recipient: user.is_recipient,
            is_available_for_donation: user.is_available_for_donation,
            is_active: user.is_active,
            is_email_verified: user.is_email_verified,
            verification_token: user.verification_token.map(|token| *token.as_uuid()),
            verification_sent_at: user.verification_sent_at,
            updated_at: user.updated_at,
        }
    }
}

/// Changeset for a profile edit.
///
/// `None` skips a column, so nullable columns are wrapped once more and an
/// unchanged donation date is not written at all.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserDetailsUpdate<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: &'a str,
    pub date_of_birth: Option<Option<NaiveDate>>,
    pub gender: Option<Option<&'static str>>,
    pub address: &'a str,
    pub blood_group: Option<Option<&'static str>>,
    pub weight_kg: Option<Option<f64>>,
    pub last_donation_date: Option<Option<NaiveDate>>,
    pub medical_conditions: &'a str,
    pub is_available_for_donation: bool,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a ProfileUpdate> for UserDetailsUpdate<'a> {
    fn from(update: &'a ProfileUpdate) -> Self {
        Self {
            first_name: &update.first_name,
            last_name: &update.last_name,
            phone_number: &update.phone_number,
            date_of_birth: Some(update.date_of_birth),
            gender: Some(update.gender.map(Gender::as_str)),
            address: &update.address,
            blood_group: Some(update.blood_group.map(BloodGroup::as_str)),
            weight_kg: Some(update.weight_kg),
            last_donation_date: update.last_donation_date,
            medical_conditions: &update.medical_conditions,
            is_available_for_donation: update.is_available_for_donation,
            updated_at: update.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

/// Row struct for the user_profiles table; also used for inserts and updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = user_profiles)]
#[diesel(primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserProfileRow {
    pub user_id: Uuid,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub emergency_contact_relation: String,
    pub total_donations: i32,
    pub total_requests_fulfilled: i32,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub privacy_level: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfileRow {
    pub(crate) fn from_domain(profile: &UserProfile) -> Result<Self, String> {
        Ok(Self {
            user_id: *profile.user_id.as_uuid(),
            emergency_contact_name: profile.emergency_contact.name.clone(),
            emergency_contact_phone: profile.emergency_contact.phone.clone(),
            emergency_contact_relation: profile.emergency_contact.relation.clone(),
            total_donations: to_i32("total_donations", profile.total_donations)?,
            total_requests_fulfilled: to_i32(
                "total_requests_fulfilled",
                profile.total_requests_fulfilled,
            )?,
            email_notifications: profile.email_notifications,
            sms_notifications: profile.sms_notifications,
            privacy_level: profile.privacy_level.as_str().to_owned(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        })
    }

    pub(crate) fn into_domain(self) -> Result<UserProfile, String> {
        let privacy_level = self
            .privacy_level
            .parse::<PrivacyLevel>()
            .map_err(|err| corrupt("privacy_level", err))?;
        Ok(UserProfile {
            user_id: UserId::from_uuid(self.user_id),
            emergency_contact: EmergencyContact {
                name: self.emergency_contact_name,
                phone: self.emergency_contact_phone,
                relation: self.emergency_contact_relation,
            },
            total_donations: to_u32("total_donations", self.total_donations)?,
            total_requests_fulfilled: to_u32(
                "total_requests_fulfilled",
                self.total_requests_fulfilled,
            )?,
            email_notifications: self.email_notifications,
            sms_notifications: self.sms_notifications,
            privacy_level,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Blood requests
// ---------------------------------------------------------------------------

/// Row struct for the blood_requests table; also used for inserts and updates.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = blood_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct BloodRequestRow {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub patient_name: String,
    pub blood_group_needed: String,
    pub units_needed: i32,
    pub hospital_name: String,
    pub hospital_address: String,
    pub urgency: String,
    pub needed_by: DateTime<Utc>,
    pub description: String,
    pub contact_phone: String,
    pub status: String,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BloodRequestRow {
    pub(crate) fn from_domain(request: &BloodRequest) -> Result<Self, String> {
        Ok(Self {
            id: *request.id.as_uuid(),
            requester_id: *request.requester.as_uuid(),
            patient_name: request.patient_name.clone(),
            blood_group_needed: request.blood_group_needed.as_str().to_owned(),
            units_needed: to_i32("units_needed", request.units_needed)?,
            hospital_name: request.hospital_name.clone(),
            hospital_address: request.hospital_address.clone(),
            urgency: request.urgency.as_str().to_owned(),
            needed_by: request.needed_by,
            description: request.description.clone(),
            contact_phone: request.contact_phone.clone(),
            status: request.status.as_str().to_owned(),
            is_public: request.is_public,
            created_at: request.created_at,
            updated_at: request.updated_at,
        })
    }

    pub(crate) fn into_domain(self) -> Result<BloodRequest, String> {
        Ok(BloodRequest {
            id: BloodRequestId::from_uuid(self.id),
            requester: UserId::from_uuid(self.requester_id),
            patient_name: self.patient_name,
            blood_group_needed: self
                .blood_group_needed
                .parse::<BloodGroup>()
                .map_err(|err| corrupt("blood_group_needed", err))?,
            units_needed: to_u32("units_needed", self.units_needed)?,
            hospital_name: self.hospital_name,
            hospital_address: self.hospital_address,
            urgency: self
                .urgency
                .parse::<Urgency>()
                .map_err(|err| corrupt("urgency", err))?,
            needed_by: self.needed_by,
            description: self.description,
            contact_phone: self.contact_phone,
            status: self
                .status
                .parse::<RequestStatus>()
                .map_err(|err| corrupt("status", err))?,
            is_public: self.is_public,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Row struct for the blood_request_responses table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = blood_request_responses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ResponseRow {
    pub id: Uuid,
    pub request_id: Uuid,
    pub donor_id: Uuid,
    pub outcome: String,
    pub message: String,
    pub donor_phone: String,
    pub preferred_contact_time: String,
    pub responded_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&DonationResponse> for ResponseRow {
    fn from(response: &DonationResponse) -> Self {
        Self {
            id: *response.id.as_uuid(),
            request_id: *response.request_id.as_uuid(),
            donor_id: *response.donor.as_uuid(),
            outcome: response.outcome.as_str().to_owned(),
            message: response.message.clone(),
            donor_phone: response.donor_phone.clone(),
            preferred_contact_time: response.preferred_contact_time.clone(),
            responded_at: response.responded_at,
            updated_at: response.updated_at,
        }
    }
}

impl ResponseRow {
    pub(crate) fn into_domain(self) -> Result<DonationResponse, String> {
        Ok(DonationResponse {
            id: ResponseId::from_uuid(self.id),
            request_id: BloodRequestId::from_uuid(self.request_id),
            donor: UserId::from_uuid(self.donor_id),
            outcome: self
                .outcome
                .parse::<ResponseOutcome>()
                .map_err(|err| corrupt("outcome", err))?,
            message: self.message,
            donor_phone: self.donor_phone,
            preferred_contact_time: self.preferred_contact_time,
            responded_at: self.responded_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request_row() -> BloodRequestRow {
        let now = Utc::now();
        BloodRequestRow {
            id: Uuid::new_v4(),
            requester_id: Uuid::new_v4(),
            patient_name: "Kiran".into(),
            blood_group_needed: "AB-".into(),
            units_needed: 3,
            hospital_name: "Bir Hospital".into(),
            hospital_address: "Kanti Path".into(),
            urgency: "CRITICAL".into(),
            needed_by: now,
            description: "Trauma".into(),
            contact_phone: "014221119".into(),
            status: "ACTIVE".into(),
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    fn request_row_converts_codes() {
        let request = request_row().into_domain().expect("valid row");
        assert_eq!(request.blood_group_needed, BloodGroup::AbNegative);
        assert_eq!(request.urgency, Urgency::Critical);
        assert_eq!(request.units_needed, 3);
        let back = BloodRequestRow::from_domain(&request).expect("encodes");
        assert_eq!(back.blood_group_needed, "AB-");
    }

    #[rstest]
    #[case::blood_group("blood_group_needed")]
    #[case::negative_units("units_needed")]
    fn unknown_codes_are_reported(#[case] column: &str) {
        let mut row = request_row();
        match column {
            "blood_group_needed" => row.blood_group_needed = "C+".into(),
            _ => row.units_needed = -1,
        }
        let err = row.into_domain().expect_err("corrupt row");
        assert!(err.contains(column), "{err}");
    }

    #[rstest]
    fn profile_row_rejects_unknown_privacy() {
        let now = Utc::now();
        let mut row = UserProfileRow::from_domain(&UserProfile::new(UserId::random(), now))
            .expect("encodes");
        row.privacy_level = "FRIENDS".into();
        assert!(row.into_domain().is_err());
    }
}
