//! Validated edits to a user's medical details and profile settings.

use chrono::{DateTime, NaiveDate, Utc};

use super::registration::{AccountFormError, NAME_MAX, bounded, phone, weight};
use super::{BloodGroup, EmergencyContact, Gender, PrivacyLevel, User, UserProfile};

/// Longest accepted emergency contact name.
pub const CONTACT_NAME_MAX: usize = 200;
/// Longest accepted emergency contact relation.
pub const CONTACT_RELATION_MAX: usize = 100;

/// Editable user fields, as submitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileChanges {
    pub first_name: String,
    pub last_name: String,
    /// Blank clears the stored number.
    pub phone_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_group: Option<BloodGroup>,
    pub weight_kg: Option<f64>,
    pub address: String,
    pub last_donation_date: Option<NaiveDate>,
    pub medical_conditions: String,
    pub is_available_for_donation: bool,
}

impl ProfileChanges {
    /// Check every field as of `today`, returning normalised changes.
    pub fn validate(self, today: NaiveDate) -> Result<Self, AccountFormError> {
        let first_name = bounded(&self.first_name, "firstName", NAME_MAX)?;
        let last_name = bounded(&self.last_name, "lastName", NAME_MAX)?;
        let phone_number = if self.phone_number.trim().is_empty() {
            String::new()
        } else {
            phone(&self.phone_number, "phoneNumber")?
        };
        let weight_kg = weight(self.weight_kg)?;
        if self.last_donation_date.is_some_and(|date| date > today) {
            return Err(AccountFormError::LastDonationInFuture);
        }

        Ok(Self {
            first_name,
            last_name,
            phone_number,
            weight_kg,
            address: self.address.trim().to_owned(),
            medical_conditions: self.medical_conditions.trim().to_owned(),
            ..self
        })
    }

    /// Turn validated changes into the column set to persist for `current`.
    ///
    /// The stored donation date is only rewritten when the edit moves it, so
    /// a donation recorded while the form was open survives the save.
    pub fn into_update(self, current: &User, now: DateTime<Utc>) -> ProfileUpdate {
        let last_donation_date = (self.last_donation_date != current.last_donation_date)
            .then_some(self.last_donation_date);
        ProfileUpdate {
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            date_of_birth: self.date_of_birth,
            gender: self.gender,
            blood_group: self.blood_group,
            weight_kg: self.weight_kg,
            address: self.address,
            last_donation_date,
            medical_conditions: self.medical_conditions,
            is_available_for_donation: self.is_available_for_donation,
            updated_at: now,
        }
    }
}

/// The user columns a profile edit writes.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<Gender>,
    pub blood_group: Option<BloodGroup>,
    pub weight_kg: Option<f64>,
    pub address: String,
    /// `None` leaves the stored date untouched.
    pub last_donation_date: Option<Option<NaiveDate>>,
    pub medical_conditions: String,
    pub is_available_for_donation: bool,
    pub updated_at: DateTime<Utc>,
}

impl ProfileUpdate {
    /// Overwrite the columns this update names.
    pub fn apply_to(&self, user: &mut User) {
        user.first_name.clone_from(&self.first_name);
        user.last_name.clone_from(&self.last_name);
        user.phone_number.clone_from(&self.phone_number);
        user.date_of_birth = self.date_of_birth;
        user.gender = self.gender;
        user.blood_group = self.blood_group;
        user.weight_kg = self.weight_kg;
        user.address.clone_from(&self.address);
        if let Some(date) = self.last_donation_date {
            user.last_donation_date = date;
        }
        user.medical_conditions.clone_from(&self.medical_conditions);
        user.is_available_for_donation = self.is_available_for_donation;
        user.updated_at = self.updated_at;
    }
}

/// Editable [`UserProfile`] settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsChanges {
    pub emergency_contact: EmergencyContact,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub privacy_level: PrivacyLevel,
}

fn optional(value: &str, field: &'static str, max: usize) -> Result<String, AccountFormError> {
    if value.trim().is_empty() {
        return Ok(String::new());
    }
    bounded(value, field, max)
}

impl SettingsChanges {
    /// Check the emergency contact fields.
    pub fn validate(self) -> Result<Self, AccountFormError> {
        let contact = self.emergency_contact;
        let name = optional(&contact.name, "emergencyContact.name", CONTACT_NAME_MAX)?;
        let phone_number = if contact.phone.trim().is_empty() {
            String::new()
        } else {
            phone(&contact.phone, "emergencyContact.phone")?
        };
        let relation = optional(
            &contact.relation,
            "emergencyContact.relation",
            CONTACT_RELATION_MAX,
        )?;
        Ok(Self {
            emergency_contact: EmergencyContact {
                name,
                phone: phone_number,
                relation,
            },
            ..self
        })
    }

    /// Overwrite the settings held by `profile`.
    pub fn apply_to(self, profile: &mut UserProfile, now: DateTime<Utc>) {
        profile.emergency_contact = self.emergency_contact;
        profile.email_notifications = self.email_notifications;
        profile.sms_notifications = self.sms_notifications;
        profile.privacy_level = self.privacy_level;
        profile.updated_at = now;
    }
}
