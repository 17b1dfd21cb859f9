//! Per-user profile settings and donation counters.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;

/// Who may view a user's profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivacyLevel {
    /// Any logged-in user.
    #[default]
    Public,
    /// Logged-in users who are themselves donors.
    DonorsOnly,
    /// Nobody but the owner.
    Private,
}

impl PrivacyLevel {
    /// Storage code.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::DonorsOnly => "DONORS_ONLY",
            Self::Private => "PRIVATE",
        }
    }
}

impl FromStr for PrivacyLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PUBLIC" => Ok(Self::Public),
            "DONORS_ONLY" => Ok(Self::DonorsOnly),
            "PRIVATE" => Ok(Self::Private),
            other => Err(format!("unknown privacy level: {other}")),
        }
    }
}

/// Person to contact in an emergency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
    pub relation: String,
}

/// Profile aggregate created alongside every user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: UserId,
    pub emergency_contact: EmergencyContact,
    pub total_donations: u32,
    pub total_requests_fulfilled: u32,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    pub privacy_level: PrivacyLevel,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// Default profile: public, email notifications on, SMS off, no counters.
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            emergency_contact: EmergencyContact::default(),
            total_donations: 0,
            total_requests_fulfilled: 0,
            email_notifications: true,
            sms_notifications: false,
            privacy_level: PrivacyLevel::Public,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `viewer` may see this profile.
    ///
    /// Owners always can; others depend on the privacy level and on whether
    /// the viewer is a donor.
    pub fn visible_to(&self, viewer: &UserId, viewer_is_donor: bool) -> bool {
        if &self.user_id == viewer {
            return true;
        }
        match self.privacy_level {
            PrivacyLevel::Public => true,
            PrivacyLevel::DonorsOnly => viewer_is_donor,
            PrivacyLevel::Private => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PrivacyLevel::Public, false, true)]
    #[case(PrivacyLevel::DonorsOnly, true, true)]
    #[case(PrivacyLevel::DonorsOnly, false, false)]
    #[case(PrivacyLevel::Private, true, false)]
    fn visibility_follows_privacy_level(
        #[case] level: PrivacyLevel,
        #[case] viewer_is_donor: bool,
        #[case] expected: bool,
    ) {
        let mut profile = UserProfile::new(UserId::random(), Utc::now());
        profile.privacy_level = level;
        assert_eq!(profile.visible_to(&UserId::random(), viewer_is_donor), expected);
    }

    #[rstest]
    fn owners_always_see_their_profile() {
        let owner = UserId::random();
        let mut profile = UserProfile::new(owner.clone(), Utc::now());
        profile.privacy_level = PrivacyLevel::Private;
        assert!(profile.visible_to(&owner, false));
    }

    #[rstest]
    fn privacy_codes_round_trip() {
        for level in [PrivacyLevel::Public, PrivacyLevel::DonorsOnly, PrivacyLevel::Private] {
            assert_eq!(level.as_str().parse::<PrivacyLevel>(), Ok(level));
        }
    }
}
