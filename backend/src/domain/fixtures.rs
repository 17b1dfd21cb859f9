//! Shared fixtures for domain service tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use mockable::Clock;

use super::{
    BloodGroup, BloodRequest, BloodRequestId, EmailAddress, RequestStatus, Urgency, User, UserId,
};

pub(crate) struct FixtureClock {
    pub(crate) utc_now: DateTime<Utc>,
}

impl Clock for FixtureClock {
    fn local(&self) -> DateTime<Local> {
        self.utc_now.with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        self.utc_now
    }
}

pub(crate) fn fixture_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0)
        .single()
        .expect("valid fixture timestamp")
}

pub(crate) fn fixture_clock() -> Arc<dyn Clock> {
    Arc::new(FixtureClock {
        utc_now: fixture_now(),
    })
}

/// Verified 30 year old O+ donor weighing 60 kg.
pub(crate) fn donor(email: &str) -> User {
    let now = fixture_now();
    let mut user = User::new(
        UserId::random(),
        EmailAddress::new(email).expect("valid fixture email"),
        now,
    );
    user.first_name = "Test".into();
    user.last_name = "Donor".into();
    user.date_of_birth = NaiveDate::from_ymd_opt(1996, 1, 15);
    user.weight_kg = Some(60.0);
    user.blood_group = Some(BloodGroup::OPositive);
    user.address = "Kathmandu".into();
    user.is_email_verified = true;
    user
}

/// Active public O+ request for one unit, due tomorrow.
pub(crate) fn request_by(requester: &UserId) -> BloodRequest {
    let now = fixture_now();
    BloodRequest {
        id: BloodRequestId::random(),
        requester: requester.clone(),
        patient_name: "Patient Zero".into(),
        blood_group_needed: BloodGroup::OPositive,
        units_needed: 1,
        hospital_name: "Civil Hospital".into(),
        hospital_address: "New Baneshwor".into(),
        urgency: Urgency::High,
        needed_by: now + Duration::days(1),
        description: "Accident victim".into(),
        contact_phone: "5550100".into(),
        status: RequestStatus::Active,
        is_public: true,
        created_at: now,
        updated_at: now,
    }
}
