//! Donor eligibility and request matching rules.
//!
//! Everything here is a pure function of domain values plus the current
//! date or time supplied by the caller. Missing data never raises: a user
//! without a date of birth, weight or blood group is simply not eligible.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use super::{BloodGroup, BloodRequest, RequestStatus, User, UserId};

/// Youngest age, in whole years, at which a user may donate.
pub const MIN_DONOR_AGE: i32 = 18;
/// Oldest age, in whole years, at which a user may donate.
pub const MAX_DONOR_AGE: i32 = 65;
/// Minimum body weight for donation.
pub const MIN_DONOR_WEIGHT_KG: f64 = 50.0;
/// Days that must pass between two donations.
pub const DONATION_INTERVAL_DAYS: i64 = 90;

/// Whole years between the user's date of birth and `today`.
///
/// Returns `None` when the date of birth is unknown. A birth date in the
/// future yields a negative age.
///
/// # Examples
/// ```
/// use chrono::{NaiveDate, Utc};
/// use lifeline::domain::{eligibility, EmailAddress, User, UserId};
///
/// let mut user = User::new(UserId::random(), EmailAddress::new("a@b.io").unwrap(), Utc::now());
/// user.date_of_birth = NaiveDate::from_ymd_opt(1990, 6, 15);
/// let today = NaiveDate::from_ymd_opt(2026, 6, 14).unwrap();
/// assert_eq!(eligibility::age(&user, today), Some(35));
/// ```
pub fn age(user: &User, today: NaiveDate) -> Option<i32> {
    user.date_of_birth.map(|born| years_between(born, today))
}

/// Whole birthdays between `born` and `on`; negative if `born` is later.
pub fn years_between(born: NaiveDate, on: NaiveDate) -> i32 {
    let mut years = on.year() - born.year();
    if (on.month(), on.day()) < (born.month(), born.day()) {
        years -= 1;
    }
    years
}

/// Whether the user may donate today, considering only donor status,
/// availability and the interval since their last donation.
pub fn can_donate(user: &User, today: NaiveDate) -> bool {
    if !user.is_donor || !user.is_available_for_donation {
        return false;
    }
    match user.last_donation_date {
        None => true,
        Some(last) => (today - last).num_days() >= DONATION_INTERVAL_DAYS,
    }
}

/// Whether the user meets every donor criterion: age, weight, a known blood
/// group and [`can_donate`].
pub fn is_eligible_donor(user: &User, today: NaiveDate) -> bool {
    let age_ok = age(user, today).is_some_and(|years| (MIN_DONOR_AGE..=MAX_DONOR_AGE).contains(&years));
    let weight_ok = user.weight_kg.is_some_and(|kg| kg >= MIN_DONOR_WEIGHT_KG);
    age_ok && weight_ok && user.blood_group.is_some() && can_donate(user, today)
}

/// Whether the request's needed-by time has passed.
pub fn is_expired(request: &BloodRequest, now: DateTime<Utc>) -> bool {
    now > request.needed_by
}

/// Whether `user` may respond to `request` at `now`.
///
/// `None` stands for an anonymous visitor, who can never accept.
pub fn can_accept(request: &BloodRequest, user: Option<&User>, now: DateTime<Utc>) -> bool {
    let Some(user) = user else {
        return false;
    };
    !request.is_owned_by(&user.id)
        && is_eligible_donor(user, now.date_naive())
        && user.blood_group == Some(request.blood_group_needed)
        && request.status == RequestStatus::Active
        && !is_expired(request, now)
}

/// Criteria for donor searches.
///
/// The same value drives both the in-memory matcher ([`DonorFilter::matches`])
/// and the SQL adapter, so the two stores always agree on who qualifies.
/// Every search is restricted to verified, available donors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DonorFilter {
    pub blood_group: Option<BloodGroup>,
    /// Case-insensitive substring of the donor's address.
    pub location: Option<String>,
    pub exclude: Option<UserId>,
}

impl DonorFilter {
    /// Donors compatible with a request: same blood group, never the requester.
    pub fn compatible_with(request: &BloodRequest) -> Self {
        Self {
            blood_group: Some(request.blood_group_needed),
            location: None,
            exclude: Some(request.requester.clone()),
        }
    }

    /// Lower-cased, non-empty location needle.
    pub fn location_needle(&self) -> Option<String> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase)
    }

    /// Evaluate the filter against one user.
    pub fn matches(&self, user: &User) -> bool {
        if !(user.is_donor && user.is_available_for_donation && user.is_email_verified) {
            return false;
        }
        if self.exclude.as_ref() == Some(&user.id) {
            return false;
        }
        if self.blood_group.is_some() && user.blood_group != self.blood_group {
            return false;
        }
        match self.location_needle() {
            Some(needle) => user.address.to_lowercase().contains(&needle),
            None => true,
        }
    }
}

/// Users from `candidates` who could be asked to donate for `request`.
pub fn compatible_donors<'a, I>(request: &BloodRequest, candidates: I) -> Vec<&'a User>
where
    I: IntoIterator<Item = &'a User>,
{
    let filter = DonorFilter::compatible_with(request);
    candidates
        .into_iter()
        .filter(|user| filter.matches(user))
        .collect()
}
