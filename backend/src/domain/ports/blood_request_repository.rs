//! Port for blood request persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    BloodGroup, BloodRequest, BloodRequestId, Page, PageRequest, RequestStatus, Urgency, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by blood request repository adapters.
    pub enum BloodRequestRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "blood request repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "blood request repository query failed: {message}",
    }
}

/// Selection criteria for request listings and counts.
///
/// Every field narrows the result; the default value matches every request.
/// Adapters evaluate the same criteria, either with [`RequestFilter::matches`]
/// or with equivalent SQL predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub requester: Option<UserId>,
    pub exclude_requester: Option<UserId>,
    pub public_only: bool,
    pub status: Option<RequestStatus>,
    pub blood_group: Option<BloodGroup>,
    /// Empty means any urgency.
    pub urgencies: Vec<Urgency>,
    /// Case-insensitive substring of patient name, hospital or description.
    pub search: Option<String>,
}

impl RequestFilter {
    /// Active public requests, the listing shown to everyone.
    pub fn active_public() -> Self {
        Self {
            public_only: true,
            status: Some(RequestStatus::Active),
            ..Self::default()
        }
    }

    /// Requests created by `requester`.
    pub fn owned_by(requester: UserId) -> Self {
        Self {
            requester: Some(requester),
            ..Self::default()
        }
    }

    /// Lower-cased, non-empty search needle.
    pub fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_lowercase)
    }

    /// Evaluate the filter against one request.
    pub fn matches(&self, request: &BloodRequest) -> bool {
        if self
            .requester
            .as_ref()
            .is_some_and(|id| id != &request.requester)
        {
            return false;
        }
        if self.exclude_requester.as_ref() == Some(&request.requester) {
            return false;
        }
        if self.public_only && !request.is_public {
            return false;
        }
        if self.status.is_some_and(|status| status != request.status) {
            return false;
        }
        if self
            .blood_group
            .is_some_and(|group| group != request.blood_group_needed)
        {
            return false;
        }
        if !self.urgencies.is_empty() && !self.urgencies.contains(&request.urgency) {
            return false;
        }
        match self.search_needle() {
            Some(needle) => [
                &request.patient_name,
                &request.hospital_name,
                &request.description,
            ]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle)),
            None => true,
        }
    }
}

/// Storage for blood requests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BloodRequestRepository: Send + Sync {
    /// Store a new request.
    async fn insert(&self, request: &BloodRequest) -> Result<(), BloodRequestRepositoryError>;

    /// Fetch a request by identifier.
    async fn find(
        &self,
        id: &BloodRequestId,
    ) -> Result<Option<BloodRequest>, BloodRequestRepositoryError>;

    /// Persist changes to an existing request.
    async fn update(&self, request: &BloodRequest) -> Result<(), BloodRequestRepositoryError>;

    /// Remove a request and its responses. Returns whether it existed.
    async fn delete(&self, id: &BloodRequestId) -> Result<bool, BloodRequestRepositoryError>;

    /// Matching requests, newest first.
    async fn list(
        &self,
        filter: &RequestFilter,
        page: PageRequest,
    ) -> Result<Page<BloodRequest>, BloodRequestRepositoryError>;

    /// Number of matching requests.
    async fn count(&self, filter: &RequestFilter) -> Result<u64, BloodRequestRepositoryError>;

    /// Mark every active request whose needed-by time precedes `now` as
    /// expired, returning how many changed.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<u64, BloodRequestRepositoryError>;
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use chrono::Duration;
    use rstest::{fixture, rstest};

    #[fixture]
    fn request() -> BloodRequest {
        let now = Utc::now();
        BloodRequest {
            id: BloodRequestId::random(),
            requester: UserId::random(),
            patient_name: "Maya Thapa".into(),
            blood_group_needed: BloodGroup::ANegative,
            units_needed: 2,
            hospital_name: "Teaching Hospital".into(),
            hospital_address: "Maharajgunj".into(),
            urgency: Urgency::Critical,
            needed_by: now + Duration::days(3),
            description: "Dialysis patient".into(),
            contact_phone: "014412303".into(),
            status: RequestStatus::Active,
            is_public: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[rstest]
    fn default_filter_matches_everything(request: BloodRequest) {
        assert!(RequestFilter::default().matches(&request));
    }

    #[rstest]
    #[case("teaching", true)]
    #[case("DIALYSIS", true)]
    #[case("maya", true)]
    #[case("kidney", false)]
    fn search_covers_patient_hospital_and_description(
        request: BloodRequest,
        #[case] needle: &str,
        #[case] expected: bool,
    ) {
        let filter = RequestFilter {
            search: Some(needle.into()),
            ..RequestFilter::default()
        };
        assert_eq!(filter.matches(&request), expected);
    }

    #[rstest]
    fn private_requests_are_hidden_from_public_listing(mut request: BloodRequest) {
        request.is_public = false;
        assert!(!RequestFilter::active_public().matches(&request));
    }

    #[rstest]
    fn urgency_list_is_a_union(request: BloodRequest) {
        let urgent = RequestFilter {
            urgencies: Urgency::URGENT.to_vec(),
            ..RequestFilter::default()
        };
        assert!(urgent.matches(&request));

        let calm = RequestFilter {
            urgencies: vec![Urgency::Low],
            ..RequestFilter::default()
        };
        assert!(!calm.matches(&request));
    }

    #[rstest]
    fn ownership_filters(request: BloodRequest) {
        assert!(RequestFilter::owned_by(request.requester.clone()).matches(&request));
        assert!(!RequestFilter::owned_by(UserId::random()).matches(&request));
        let others = RequestFilter {
            exclude_requester: Some(request.requester.clone()),
            ..RequestFilter::default()
        };
        assert!(!others.matches(&request));
    }
}
