//! Port for donation response persistence.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    BloodGroup, BloodRequest, BloodRequestId, DonationResponse, Page, PageRequest, RequestStatus,
    ResponseId, ResponseOutcome, Urgency, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by response repository adapters.
    pub enum ResponseRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "response repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "response repository query failed: {message}",
        /// The donor already answered this request.
        DuplicateResponse { request_id: String, donor: String } =>
            "donor {donor} already responded to request {request_id}",
        /// A row the operation depends on disappeared.
        Missing { message: String } => "response repository row missing: {message}",
        /// The response was no longer accepted when the donation was recorded.
        NotAccepted { response_id: String } =>
            "response {response_id} is no longer awaiting completion",
    }
}

/// A response joined with its request and the donor's name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRecord {
    pub response: DonationResponse,
    pub request: BloodRequest,
    pub donor_name: String,
}

/// Selection criteria for response listings and counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseFilter {
    pub donor: Option<UserId>,
    pub request_id: Option<BloodRequestId>,
    pub blood_group: Option<BloodGroup>,
    pub urgency: Option<Urgency>,
    pub outcome: Option<ResponseOutcome>,
    /// Case-insensitive substring of donor name, patient name or hospital.
    pub search: Option<String>,
}

impl ResponseFilter {
    /// Responses written by `donor`.
    pub fn by_donor(donor: UserId) -> Self {
        Self {
            donor: Some(donor),
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

    /// Evaluate the filter against one joined record.
    pub fn matches(&self, record: &ResponseRecord) -> bool {
        let ResponseRecord {
            response,
            request,
            donor_name,
        } = record;
        if self.donor.as_ref().is_some_and(|id| id != &response.donor) {
            return false;
        }
        if self.request_id.is_some_and(|id| id != response.request_id) {
            return false;
        }
        if self
            .blood_group
            .is_some_and(|group| group != request.blood_group_needed)
        {
            return false;
        }
        if self.urgency.is_some_and(|urgency| urgency != request.urgency) {
            return false;
        }
        if self.outcome.is_some_and(|outcome| outcome != response.outcome) {
            return false;
        }
        match self.search_needle() {
            Some(needle) => [donor_name, &request.patient_name, &request.hospital_name]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle)),
            None => true,
        }
    }
}

/// A confirmed donation, applied atomically by [`ResponseRepository::record_donation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DonationCompletion {
    pub response_id: ResponseId,
    pub request_id: BloodRequestId,
    pub donor: UserId,
    pub requester: UserId,
    pub units_needed: u32,
    pub donated_on: NaiveDate,
    pub completed_at: DateTime<Utc>,
}

impl DonationCompletion {
    /// Whether `completed` donations satisfy the request.
    pub fn fulfils(&self, completed: u64) -> bool {
        completed >= u64::from(self.units_needed)
    }
}

/// Storage for donation responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResponseRepository: Send + Sync {
    /// Store a new response.
    ///
    /// Fails with [`ResponseRepositoryError::DuplicateResponse`] when the donor
    /// already responded to the request.
    async fn insert(&self, response: &DonationResponse) -> Result<(), ResponseRepositoryError>;

    /// Fetch a response by identifier.
    async fn find(&self, id: &ResponseId)
    -> Result<Option<DonationResponse>, ResponseRepositoryError>;

    /// The donor's response to a request, if any.
    async fn find_for_donor(
        &self,
        request_id: &BloodRequestId,
        donor: &UserId,
    ) -> Result<Option<DonationResponse>, ResponseRepositoryError>;

    /// Matching responses, newest first.
    async fn list(
        &self,
        filter: &ResponseFilter,
        page: PageRequest,
    ) -> Result<Page<ResponseRecord>, ResponseRepositoryError>;

    /// Number of matching responses.
    async fn count(&self, filter: &ResponseFilter) -> Result<u64, ResponseRepositoryError>;

    /// Apply a completed donation in one transaction.
    ///
    /// Only an `ACCEPTED` response is completed; any other outcome at write
    /// time yields [`ResponseRepositoryError::NotAccepted`] and changes
    /// nothing. Marks the response completed, stamps the donor's last donation date,
    /// bumps the donor's donation count and the requester's fulfilled count,
    /// and marks the request fulfilled when [`DonationCompletion::fulfils`]
    /// holds for its completed responses. Returns the request's status
    /// afterwards.
    async fn record_donation(
        &self,
        completion: &DonationCompletion,
    ) -> Result<RequestStatus, ResponseRepositoryError>;
}
