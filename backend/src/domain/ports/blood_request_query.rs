//! Driving port for blood request listings, detail pages and dashboards.

use async_trait::async_trait;

use crate::domain::{
    BloodGroup, BloodRequest, BloodRequestId, DonationResponse, Error, Page, ResponseOutcome,
    Urgency, User, UserId,
};

use super::ResponseRecord;

/// Optional narrowing of the public request listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSearch {
    pub blood_group: Option<BloodGroup>,
    pub urgency: Option<Urgency>,
    pub search: Option<String>,
}

/// Counters shown above the public listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub total_public: u64,
    pub active_public: u64,
    /// Active public requests with HIGH or CRITICAL urgency.
    pub urgent_public: u64,
    pub fulfilled_public: u64,
}

/// One page of active public requests plus listing statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct PublicRequests {
    pub requests: Page<BloodRequest>,
    pub stats: RequestStats,
}

/// A request as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDetail {
    pub request: BloodRequest,
    pub is_expired: bool,
    pub is_owner: bool,
    /// Whether the viewer may respond right now.
    pub can_respond: bool,
    /// The viewer's own response, if any.
    pub viewer_response: Option<DonationResponse>,
    /// Every response, only populated for the requester.
    pub responses: Vec<ResponseRecord>,
}

/// Landing page summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeSummary {
    pub recent_requests: Vec<BloodRequest>,
    pub verified_users: u64,
    pub active_requests: u64,
}

/// Personal overview for a logged-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub my_requests: Vec<BloodRequest>,
    /// Active public requests from others needing the user's blood group.
    pub available_requests: Vec<BloodRequest>,
    pub my_responses: Vec<ResponseRecord>,
    pub total_requests: u64,
    pub total_responses: u64,
    pub can_donate: bool,
    pub is_eligible: bool,
}

/// Optional narrowing of the response listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseSearch {
    pub blood_group: Option<BloodGroup>,
    pub urgency: Option<Urgency>,
    pub outcome: Option<ResponseOutcome>,
    pub search: Option<String>,
}

/// Response totals across all responses, independent of the search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub total: u64,
    pub accepted: u64,
    pub declined: u64,
    pub completed: u64,
}

/// One page of responses plus outcome counts.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseList {
    pub responses: Page<ResponseRecord>,
    pub counts: OutcomeCounts,
}

/// Domain use-case port for reading requests and responses.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BloodRequestQuery: Send + Sync {
    /// Load one request for `viewer` (`None` when anonymous).
    ///
    /// Private requests are reported as not found to everyone but their
    /// requester.
    async fn detail(
        &self,
        viewer: Option<UserId>,
        id: BloodRequestId,
    ) -> Result<RequestDetail, Error>;

    /// Active public requests, newest first.
    async fn list_public(&self, search: RequestSearch, page: u32)
    -> Result<PublicRequests, Error>;

    /// Requests created by `requester`, newest first.
    async fn list_own(&self, requester: &UserId, page: u32) -> Result<Page<BloodRequest>, Error>;

    /// Donors who could answer a request the caller owns.
    async fn compatible_donors(
        &self,
        requester: &UserId,
        id: BloodRequestId,
        page: u32,
    ) -> Result<Page<User>, Error>;

    /// Landing page summary.
    async fn home(&self) -> Result<HomeSummary, Error>;

    /// Personal overview for `user_id`.
    async fn dashboard(&self, user_id: &UserId) -> Result<Dashboard, Error>;

    /// All responses, newest first, with outcome counts.
    async fn list_responses(&self, search: ResponseSearch, page: u32)
    -> Result<ResponseList, Error>;

    /// Responses written by `donor`, newest first.
    async fn list_own_responses(
        &self,
        donor: &UserId,
        page: u32,
    ) -> Result<Page<ResponseRecord>, Error>;
}
