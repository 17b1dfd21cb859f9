//! Blood request domain service.
//!
//! Implements [`BloodRequestCommand`] and [`BloodRequestQuery`]. Every
//! eligibility decision goes through [`crate::domain::eligibility`].

use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use serde_json::json;
use tracing::{debug, info};

use crate::domain::account_service::map_user_error;
use crate::domain::eligibility::{self, DonorFilter};
use crate::domain::ports::{
    BloodRequestCommand, BloodRequestQuery, BloodRequestRepository, BloodRequestRepositoryError,
    Dashboard, DonationCompletion, HomeSummary, OutcomeCounts, PublicRequests, RequestDetail,
    RequestFilter, RequestSearch, RequestStats, ResponseFilter, ResponseList, ResponseRecord,
    ResponseRepository, ResponseRepositoryError, ResponseSearch, UserRepository,
};
use crate::domain::{
    BloodRequest, BloodRequestDraft, BloodRequestId, BloodRequestInput,
    BloodRequestValidationError, DonationResponse, Error, Page, PageRequest, RequestStatus,
    ResponseId, ResponseOutcome, ResponseReply, ResponseReplyError, Urgency, User, UserId,
};

/// Public listing and response listing page size.
pub const PUBLIC_PER_PAGE: u32 = 12;
/// Personal listing page size.
pub const OWN_PER_PAGE: u32 = 10;
/// Compatible donor page size.
pub const DONORS_PER_PAGE: u32 = 12;
/// Items per dashboard section.
pub const DASHBOARD_ITEMS: u32 = 5;
/// Recent requests on the landing page.
pub const HOME_ITEMS: u32 = 6;
/// Most responses shown to a requester on the detail page.
pub const DETAIL_RESPONSES_MAX: u32 = 200;

const CANNOT_RESPOND: &str = "You cannot respond to this blood request.";
const ALREADY_RESPONDED: &str = "You have already responded to this request.";

/// Blood request service implementing the request driving ports.
#[derive(Clone)]
pub struct BloodRequestService<U, R, S> {
    users: Arc<U>,
    requests: Arc<R>,
    responses: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<U, R, S> BloodRequestService<U, R, S> {
    /// Create a new service with the given repositories.
    pub fn new(users: Arc<U>, requests: Arc<R>, responses: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            users,
            requests,
            responses,
            clock,
        }
    }
}

fn map_request_error(error: BloodRequestRepositoryError) -> Error {
    debug!(kind = error.kind(), %error, "blood request repository call failed");
    match error {
        BloodRequestRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("blood request repository unavailable: {message}"))
        }
        BloodRequestRepositoryError::Query { message } => {
            Error::internal(format!("blood request repository error: {message}"))
        }
    }
}

fn map_response_error(error: ResponseRepositoryError) -> Error {
    debug!(kind = error.kind(), %error, "response repository call failed");
    match error {
        ResponseRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("response repository unavailable: {message}"))
        }
        ResponseRepositoryError::Query { message } => {
            Error::internal(format!("response repository error: {message}"))
        }
        ResponseRepositoryError::DuplicateResponse { .. } => Error::conflict(ALREADY_RESPONDED),
        ResponseRepositoryError::Missing { message } => Error::not_found(message),
        ResponseRepositoryError::NotAccepted { .. } => response_not_accepted(),
    }
}

fn response_not_accepted() -> Error {
    Error::conflict("only accepted responses can be marked completed").with_details(json!({
        "field": "response",
        "code": "not_accepted",
    }))
}

fn draft_error(error: BloodRequestValidationError) -> Error {
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": error.field(),
        "code": error.code(),
    }))
}

fn reply_error(error: ResponseReplyError) -> Error {
    let (field, code) = match &error {
        ResponseReplyError::OutcomeNotAllowed => ("response", "not_allowed"),
        ResponseReplyError::MissingPhone => ("donorPhone", "required"),
        ResponseReplyError::TooLong { field } => (*field, "too_long"),
    };
    Error::invalid_request(error.to_string()).with_details(json!({
        "field": field,
        "code": code,
    }))
}

fn request_not_found() -> Error {
    Error::not_found("blood request not found")
}

impl<U, R, S> BloodRequestService<U, R, S>
where
    U: UserRepository,
    R: BloodRequestRepository,
    S: ResponseRepository,
{
    async fn find_request(&self, id: &BloodRequestId) -> Result<BloodRequest, Error> {
        self.requests
            .find(id)
            .await
            .map_err(map_request_error)?
            .ok_or_else(request_not_found)
    }

    /// Load a request owned by `requester`; anyone else sees "not found".
    async fn find_owned(
        &self,
        requester: &UserId,
        id: &BloodRequestId,
    ) -> Result<BloodRequest, Error> {
        let request = self.find_request(id).await?;
        if !request.is_owned_by(requester) {
            return Err(request_not_found());
        }
        Ok(request)
    }

    async fn find_user(&self, id: &UserId) -> Result<Option<User>, Error> {
        self.users.find_by_id(id).await.map_err(map_user_error)
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
        page: PageRequest,
    ) -> Result<Page<BloodRequest>, Error> {
        self.requests
            .list(filter, page)
            .await
            .map_err(map_request_error)
    }

    async fn count_requests(&self, filter: &RequestFilter) -> Result<u64, Error> {
        self.requests.count(filter).await.map_err(map_request_error)
    }

    async fn list_records(
        &self,
        filter: &ResponseFilter,
        page: PageRequest,
    ) -> Result<Page<ResponseRecord>, Error> {
        self.responses
            .list(filter, page)
            .await
            .map_err(map_response_error)
    }

    async fn count_responses(&self, filter: &ResponseFilter) -> Result<u64, Error> {
        self.responses
            .count(filter)
            .await
            .map_err(map_response_error)
    }

    async fn request_stats(&self) -> Result<RequestStats, Error> {
        let public = RequestFilter {
            public_only: true,
            ..RequestFilter::default()
        };
        let urgent = RequestFilter {
            urgencies: Urgency::URGENT.to_vec(),
            ..RequestFilter::active_public()
        };
        let fulfilled = RequestFilter {
            status: Some(RequestStatus::Fulfilled),
            ..public.clone()
        };
        Ok(RequestStats {
            total_public: self.count_requests(&public).await?,
            active_public: self.count_requests(&RequestFilter::active_public()).await?,
            urgent_public: self.count_requests(&urgent).await?,
            fulfilled_public: self.count_requests(&fulfilled).await?,
        })
    }

    async fn outcome_counts(&self) -> Result<OutcomeCounts, Error> {
        let with_outcome = |outcome| ResponseFilter {
            outcome: Some(outcome),
            ..ResponseFilter::default()
        };
        Ok(OutcomeCounts {
            total: self.count_responses(&ResponseFilter::default()).await?,
            accepted: self
                .count_responses(&with_outcome(ResponseOutcome::Accepted))
                .await?,
            declined: self
                .count_responses(&with_outcome(ResponseOutcome::Declined))
                .await?,
            completed: self
                .count_responses(&with_outcome(ResponseOutcome::Completed))
                .await?,
        })
    }
}

#[async_trait]
impl<U, R, S> BloodRequestCommand for BloodRequestService<U, R, S>
where
    U: UserRepository,
    R: BloodRequestRepository,
    S: ResponseRepository,
{
    async fn create(
        &self,
        requester: &UserId,
        input: BloodRequestInput,
    ) -> Result<BloodRequest, Error> {
        let now = self.clock.utc();
        let draft = BloodRequestDraft::validate(input, now).map_err(draft_error)?;
        let request = BloodRequest::open(requester.clone(), draft, now);
        self.requests
            .insert(&request)
            .await
            .map_err(map_request_error)?;
        info!(
            request_id = %request.id,
            requester = %requester,
            blood_group = %request.blood_group_needed,
            urgency = %request.urgency,
            "blood request created"
        );
        Ok(request)
    }

    async fn update(
        &self,
        requester: &UserId,
        id: BloodRequestId,
        input: BloodRequestInput,
    ) -> Result<BloodRequest, Error> {
        let now = self.clock.utc();
        let draft = BloodRequestDraft::validate(input, now).map_err(draft_error)?;
        let mut request = self.find_owned(requester, &id).await?;
        request.apply(draft, now);
        self.requests
            .update(&request)
            .await
            .map_err(map_request_error)?;
        Ok(request)
    }

    async fn change_status(
        &self,
        requester: &UserId,
        id: BloodRequestId,
        status: RequestStatus,
    ) -> Result<BloodRequest, Error> {
        let now = self.clock.utc();
        let mut request = self.find_owned(requester, &id).await?;
        match status {
            RequestStatus::Expired => {
                return Err(
                    Error::invalid_request("requests expire automatically").with_details(json!({
                        "field": "status",
                        "code": "not_allowed",
                    })),
                );
            }
            RequestStatus::Active if request.needed_by <= now => {
                return Err(Error::invalid_request(
                    "the needed by date must be in the future to reopen a request",
                )
                .with_details(json!({
                    "field": "neededBy",
                    "code": "not_in_future",
                })));
            }
            _ => {}
        }
        let previous = request.status;
        request.status = status;
        request.updated_at = now;
        self.requests
            .update(&request)
            .await
            .map_err(map_request_error)?;
        info!(request_id = %request.id, from = %previous, to = %status, "blood request status changed");
        Ok(request)
    }

    async fn delete(&self, requester: &UserId, id: BloodRequestId) -> Result<(), Error> {
        let request = self.find_owned(requester, &id).await?;
        let removed = self
            .requests
            .delete(&request.id)
            .await
            .map_err(map_request_error)?;
        if !removed {
            return Err(request_not_found());
        }
        info!(request_id = %request.id, "blood request deleted");
        Ok(())
    }

    async fn respond(
        &self,
        donor: &UserId,
        id: BloodRequestId,
        reply: ResponseReply,
    ) -> Result<DonationResponse, Error> {
        let now = self.clock.utc();
        let request = self.find_request(&id).await?;
        let donor_user = self.find_user(donor).await?;
        if !eligibility::can_accept(&request, donor_user.as_ref(), now) {
            return Err(Error::forbidden(CANNOT_RESPOND));
        }

        let existing = self
            .responses
            .find_for_donor(&request.id, donor)
            .await
            .map_err(map_response_error)?;
        if existing.is_some() {
            return Err(Error::conflict(ALREADY_RESPONDED));
        }

        let reply = reply.validate().map_err(reply_error)?;
        let response = DonationResponse::new(request.id, donor.clone(), reply, now);
        self.responses
            .insert(&response)
            .await
            .map_err(map_response_error)?;
        info!(
            request_id = %request.id,
            response_id = %response.id,
            outcome = %response.outcome,
            "donor responded to blood request"
        );
        Ok(response)
    }

    async fn complete_response(
        &self,
        requester: &UserId,
        response_id: ResponseId,
    ) -> Result<RequestStatus, Error> {
        let response = self
            .responses
            .find(&response_id)
            .await
            .map_err(map_response_error)?
            .ok_or_else(|| Error::not_found("response not found"))?;
        let request = self.find_owned(requester, &response.request_id).await?;
        if response.outcome != ResponseOutcome::Accepted {
            return Err(response_not_accepted());
        }

        let now = self.clock.utc();
        let completion = DonationCompletion {
            response_id,
            request_id: request.id,
            donor: response.donor.clone(),
            requester: request.requester.clone(),
            units_needed: request.units_needed,
            donated_on: now.date_naive(),
            completed_at: now,
        };
        let status = self
            .responses
            .record_donation(&completion)
            .await
            .map_err(map_response_error)?;
        info!(
            request_id = %request.id,
            response_id = %response_id,
            status = %status,
            "donation recorded"
        );
        Ok(status)
    }

    async fn expire_overdue(&self) -> Result<u64, Error> {
        let expired = self
            .requests
            .expire_overdue(self.clock.utc())
            .await
            .map_err(map_request_error)?;
        if expired > 0 {
            info!(expired, "expired overdue blood requests");
        }
        Ok(expired)
    }
}

#[async_trait]
impl<U, R, S> BloodRequestQuery for BloodRequestService<U, R, S>
where
    U: UserRepository,
    R: BloodRequestRepository,
    S: ResponseRepository,
{
    async fn detail(
        &self,
        viewer: Option<UserId>,
        id: BloodRequestId,
    ) -> Result<RequestDetail, Error> {
        let now = self.clock.utc();
        let request = self.find_request(&id).await?;
        let is_owner = viewer
            .as_ref()
            .is_some_and(|viewer| request.is_owned_by(viewer));
        if !request.is_public && !is_owner {
            return Err(request_not_found());
        }

        let (can_respond, viewer_response) = match &viewer {
            Some(viewer) => {
                let user = self.find_user(viewer).await?;
                let response = self
                    .responses
                    .find_for_donor(&request.id, viewer)
                    .await
                    .map_err(map_response_error)?;
                (
                    eligibility::can_accept(&request, user.as_ref(), now),
                    response,
                )
            }
            None => (false, None),
        };

        let responses = if is_owner {
            let filter = ResponseFilter {
                request_id: Some(request.id),
                ..ResponseFilter::default()
            };
            self.list_records(&filter, PageRequest::first(DETAIL_RESPONSES_MAX))
                .await?
                .items
        } else {
            Vec::new()
        };

        Ok(RequestDetail {
            is_expired: eligibility::is_expired(&request, now),
            request,
            is_owner,
            can_respond,
            viewer_response,
            responses,
        })
    }

    async fn list_public(
        &self,
        search: RequestSearch,
        page: u32,
    ) -> Result<PublicRequests, Error> {
        let filter = RequestFilter {
            blood_group: search.blood_group,
            urgencies: search.urgency.into_iter().collect(),
            search: search.search,
            ..RequestFilter::active_public()
        };
        let requests = self
            .list_requests(&filter, PageRequest::new(page, PUBLIC_PER_PAGE))
            .await?;
        let stats = self.request_stats().await?;
        Ok(PublicRequests { requests, stats })
    }

    async fn list_own(&self, requester: &UserId, page: u32) -> Result<Page<BloodRequest>, Error> {
        self.list_requests(
            &RequestFilter::owned_by(requester.clone()),
            PageRequest::new(page, OWN_PER_PAGE),
        )
        .await
    }

    async fn compatible_donors(
        &self,
        requester: &UserId,
        id: BloodRequestId,
        page: u32,
    ) -> Result<Page<User>, Error> {
        let request = self.find_owned(requester, &id).await?;
        self.users
            .search_donors(
                &DonorFilter::compatible_with(&request),
                PageRequest::new(page, DONORS_PER_PAGE),
            )
            .await
            .map_err(map_user_error)
    }

    async fn home(&self) -> Result<HomeSummary, Error> {
        let active = RequestFilter::active_public();
        let recent_requests = self
            .list_requests(&active, PageRequest::first(HOME_ITEMS))
            .await?
            .items;
        let verified_users = self
            .users
            .count_verified()
            .await
            .map_err(map_user_error)?;
        let active_requests = self
            .count_requests(&RequestFilter {
                status: Some(RequestStatus::Active),
                ..RequestFilter::default()
            })
            .await?;
        Ok(HomeSummary {
            recent_requests,
            verified_users,
            active_requests,
        })
    }

    async fn dashboard(&self, user_id: &UserId) -> Result<Dashboard, Error> {
        let user = self
            .find_user(user_id)
            .await?
            .ok_or_else(|| Error::not_found("user not found"))?;
        let today = self.clock.utc().date_naive();
        let section = PageRequest::first(DASHBOARD_ITEMS);

        let own = RequestFilter::owned_by(user.id.clone());
        let my_requests = self.list_requests(&own, section).await?.items;
        let total_requests = self.count_requests(&own).await?;

        let available_requests = match user.blood_group {
            Some(group) => {
                let filter = RequestFilter {
                    exclude_requester: Some(user.id.clone()),
                    blood_group: Some(group),
                    ..RequestFilter::active_public()
                };
                self.list_requests(&filter, section).await?.items
            }
            None => Vec::new(),
        };

        let mine = ResponseFilter::by_donor(user.id.clone());
        let my_responses = self.list_records(&mine, section).await?.items;
        let total_responses = self.count_responses(&mine).await?;

        Ok(Dashboard {
            my_requests,
            available_requests,
            my_responses,
            total_requests,
            total_responses,
            can_donate: eligibility::can_donate(&user, today),
            is_eligible: eligibility::is_eligible_donor(&user, today),
        })
    }

    async fn list_responses(
        &self,
        search: ResponseSearch,
        page: u32,
    ) -> Result<ResponseList, Error> {
        let filter = ResponseFilter {
            blood_group: search.blood_group,
            urgency: search.urgency,
            outcome: search.outcome,
            search: search.search,
            ..ResponseFilter::default()
        };
        let responses = self
            .list_records(&filter, PageRequest::new(page, PUBLIC_PER_PAGE))
            .await?;
        let counts = self.outcome_counts().await?;
        Ok(ResponseList { responses, counts })
    }

    async fn list_own_responses(
        &self,
        donor: &UserId,
        page: u32,
    ) -> Result<Page<ResponseRecord>, Error> {
        self.list_records(
            &ResponseFilter::by_donor(donor.clone()),
            PageRequest::new(page, OWN_PER_PAGE),
        )
        .await
    }
}

#[cfg(test)]
#[path = "blood_request_service_tests.rs"]
mod tests;
