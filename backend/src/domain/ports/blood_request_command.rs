//! Driving port for blood request and response mutations.

use async_trait::async_trait;

use crate::domain::{
    BloodRequest, BloodRequestId, BloodRequestInput, DonationResponse, Error, RequestStatus,
    ResponseId, ResponseReply, UserId,
};

/// Domain use-case port for changing requests and responding to them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BloodRequestCommand: Send + Sync {
    /// Open a new request owned by `requester`.
    async fn create(
        &self,
        requester: &UserId,
        input: BloodRequestInput,
    ) -> Result<BloodRequest, Error>;

    /// Replace the editable fields of a request the caller owns.
    async fn update(
        &self,
        requester: &UserId,
        id: BloodRequestId,
        input: BloodRequestInput,
    ) -> Result<BloodRequest, Error>;

    /// Cancel, fulfil or reopen a request the caller owns.
    async fn change_status(
        &self,
        requester: &UserId,
        id: BloodRequestId,
        status: RequestStatus,
    ) -> Result<BloodRequest, Error>;

    /// Delete a request the caller owns, together with its responses.
    async fn delete(&self, requester: &UserId, id: BloodRequestId) -> Result<(), Error>;

    /// Record `donor`'s reply to a request.
    async fn respond(
        &self,
        donor: &UserId,
        id: BloodRequestId,
        reply: ResponseReply,
    ) -> Result<DonationResponse, Error>;

    /// Confirm that an accepted response resulted in a donation.
    ///
    /// Returns the request's status afterwards.
    async fn complete_response(
        &self,
        requester: &UserId,
        response_id: ResponseId,
    ) -> Result<RequestStatus, Error>;

    /// Expire every overdue active request; returns how many changed.
    async fn expire_overdue(&self) -> Result<u64, Error>;
}
