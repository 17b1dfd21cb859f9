//! Blood request API handlers.
//!
//! ```text
//! GET /api/v1/blood-requests?bloodGroup=O%2B&urgency=HIGH&search=civil&page=1
//! POST /api/v1/blood-requests {"patientName":"...", ...}
//! GET|PUT|DELETE /api/v1/blood-requests/{id}
//! POST /api/v1/blood-requests/{id}/status {"status":"CANCELLED"}
//! POST /api/v1/blood-requests/{id}/responses {"outcome":"ACCEPTED", ...}
//! GET /api/v1/blood-requests/{id}/donors?page=1
//! GET /api/v1/my/blood-requests?page=1
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{PublicRequests, RequestDetail, RequestSearch, RequestStats};
use crate::domain::{BloodRequestInput, Error, RequestStatus, ResponseReply, Urgency};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{
    BloodRequestResponse, DonationResponseResponse, DonorResponse, PageResponse,
    ResponseRecordResponse,
};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, PageQuery, parse_choice, parse_optional_choice, parse_request_id,
    parse_rfc3339_timestamp, require,
};

/// Body for creating or editing a request.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct BloodRequestPayload {
    pub patient_name: String,
    /// One of `A+ A- B+ B- AB+ AB- O+ O-`.
    pub blood_group_needed: Option<String>,
    /// Between 1 and 10.
    pub units_needed: Option<u32>,
    pub hospital_name: String,
    pub hospital_address: String,
    /// `LOW`, `MEDIUM`, `HIGH` or `CRITICAL`; defaults to `MEDIUM`.
    pub urgency: Option<String>,
    /// RFC 3339 timestamp in the future.
    pub needed_by: Option<String>,
    pub description: String,
    pub contact_phone: String,
    /// Defaults to true.
    pub is_public: Option<bool>,
}

impl TryFrom<BloodRequestPayload> for BloodRequestInput {
    type Error = Error;

    fn try_from(value: BloodRequestPayload) -> Result<Self, Self::Error> {
        let blood_group_field = FieldName::new("bloodGroupNeeded");
        let blood_group_needed = parse_choice(
            &require(value.blood_group_needed, blood_group_field)?,
            blood_group_field,
        )?;
        let units_needed = require(value.units_needed, FieldName::new("unitsNeeded"))?;
        let needed_by_field = FieldName::new("neededBy");
        let needed_by =
            parse_rfc3339_timestamp(&require(value.needed_by, needed_by_field)?, needed_by_field)?;
        let urgency = parse_optional_choice(value.urgency.as_deref(), FieldName::new("urgency"))?
            .unwrap_or(Urgency::Medium);
        Ok(Self {
            patient_name: value.patient_name,
            blood_group_needed,
            units_needed,
            hospital_name: value.hospital_name,
            hospital_address: value.hospital_address,
            urgency,
            needed_by,
            description: value.description,
            contact_phone: value.contact_phone,
            is_public: value.is_public.unwrap_or(true),
        })
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeRequest {
    /// `ACTIVE`, `FULFILLED` or `CANCELLED`.
    pub status: String,
}

/// A donor's reply to a request.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplyRequest {
    /// `ACCEPTED` or `DECLINED`.
    pub outcome: Option<String>,
    pub message: String,
    pub donor_phone: String,
    pub preferred_contact_time: String,
}

impl TryFrom<ReplyRequest> for ResponseReply {
    type Error = Error;

    fn try_from(value: ReplyRequest) -> Result<Self, Self::Error> {
        let field = FieldName::new("outcome");
        let outcome = parse_choice(&require(value.outcome, field)?, field)?;
        Ok(Self {
            outcome,
            message: value.message,
            donor_phone: value.donor_phone,
            preferred_contact_time: value.preferred_contact_time,
        })
    }
}

/// Filters for the public request listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct RequestListQuery {
    pub blood_group: Option<String>,
    pub urgency: Option<String>,
    /// Case-insensitive match on patient name, hospital name or description.
    pub search: Option<String>,
    pub page: Option<u32>,
}

impl RequestListQuery {
    fn into_search(self) -> Result<(RequestSearch, u32), Error> {
        let page = PageQuery { page: self.page }.page();
        let search = RequestSearch {
            blood_group: parse_optional_choice(
                self.blood_group.as_deref(),
                FieldName::new("bloodGroup"),
            )?,
            urgency: parse_optional_choice(self.urgency.as_deref(), FieldName::new("urgency"))?,
            search: self.search.filter(|value| !value.trim().is_empty()),
        };
        Ok((search, page))
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestStatsResponse {
    pub total_public: u64,
    pub active_public: u64,
    /// Active public requests with `HIGH` or `CRITICAL` urgency.
    pub urgent_public: u64,
    pub fulfilled_public: u64,
}

impl From<RequestStats> for RequestStatsResponse {
    fn from(stats: RequestStats) -> Self {
        Self {
            total_public: stats.total_public,
            active_public: stats.active_public,
            urgent_public: stats.urgent_public,
            fulfilled_public: stats.fulfilled_public,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicRequestsResponse {
    pub requests: PageResponse<BloodRequestResponse>,
    pub stats: RequestStatsResponse,
}

impl From<PublicRequests> for PublicRequestsResponse {
    fn from(listing: PublicRequests) -> Self {
        Self {
            requests: PageResponse::from_page(listing.requests, BloodRequestResponse::from),
            stats: listing.stats.into(),
        }
    }
}

/// A request with the caller's relationship to it.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetailResponse {
    pub request: BloodRequestResponse,
    pub is_expired: bool,
    pub is_owner: bool,
    pub can_respond: bool,
    pub viewer_response: Option<DonationResponseResponse>,
    /// Every response; only populated for the requester.
    pub responses: Vec<ResponseRecordResponse>,
}

impl From<RequestDetail> for RequestDetailResponse {
    fn from(detail: RequestDetail) -> Self {
        Self {
            request: detail.request.into(),
            is_expired: detail.is_expired,
            is_owner: detail.is_owner,
            can_respond: detail.can_respond,
            viewer_response: detail.viewer_response.map(Into::into),
            responses: detail.responses.into_iter().map(Into::into).collect(),
        }
    }
}

/// Active public requests.
#[utoipa::path(
    get,
    path = "/api/v1/blood-requests",
    params(RequestListQuery),
    responses(
        (status = 200, description = "Public requests", body = PublicRequestsResponse),
        (status = 400, description = "Invalid request", body = Error)
    ),
    tags = ["blood-requests"],
    operation_id = "listBloodRequests",
    security([])
)]
#[get("/blood-requests")]
pub async fn list_requests(
    state: web::Data<HttpState>,
    query: web::Query<RequestListQuery>,
) -> ApiResult<web::Json<PublicRequestsResponse>> {
    let (search, page) = query.into_inner().into_search()?;
    let listing = state.requests_query.list_public(search, page).await?;
    Ok(web::Json(listing.into()))
}

/// Post a new request.
#[utoipa::path(
    post,
    path = "/api/v1/blood-requests",
    request_body = BloodRequestPayload,
    responses(
        (status = 201, description = "Created request", body = BloodRequestResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["blood-requests"],
    operation_id = "createBloodRequest"
)]
#[post("/blood-requests")]
pub async fn create_request(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<BloodRequestPayload>,
) -> ApiResult<HttpResponse> {
    let requester = session.require_user_id()?;
    let input = BloodRequestInput::try_from(payload.into_inner())?;
    let request = state.requests.create(&requester, input).await?;
    Ok(HttpResponse::Created().json(BloodRequestResponse::from(request)))
}

/// Request detail; private requests are only visible to their owner.
#[utoipa::path(
    get,
    path = "/api/v1/blood-requests/{id}",
    params(("id" = String, Path, description = "Request identifier")),
    responses(
        (status = 200, description = "Request detail", body = RequestDetailResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["blood-requests"],
    operation_id = "getBloodRequest",
    security([])
)]
#[get("/blood-requests/{id}")]
pub async fn request_detail(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<RequestDetailResponse>> {
    let id = parse_request_id(&path.into_inner())?;
    let viewer = session.user_id()?;
    let detail = state.requests_query.detail(viewer, id).await?;
    Ok(web::Json(detail.into()))
}

/// Edit a request the caller owns.
#[utoipa::path(
    put,
    path = "/api/v1/blood-requests/{id}",
    params(("id" = String, Path, description = "Request identifier")),
    request_body = BloodRequestPayload,
    responses(
        (status = 200, description = "Updated request", body = BloodRequestResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["blood-requests"],
    operation_id = "updateBloodRequest"
)]
#[put("/blood-requests/{id}")]
pub async fn update_request(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<BloodRequestPayload>,
) -> ApiResult<web::Json<BloodRequestResponse>> {
    let requester = session.require_user_id()?;
    let id = parse_request_id(&path.into_inner())?;
    let input = BloodRequestInput::try_from(payload.into_inner())?;
    let request = state.requests.update(&requester, id, input).await?;
    Ok(web::Json(request.into()))
}

/// Delete a request the caller owns, together with its responses.
#[utoipa::path(
    delete,
    path = "/api/v1/blood-requests/{id}",
    params(("id" = String, Path, description = "Request identifier")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["blood-requests"],
    operation_id = "deleteBloodRequest"
)]
#[delete("/blood-requests/{id}")]
pub async fn delete_request(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let requester = session.require_user_id()?;
    let id = parse_request_id(&path.into_inner())?;
    state.requests.delete(&requester, id).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Cancel, fulfil or reopen a request.
#[utoipa::path(
    post,
    path = "/api/v1/blood-requests/{id}/status",
    params(("id" = String, Path, description = "Request identifier")),
    request_body = StatusChangeRequest,
    responses(
        (status = 200, description = "Updated request", body = BloodRequestResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["blood-requests"],
    operation_id = "changeBloodRequestStatus"
)]
#[post("/blood-requests/{id}/status")]
pub async fn change_status(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<StatusChangeRequest>,
) -> ApiResult<web::Json<BloodRequestResponse>> {
    let requester = session.require_user_id()?;
    let id = parse_request_id(&path.into_inner())?;
    let status: RequestStatus = parse_choice(&payload.status, FieldName::new("status"))?;
    let request = state.requests.change_status(&requester, id, status).await?;
    Ok(web::Json(request.into()))
}

/// Accept or decline a request as a donor.
#[utoipa::path(
    post,
    path = "/api/v1/blood-requests/{id}/responses",
    params(("id" = String, Path, description = "Request identifier")),
    request_body = ReplyRequest,
    responses(
        (status = 201, description = "Recorded response", body = DonationResponseResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Not allowed to respond", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 409, description = "Already responded", body = Error)
    ),
    tags = ["blood-requests"],
    operation_id = "respondToBloodRequest"
)]
#[post("/blood-requests/{id}/responses")]
pub async fn respond(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<ReplyRequest>,
) -> ApiResult<HttpResponse> {
    let donor = session.require_user_id()?;
    let id = parse_request_id(&path.into_inner())?;
    let reply = ResponseReply::try_from(payload.into_inner())?;
    let response = state.requests.respond(&donor, id, reply).await?;
    Ok(HttpResponse::Created().json(DonationResponseResponse::from(response)))
}

/// Donors compatible with a request; requester only.
#[utoipa::path(
    get,
    path = "/api/v1/blood-requests/{id}/donors",
    params(("id" = String, Path, description = "Request identifier"), PageQuery),
    responses(
        (status = 200, description = "Compatible donors", body = PageResponse<DonorResponse>),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["blood-requests"],
    operation_id = "listCompatibleDonors"
)]
#[get("/blood-requests/{id}/donors")]
pub async fn compatible_donors(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<PageResponse<DonorResponse>>> {
    let requester = session.require_user_id()?;
    let id = parse_request_id(&path.into_inner())?;
    let donors = state
        .requests_query
        .compatible_donors(&requester, id, query.page())
        .await?;
    Ok(web::Json(PageResponse::from_page(donors, DonorResponse::from)))
}

/// The caller's own requests, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/my/blood-requests",
    params(PageQuery),
    responses(
        (status = 200, description = "Own requests", body = PageResponse<BloodRequestResponse>),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["blood-requests"],
    operation_id = "listOwnBloodRequests"
)]
#[get("/my/blood-requests")]
pub async fn my_requests(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<PageResponse<BloodRequestResponse>>> {
    let requester = session.require_user_id()?;
    let requests = state.requests_query.list_own(&requester, query.page()).await?;
    Ok(web::Json(PageResponse::from_page(
        requests,
        BloodRequestResponse::from,
    )))
}

#[cfg(test)]
#[path = "blood_requests_tests.rs"]
mod tests;
