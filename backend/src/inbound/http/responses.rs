//! Donation response API handlers.
//!
//! ```text
//! GET /api/v1/responses?bloodGroup=B%2B&urgency=LOW&outcome=ACCEPTED&search=sita&page=1
//! GET /api/v1/my/responses?page=1
//! POST /api/v1/responses/{id}/complete
//! ```

use actix_web::{get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{OutcomeCounts, ResponseList, ResponseSearch};
use crate::domain::{Error, RequestStatus};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{PageResponse, ResponseRecordResponse};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, PageQuery, parse_optional_choice, parse_response_id,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ResponseListQuery {
    /// Blood group needed by the request.
    pub blood_group: Option<String>,
    /// Urgency of the request.
    pub urgency: Option<String>,
    /// `ACCEPTED`, `DECLINED` or `COMPLETED`.
    pub outcome: Option<String>,
    /// Case-insensitive match on donor name, patient name or hospital.
    pub search: Option<String>,
    pub page: Option<u32>,
}

impl ResponseListQuery {
    fn into_search(self) -> Result<(ResponseSearch, u32), Error> {
        let page = PageQuery { page: self.page }.page();
        let search = ResponseSearch {
            blood_group: parse_optional_choice(
                self.blood_group.as_deref(),
                FieldName::new("bloodGroup"),
            )?,
            urgency: parse_optional_choice(self.urgency.as_deref(), FieldName::new("urgency"))?,
            outcome: parse_optional_choice(self.outcome.as_deref(), FieldName::new("outcome"))?,
            search: self.search.filter(|value| !value.trim().is_empty()),
        };
        Ok((search, page))
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeCountsResponse {
    pub total: u64,
    pub accepted: u64,
    pub declined: u64,
    pub completed: u64,
}

impl From<OutcomeCounts> for OutcomeCountsResponse {
    fn from(counts: OutcomeCounts) -> Self {
        Self {
            total: counts.total,
            accepted: counts.accepted,
            declined: counts.declined,
            completed: counts.completed,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResponseListResponse {
    pub responses: PageResponse<ResponseRecordResponse>,
    /// Totals across every response, regardless of filters.
    pub counts: OutcomeCountsResponse,
}

impl From<ResponseList> for ResponseListResponse {
    fn from(list: ResponseList) -> Self {
        Self {
            responses: PageResponse::from_page(list.responses, ResponseRecordResponse::from),
            counts: list.counts.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    /// Status of the request after the donation was recorded.
    pub request_status: RequestStatus,
}

/// Every response, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/responses",
    params(ResponseListQuery),
    responses(
        (status = 200, description = "Responses", body = ResponseListResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["responses"],
    operation_id = "listResponses"
)]
#[get("/responses")]
pub async fn list_responses(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<ResponseListQuery>,
) -> ApiResult<web::Json<ResponseListResponse>> {
    session.require_user_id()?;
    let (search, page) = query.into_inner().into_search()?;
    let list = state.requests_query.list_responses(search, page).await?;
    Ok(web::Json(list.into()))
}

/// The caller's own responses, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/my/responses",
    params(PageQuery),
    responses(
        (status = 200, description = "Own responses", body = PageResponse<ResponseRecordResponse>),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["responses"],
    operation_id = "listOwnResponses"
)]
#[get("/my/responses")]
pub async fn my_responses(
    state: web::Data<HttpState>,
    session: SessionContext,
    query: web::Query<PageQuery>,
) -> ApiResult<web::Json<PageResponse<ResponseRecordResponse>>> {
    let donor = session.require_user_id()?;
    let records = state
        .requests_query
        .list_own_responses(&donor, query.page())
        .await?;
    Ok(web::Json(PageResponse::from_page(
        records,
        ResponseRecordResponse::from,
    )))
}

/// Record that an accepted donor has donated.
///
/// Only the owner of the request may complete its responses.
#[utoipa::path(
    post,
    path = "/api/v1/responses/{id}/complete",
    params(("id" = String, Path, description = "Response identifier")),
    responses(
        (status = 200, description = "Donation recorded", body = CompletionResponse),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 409, description = "Response is not accepted", body = Error)
    ),
    tags = ["responses"],
    operation_id = "completeResponse"
)]
#[post("/responses/{id}/complete")]
pub async fn complete_response(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<CompletionResponse>> {
    let requester = session.require_user_id()?;
    let response_id = parse_response_id(&path.into_inner())?;
    let request_status = state
        .requests
        .complete_response(&requester, response_id)
        .await?;
    Ok(web::Json(CompletionResponse { request_status }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{fixture_now, request_by};
    use crate::domain::ports::ResponseRecord;
    use crate::domain::{
        DonationResponse, Page, PageRequest, ResponseId, ResponseOutcome, ResponseReply, UserId,
    };
    use crate::inbound::http::test_utils::{MockPorts, session_cookie_for, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::Value;

    fn routes(cfg: &mut web::ServiceConfig) {
        cfg.service(list_responses)
            .service(my_responses)
            .service(complete_response);
    }

    fn record(outcome: ResponseOutcome) -> ResponseRecord {
        let request = request_by(&UserId::random());
        let reply = ResponseReply {
            outcome,
            message: "Available after 5pm".into(),
            donor_phone: "9811111111".into(),
            preferred_contact_time: "Evening".into(),
        };
        ResponseRecord {
            response: DonationResponse::new(request.id, UserId::random(), reply, fixture_now()),
            request,
            donor_name: "Sita Sharma".into(),
        }
    }

    #[actix_web::test]
    async fn listing_requires_a_session() {
        let app = actix_test::init_service(test_app(MockPorts::default(), routes)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/responses")
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn listing_parses_outcome_filter_and_returns_counts() {
        let user = UserId::random();
        let mut ports = MockPorts::default();
        ports
            .requests_query
            .expect_list_responses()
            .withf(|search, page| {
                search.outcome == Some(ResponseOutcome::Declined)
                    && search.search.is_none()
                    && *page == 1
            })
            .return_once(|_, _| {
                Ok(ResponseList {
                    responses: Page::new(
                        vec![record(ResponseOutcome::Declined)],
                        PageRequest::first(12),
                        1,
                    ),
                    counts: OutcomeCounts {
                        total: 3,
                        accepted: 1,
                        declined: 1,
                        completed: 1,
                    },
                })
            });
        let app = actix_test::init_service(test_app(ports, routes)).await;
        let cookie = session_cookie_for(&app, &user).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/responses?outcome=DECLINED&search=%20")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["counts"]["total"], 3);
        assert_eq!(
            body["responses"]["items"][0]["response"]["outcome"],
            "DECLINED"
        );
        assert_eq!(body["responses"]["items"][0]["donorName"], "Sita Sharma");
    }

    #[actix_web::test]
    async fn own_responses_are_scoped_to_the_caller() {
        let donor = UserId::random();
        let expected = donor.clone();
        let mut ports = MockPorts::default();
        ports
            .requests_query
            .expect_list_own_responses()
            .withf(move |candidate, page| candidate == &expected && *page == 3)
            .return_once(|_, _| Ok(Page::new(Vec::new(), PageRequest::new(3, 10), 20)));
        let app = actix_test::init_service(test_app(ports, routes)).await;
        let cookie = session_cookie_for(&app, &donor).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/my/responses?page=3")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["totalPages"], 2);
        assert_eq!(body["items"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn completing_reports_the_request_status() {
        let requester = UserId::random();
        let response_id = ResponseId::random();
        let mut ports = MockPorts::default();
        ports
            .requests
            .expect_complete_response()
            .withf(move |_, candidate| *candidate == response_id)
            .return_once(|_, _| Ok(RequestStatus::Fulfilled));
        let app = actix_test::init_service(test_app(ports, routes)).await;
        let cookie = session_cookie_for(&app, &requester).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/responses/{response_id}/complete"))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["requestStatus"], "FULFILLED");
    }

    #[actix_web::test]
    async fn completing_a_declined_response_conflicts() {
        let requester = UserId::random();
        let mut ports = MockPorts::default();
        ports
            .requests
            .expect_complete_response()
            .return_once(|_, _| Err(Error::conflict("only accepted responses can be completed")));
        let app = actix_test::init_service(test_app(ports, routes)).await;
        let cookie = session_cookie_for(&app, &requester).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri(&format!("/api/v1/responses/{}/complete", ResponseId::random()))
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
