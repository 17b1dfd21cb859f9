//! Landing page and personal dashboard.

use actix_web::{get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::Error;
use crate::domain::ports::{Dashboard, HomeSummary};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{BloodRequestResponse, ResponseRecordResponse};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HomeResponse {
    /// Newest active public requests.
    pub recent_requests: Vec<BloodRequestResponse>,
    pub verified_users: u64,
    pub active_requests: u64,
}

impl From<HomeSummary> for HomeResponse {
    fn from(summary: HomeSummary) -> Self {
        Self {
            recent_requests: summary
                .recent_requests
                .into_iter()
                .map(BloodRequestResponse::from)
                .collect(),
            verified_users: summary.verified_users,
            active_requests: summary.active_requests,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub my_requests: Vec<BloodRequestResponse>,
    /// Requests from others that the caller could answer.
    pub available_requests: Vec<BloodRequestResponse>,
    pub my_responses: Vec<ResponseRecordResponse>,
    pub total_requests: u64,
    pub total_responses: u64,
    pub can_donate: bool,
    pub is_eligible: bool,
}

impl From<Dashboard> for DashboardResponse {
    fn from(value: Dashboard) -> Self {
        Self {
            my_requests: value
                .my_requests
                .into_iter()
                .map(BloodRequestResponse::from)
                .collect(),
            available_requests: value
                .available_requests
                .into_iter()
                .map(BloodRequestResponse::from)
                .collect(),
            my_responses: value
                .my_responses
                .into_iter()
                .map(ResponseRecordResponse::from)
                .collect(),
            total_requests: value.total_requests,
            total_responses: value.total_responses,
            can_donate: value.can_donate,
            is_eligible: value.is_eligible,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/home",
    responses((status = 200, description = "Landing page summary", body = HomeResponse)),
    tags = ["home"],
    operation_id = "getHome",
    security([])
)]
#[get("/home")]
pub async fn home(state: web::Data<HttpState>) -> ApiResult<web::Json<HomeResponse>> {
    let summary = state.requests_query.home().await?;
    Ok(web::Json(summary.into()))
}

/// The caller's requests, responses and donation eligibility.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["home"],
    operation_id = "getDashboard"
)]
#[get("/dashboard")]
pub async fn dashboard(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<DashboardResponse>> {
    let user_id = session.require_user_id()?;
    let overview = state.requests_query.dashboard(&user_id).await?;
    Ok(web::Json(overview.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;
    use crate::domain::fixtures::request_by;
    use crate::inbound::http::test_utils::{MockPorts, session_cookie_for, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use serde_json::Value;

    fn routes(cfg: &mut web::ServiceConfig) {
        cfg.service(home).service(dashboard);
    }

    #[actix_web::test]
    async fn home_is_public() {
        let mut ports = MockPorts::default();
        ports.requests_query.expect_home().return_once(|| {
            Ok(HomeSummary {
                recent_requests: vec![request_by(&UserId::random())],
                verified_users: 42,
                active_requests: 7,
            })
        });
        let app = actix_test::init_service(test_app(ports, routes)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/v1/home").to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["verifiedUsers"], 42);
        assert_eq!(body["activeRequests"], 7);
        assert_eq!(body["recentRequests"][0]["bloodGroupNeeded"], "O+");
    }

    #[actix_web::test]
    async fn dashboard_requires_a_session() {
        let app = actix_test::init_service(test_app(MockPorts::default(), routes)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/dashboard")
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn dashboard_reports_eligibility_for_the_caller() {
        let user_id = UserId::random();
        let expected = user_id.clone();
        let owned = request_by(&user_id);
        let mut ports = MockPorts::default();
        ports
            .requests_query
            .expect_dashboard()
            .withf(move |candidate| candidate == &expected)
            .return_once(move |_| {
                Ok(Dashboard {
                    my_requests: vec![owned],
                    available_requests: Vec::new(),
                    my_responses: Vec::new(),
                    total_requests: 1,
                    total_responses: 0,
                    can_donate: false,
                    is_eligible: true,
                })
            });
        let app = actix_test::init_service(test_app(ports, routes)).await;
        let cookie = session_cookie_for(&app, &user_id).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/dashboard")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["totalRequests"], 1);
        assert_eq!(body["canDonate"], false);
        assert_eq!(body["isEligible"], true);
        assert_eq!(body["myRequests"].as_array().map(Vec::len), Some(1));
    }
}
