//! Public donor directory.
//!
//! ```text
//! GET /api/v1/donors?bloodGroup=A-&location=pokhara&page=2
//! ```

use actix_web::{get, web};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::domain::{DonorFilter, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{DonorResponse, PageResponse};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, PageQuery, parse_optional_choice};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DonorSearchQuery {
    /// Exact blood group, e.g. `AB+`.
    pub blood_group: Option<String>,
    /// Case-insensitive substring of the donor's address.
    pub location: Option<String>,
    pub page: Option<u32>,
}

impl DonorSearchQuery {
    fn into_filter(self) -> Result<(DonorFilter, u32), Error> {
        let page = PageQuery { page: self.page }.page();
        let filter = DonorFilter {
            blood_group: parse_optional_choice(
                self.blood_group.as_deref(),
                FieldName::new("bloodGroup"),
            )?,
            location: self
                .location
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty()),
            exclude: None,
        };
        Ok((filter, page))
    }
}

/// Verified donors currently available to give blood.
#[utoipa::path(
    get,
    path = "/api/v1/donors",
    params(DonorSearchQuery),
    responses(
        (status = 200, description = "Donors", body = PageResponse<DonorResponse>),
        (status = 400, description = "Invalid request", body = Error)
    ),
    tags = ["donors"],
    operation_id = "searchDonors",
    security([])
)]
#[get("/donors")]
pub async fn search_donors(
    state: web::Data<HttpState>,
    query: web::Query<DonorSearchQuery>,
) -> ApiResult<web::Json<PageResponse<DonorResponse>>> {
    let (filter, page) = query.into_inner().into_filter()?;
    let donors = state.accounts_query.search_donors(filter, page).await?;
    Ok(web::Json(PageResponse::from_page(donors, DonorResponse::from)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::donor;
    use crate::domain::{BloodGroup, Page, PageRequest};
    use crate::inbound::http::test_utils::{MockPorts, test_app};
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use rstest::rstest;
    use serde_json::Value;

    fn routes(cfg: &mut web::ServiceConfig) {
        cfg.service(search_donors);
    }

    #[actix_web::test]
    async fn directory_is_public_and_hides_email() {
        let mut ports = MockPorts::default();
        ports
            .accounts_query
            .expect_search_donors()
            .withf(|filter, page| {
                filter.blood_group == Some(BloodGroup::APositive)
                    && filter.location.as_deref() == Some("Kathmandu")
                    && filter.exclude.is_none()
                    && *page == 2
            })
            .return_once(|_, _| {
                Ok(Page::new(
                    vec![donor("ram@example.org")],
                    PageRequest::new(2, 12),
                    13,
                ))
            });
        let app = actix_test::init_service(test_app(ports, routes)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/donors?bloodGroup=A%2B&location=%20Kathmandu%20&page=2")
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["items"][0]["fullName"], "Test Donor");
        assert!(body["items"][0].get("email").is_none());
        assert_eq!(body["totalPages"], 2);
    }

    #[rstest]
    #[case("bloodGroup=C%2B")]
    #[case("page=zero")]
    #[actix_web::test]
    async fn malformed_filters_are_rejected(#[case] query: &str) {
        let app = actix_test::init_service(test_app(MockPorts::default(), routes)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri(&format!("/api/v1/donors?{query}"))
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn blank_filters_match_everyone() {
        let mut ports = MockPorts::default();
        ports
            .accounts_query
            .expect_search_donors()
            .withf(|filter, page| *filter == DonorFilter::default() && *page == 1)
            .return_once(|_, _| Ok(Page::new(Vec::new(), PageRequest::first(12), 0)));
        let app = actix_test::init_service(test_app(ports, routes)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/donors?bloodGroup=&location=")
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
    }
}
