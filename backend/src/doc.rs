//! OpenAPI document for the LifeLine REST API.
//!
//! Served by Swagger UI at `/docs` in debug builds and printed by the
//! `openapi-dump` binary for client generation.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{
    BloodGroup, EmergencyContact, Error, ErrorCode, Gender, PrivacyLevel, RequestStatus,
    ResponseOutcome, Urgency,
};
use crate::inbound::http::session_config::SESSION_COOKIE_NAME;
use crate::inbound::http::{
    accounts, blood_requests, donors, dto, health, home, profile, responses,
};

struct SessionCookieAddon;

impl Modify for SessionCookieAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                SESSION_COOKIE_NAME,
                "Signed session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SessionCookieAddon),
    info(
        title = "LifeLine API",
        description = "Blood donation requests, donor matching and donor responses."
    ),
    servers((url = "/", description = "Relative to the deployment base URL")),
    security(("SessionCookie" = [])),
    paths(
        accounts::register,
        accounts::verify_email,
        accounts::login,
        accounts::logout,
        accounts::email_availability,
        home::home,
        home::dashboard,
        profile::own_profile,
        profile::update_profile,
        profile::view_profile,
        profile::update_settings,
        profile::set_availability,
        blood_requests::list_requests,
        blood_requests::create_request,
        blood_requests::request_detail,
        blood_requests::update_request,
        blood_requests::delete_request,
        blood_requests::change_status,
        blood_requests::respond,
        blood_requests::compatible_donors,
        blood_requests::my_requests,
        responses::list_responses,
        responses::my_responses,
        responses::complete_response,
        donors::search_donors,
        health::ready,
        health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        BloodGroup,
        Gender,
        Urgency,
        RequestStatus,
        ResponseOutcome,
        PrivacyLevel,
        EmergencyContact,
        dto::UserResponse,
        dto::DonorResponse,
        dto::ProfileResponse,
        dto::BloodRequestResponse,
        dto::DonationResponseResponse,
        dto::ResponseRecordResponse,
    )),
    tags(
        (name = "accounts", description = "Registration, verification and login"),
        (name = "home", description = "Landing page and dashboard"),
        (name = "profile", description = "Donor profiles and settings"),
        (name = "blood-requests", description = "Blood requests and donor matching"),
        (name = "responses", description = "Donor responses to requests"),
        (name = "donors", description = "Public donor directory"),
        (name = "health", description = "Orchestration probes")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::openapi::path::HttpMethod;

    #[rstest]
    #[case("/api/v1/register", HttpMethod::Post)]
    #[case("/api/v1/blood-requests/{id}/donors", HttpMethod::Get)]
    #[case("/api/v1/responses/{id}/complete", HttpMethod::Post)]
    #[case("/api/v1/donors", HttpMethod::Get)]
    #[case("/health/ready", HttpMethod::Get)]
    fn documents_endpoint(#[case] path: &str, #[case] method: HttpMethod) {
        let doc = ApiDoc::openapi();
        let item = doc.paths.paths.get(path).expect("documented path");
        let operation = match method {
            HttpMethod::Get => item.get.as_ref(),
            HttpMethod::Post => item.post.as_ref(),
            _ => None,
        };
        assert!(operation.is_some(), "{path} lacks its operation");
    }

    #[rstest]
    fn registers_session_cookie_scheme() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");

        assert!(components.security_schemes.contains_key("SessionCookie"));
        assert!(components.schemas.contains_key("Error"));
        assert!(components.schemas.contains_key("BloodGroup"));
    }
}
