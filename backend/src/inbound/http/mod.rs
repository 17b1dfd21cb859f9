//! HTTP inbound adapter exposing the REST API.
//!
//! Handlers translate JSON payloads into domain inputs, call the driving
//! ports held in [`state::HttpState`] and map domain errors onto HTTP
//! responses through [`error`].

pub mod accounts;
pub mod blood_requests;
pub mod donors;
pub mod dto;
pub mod error;
pub mod health;
pub mod home;
pub mod profile;
pub mod responses;
pub mod session;
pub mod session_config;
pub mod state;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod validation;

pub use error::ApiResult;

use actix_web::web;

/// Register every `/api/v1` handler on `cfg`, with extractor failures
/// reported through the JSON error envelope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
        .app_data(web::PathConfig::default().error_handler(error::path_error_handler))
        .service(accounts::register)
        .service(accounts::verify_email)
        .service(accounts::login)
        .service(accounts::logout)
        .service(accounts::email_availability)
        .service(home::home)
        .service(home::dashboard)
        .service(profile::own_profile)
        .service(profile::update_profile)
        .service(profile::update_settings)
        .service(profile::set_availability)
        .service(profile::view_profile)
        .service(blood_requests::list_requests)
        .service(blood_requests::create_request)
        .service(blood_requests::my_requests)
        .service(blood_requests::request_detail)
        .service(blood_requests::update_request)
        .service(blood_requests::delete_request)
        .service(blood_requests::change_status)
        .service(blood_requests::respond)
        .service(blood_requests::compatible_donors)
        .service(responses::list_responses)
        .service(responses::my_responses)
        .service(responses::complete_response)
        .service(donors::search_donors);
}
