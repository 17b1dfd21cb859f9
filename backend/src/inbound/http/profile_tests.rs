//! Tests for profile API handlers.

use super::*;
use crate::domain::fixtures::{donor, fixture_now};
use crate::domain::{BloodGroup, PrivacyLevel, UserId, UserProfile};
use crate::inbound::http::test_utils::{MockPorts, session_cookie_for, test_app};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use chrono::NaiveDate;
use serde_json::{Value, json};

fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(own_profile)
        .service(update_profile)
        .service(update_settings)
        .service(set_availability)
        .service(view_profile);
}

fn view_of(user: crate::domain::User, is_own: bool) -> ProfileView {
    let profile = UserProfile::new(user.id.clone(), fixture_now());
    ProfileView {
        user,
        profile,
        age: Some(30),
        can_donate: true,
        is_eligible: true,
        is_own,
    }
}

#[actix_web::test]
async fn profile_endpoints_require_a_session() {
    let app = actix_test::init_service(test_app(MockPorts::default(), routes)).await;

    for request in [
        actix_test::TestRequest::get().uri("/api/v1/profile"),
        actix_test::TestRequest::put()
            .uri("/api/v1/profile")
            .set_json(json!({})),
        actix_test::TestRequest::post()
            .uri("/api/v1/profile/availability")
            .set_json(json!({"available": true})),
    ] {
        let response = actix_test::call_service(&app, request.to_request()).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[actix_web::test]
async fn own_profile_views_self() {
    let user = donor("ada@example.org");
    let user_id = user.id.clone();
    let expected = user_id.clone();
    let mut ports = MockPorts::default();
    ports
        .accounts_query
        .expect_profile()
        .withf(move |viewer, subject| viewer == &expected && subject == &expected)
        .return_once(move |_, _| Ok(view_of(user, true)));
    let app = actix_test::init_service(test_app(ports, routes)).await;
    let cookie = session_cookie_for(&app, &user_id).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/profile")
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["isOwn"], true);
    assert_eq!(body["age"], 30);
    assert_eq!(body["user"]["bloodGroup"], "O+");
    assert_eq!(body["profile"]["privacyLevel"], "PUBLIC");
}

#[actix_web::test]
async fn foreign_profile_ids_are_validated() {
    let viewer = UserId::random();
    let app = actix_test::init_service(test_app(MockPorts::default(), routes)).await;
    let cookie = session_cookie_for(&app, &viewer).await;

    let request = actix_test::TestRequest::get()
        .uri("/api/v1/profile/not-a-uuid")
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn hidden_profiles_are_not_found() {
    let viewer = UserId::random();
    let subject = UserId::random();
    let mut ports = MockPorts::default();
    ports
        .accounts_query
        .expect_profile()
        .return_once(|_, _| Err(Error::not_found("user not found")));
    let app = actix_test::init_service(test_app(ports, routes)).await;
    let cookie = session_cookie_for(&app, &viewer).await;

    let request = actix_test::TestRequest::get()
        .uri(&format!("/api/v1/profile/{subject}"))
        .cookie(cookie)
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn profile_update_parses_dates_and_codes() {
    let user = donor("ada@example.org");
    let user_id = user.id.clone();
    let mut ports = MockPorts::default();
    ports
        .accounts
        .expect_update_profile()
        .withf(|_, changes| {
            changes.blood_group == Some(BloodGroup::BNegative)
                && changes.last_donation_date == NaiveDate::from_ymd_opt(2026, 3, 1)
                && changes.address == "Lalitpur"
        })
        .return_once(move |_, changes| {
            let mut updated = user;
            updated.blood_group = changes.blood_group;
            updated.address = changes.address;
            Ok(updated)
        });
    let app = actix_test::init_service(test_app(ports, routes)).await;
    let cookie = session_cookie_for(&app, &user_id).await;

    let request = actix_test::TestRequest::put()
        .uri("/api/v1/profile")
        .cookie(cookie)
        .set_json(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "phoneNumber": "9800000000",
            "dateOfBirth": "1996-01-15",
            "gender": "F",
            "bloodGroup": "B-",
            "weightKg": 61.0,
            "address": "Lalitpur",
            "lastDonationDate": "2026-03-01",
            "isAvailableForDonation": true
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["bloodGroup"], "B-");
    assert_eq!(body["address"], "Lalitpur");
}

#[actix_web::test]
async fn settings_default_to_public_privacy() {
    let user_id = UserId::random();
    let mut ports = MockPorts::default();
    ports
        .accounts
        .expect_update_settings()
        .withf(|_, changes| {
            changes.privacy_level == PrivacyLevel::Public && changes.emergency_contact.name == "Bo"
        })
        .return_once(|user_id, changes| {
            let mut profile = UserProfile::new(user_id.clone(), fixture_now());
            profile.emergency_contact = changes.emergency_contact;
            Ok(profile)
        });
    let app = actix_test::init_service(test_app(ports, routes)).await;
    let cookie = session_cookie_for(&app, &user_id).await;

    let request = actix_test::TestRequest::put()
        .uri("/api/v1/profile/settings")
        .cookie(cookie)
        .set_json(json!({
            "emergencyContact": {"name": "Bo", "phone": "9811111111", "relation": "Sibling"},
            "emailNotifications": true
        }))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["emergencyContact"]["relation"], "Sibling");
}

#[actix_web::test]
async fn unknown_privacy_level_is_rejected() {
    let user_id = UserId::random();
    let app = actix_test::init_service(test_app(MockPorts::default(), routes)).await;
    let cookie = session_cookie_for(&app, &user_id).await;

    let request = actix_test::TestRequest::put()
        .uri("/api/v1/profile/settings")
        .cookie(cookie)
        .set_json(json!({"privacyLevel": "FRIENDS"}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["details"]["field"], "privacyLevel");
}

#[actix_web::test]
async fn availability_echoes_new_state() {
    let user_id = UserId::random();
    let mut ports = MockPorts::default();
    ports
        .accounts
        .expect_set_availability()
        .withf(|_, available| !*available)
        .return_once(|_, available| Ok(available));
    let app = actix_test::init_service(test_app(ports, routes)).await;
    let cookie = session_cookie_for(&app, &user_id).await;

    let request = actix_test::TestRequest::post()
        .uri("/api/v1/profile/availability")
        .cookie(cookie)
        .set_json(json!({"available": false}))
        .to_request();
    let response = actix_test::call_service(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(response).await;
    assert_eq!(body["isAvailableForDonation"], false);
}
