//! Tests for the blood request service.

use std::sync::Arc;

use chrono::Duration;
use rstest::rstest;

use super::*;
use crate::domain::fixtures::{donor, fixture_clock, fixture_now, request_by};
use crate::domain::ports::{MockBloodRequestRepository, MockResponseRepository, MockUserRepository};
use crate::domain::{BloodGroup, ErrorCode};

type Service =
    BloodRequestService<MockUserRepository, MockBloodRequestRepository, MockResponseRepository>;

fn make_service(
    users: MockUserRepository,
    requests: MockBloodRequestRepository,
    responses: MockResponseRepository,
) -> Service {
    BloodRequestService::new(
        Arc::new(users),
        Arc::new(requests),
        Arc::new(responses),
        fixture_clock(),
    )
}

fn input() -> BloodRequestInput {
    BloodRequestInput {
        patient_name: "Patient Zero".into(),
        blood_group_needed: BloodGroup::OPositive,
        units_needed: 2,
        hospital_name: "Civil Hospital".into(),
        hospital_address: "New Baneshwor".into(),
        urgency: Urgency::Critical,
        needed_by: fixture_now() + Duration::hours(6),
        description: "Emergency surgery".into(),
        contact_phone: "5550100".into(),
        is_public: true,
    }
}

fn accept() -> ResponseReply {
    ResponseReply {
        outcome: ResponseOutcome::Accepted,
        message: "On my way".into(),
        donor_phone: "9800000000".into(),
        preferred_contact_time: "Any time".into(),
    }
}

fn users_returning(user: Option<User>) -> MockUserRepository {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .return_once(move |_| Ok(user));
    users
}

fn requests_returning(request: Option<BloodRequest>) -> MockBloodRequestRepository {
    let mut requests = MockBloodRequestRepository::new();
    requests
        .expect_find()
        .return_once(move |_| Ok(request));
    requests
}

#[tokio::test]
async fn create_opens_active_request() {
    let requester = UserId::random();
    let mut requests = MockBloodRequestRepository::new();
    requests
        .expect_insert()
        .withf(|request| request.status == RequestStatus::Active && request.units_needed == 2)
        .times(1)
        .return_once(|_| Ok(()));
    let service = make_service(
        MockUserRepository::new(),
        requests,
        MockResponseRepository::new(),
    );
    let request = service
        .create(&requester, input())
        .await
        .expect("created");
    assert!(request.is_owned_by(&requester));
}

#[tokio::test]
async fn create_rejects_past_needed_by() {
    let mut stale = input();
    stale.needed_by = fixture_now() - Duration::minutes(5);
    let service = make_service(
        MockUserRepository::new(),
        MockBloodRequestRepository::new(),
        MockResponseRepository::new(),
    );
    let error = service
        .create(&UserId::random(), stale)
        .await
        .expect_err("past date");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        error.details().map(|details| details["field"].clone()),
        Some(serde_json::json!("neededBy"))
    );
}

#[tokio::test]
async fn update_by_non_owner_is_not_found() {
    let request = request_by(&UserId::random());
    let id = request.id;
    let mut requests = requests_returning(Some(request));
    requests.expect_update().times(0);
    let service = make_service(MockUserRepository::new(), requests, MockResponseRepository::new());
    let error = service
        .update(&UserId::random(), id, input())
        .await
        .expect_err("not owner");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn reopening_requires_future_date() {
    let requester = UserId::random();
    let mut request = request_by(&requester);
    request.status = RequestStatus::Cancelled;
    request.needed_by = fixture_now() - Duration::days(1);
    let id = request.id;
    let service = make_service(
        MockUserRepository::new(),
        requests_returning(Some(request)),
        MockResponseRepository::new(),
    );
    let error = service
        .change_status(&requester, id, RequestStatus::Active)
        .await
        .expect_err("cannot reopen");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn cancelling_updates_status() {
    let requester = UserId::random();
    let request = request_by(&requester);
    let id = request.id;
    let mut requests = requests_returning(Some(request));
    requests
        .expect_update()
        .withf(|request| request.status == RequestStatus::Cancelled)
        .times(1)
        .return_once(|_| Ok(()));
    let service = make_service(MockUserRepository::new(), requests, MockResponseRepository::new());
    let updated = service
        .change_status(&requester, id, RequestStatus::Cancelled)
        .await
        .expect("cancelled");
    assert_eq!(updated.status, RequestStatus::Cancelled);
}

#[tokio::test]
async fn respond_to_missing_request_is_not_found() {
    let service = make_service(
        MockUserRepository::new(),
        requests_returning(None),
        MockResponseRepository::new(),
    );
    let error = service
        .respond(&UserId::random(), BloodRequestId::random(), accept())
        .await
        .expect_err("missing");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[case::requester_themselves(true, RequestStatus::Active, BloodGroup::OPositive)]
#[case::inactive_request(false, RequestStatus::Fulfilled, BloodGroup::OPositive)]
#[case::wrong_group(false, RequestStatus::Active, BloodGroup::BNegative)]
#[tokio::test]
async fn respond_requires_can_accept(
    #[case] own_request: bool,
    #[case] status: RequestStatus,
    #[case] donor_group: BloodGroup,
) {
    let mut user = donor("responder@example.org");
    user.blood_group = Some(donor_group);
    let requester = if own_request {
        user.id.clone()
    } else {
        UserId::random()
    };
    let mut request = request_by(&requester);
    request.status = status;
    let id = request.id;
    let donor_id = user.id.clone();

    let mut responses = MockResponseRepository::new();
    responses.expect_insert().times(0);
    let service = make_service(
        users_returning(Some(user)),
        requests_returning(Some(request)),
        responses,
    );
    let error = service
        .respond(&donor_id, id, accept())
        .await
        .expect_err("cannot respond");
    assert_eq!(error.code(), ErrorCode::Forbidden);
    assert_eq!(error.message(), "You cannot respond to this blood request.");
}

#[tokio::test]
async fn respond_twice_is_conflict() {
    let user = donor("twice@example.org");
    let donor_id = user.id.clone();
    let request = request_by(&UserId::random());
    let id = request.id;
    let existing = DonationResponse::new(id, donor_id.clone(), accept(), fixture_now());

    let mut responses = MockResponseRepository::new();
    responses
        .expect_find_for_donor()
        .return_once(move |_, _| Ok(Some(existing)));
    responses.expect_insert().times(0);
    let service = make_service(
        users_returning(Some(user)),
        requests_returning(Some(request)),
        responses,
    );
    let error = service
        .respond(&donor_id, id, accept())
        .await
        .expect_err("duplicate");
    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.message(), "You have already responded to this request.");
}

#[tokio::test]
async fn eligible_donor_can_respond() {
    let user = donor("eligible@example.org");
    let donor_id = user.id.clone();
    let request = request_by(&UserId::random());
    let id = request.id;

    let mut responses = MockResponseRepository::new();
    responses
        .expect_find_for_donor()
        .return_once(|_, _| Ok(None));
    responses
        .expect_insert()
        .withf(move |response| response.request_id == id)
        .times(1)
        .return_once(|_| Ok(()));
    let service = make_service(
        users_returning(Some(user)),
        requests_returning(Some(request)),
        responses,
    );
    let response = service
        .respond(&donor_id, id, accept())
        .await
        .expect("response stored");
    assert_eq!(response.outcome, ResponseOutcome::Accepted);
}

#[tokio::test]
async fn complete_response_records_donation() {
    let requester = UserId::random();
    let request = request_by(&requester);
    let donor_id = UserId::random();
    let response = DonationResponse::new(request.id, donor_id.clone(), accept(), fixture_now());
    let response_id = response.id;

    let mut responses = MockResponseRepository::new();
    responses
        .expect_find()
        .return_once(move |_| Ok(Some(response)));
    responses
        .expect_record_donation()
        .withf(move |completion| {
            completion.donor == donor_id
                && completion.units_needed == 1
                && completion.donated_on == fixture_now().date_naive()
        })
        .times(1)
        .return_once(|_| Ok(RequestStatus::Fulfilled));
    let service = make_service(
        MockUserRepository::new(),
        requests_returning(Some(request)),
        responses,
    );
    let status = service
        .complete_response(&requester, response_id)
        .await
        .expect("completed");
    assert_eq!(status, RequestStatus::Fulfilled);
}

#[tokio::test]
async fn only_accepted_responses_complete() {
    let requester = UserId::random();
    let request = request_by(&requester);
    let mut declined = accept();
    declined.outcome = ResponseOutcome::Declined;
    let response = DonationResponse::new(request.id, UserId::random(), declined, fixture_now());
    let response_id = response.id;

    let mut responses = MockResponseRepository::new();
    responses
        .expect_find()
        .return_once(move |_| Ok(Some(response)));
    responses.expect_record_donation().times(0);
    let service = make_service(
        MockUserRepository::new(),
        requests_returning(Some(request)),
        responses,
    );
    let error = service
        .complete_response(&requester, response_id)
        .await
        .expect_err("declined");
    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn completion_lost_to_a_concurrent_one_is_a_conflict() {
    let requester = UserId::random();
    let request = request_by(&requester);
    let response = DonationResponse::new(request.id, UserId::random(), accept(), fixture_now());
    let response_id = response.id;

    let mut responses = MockResponseRepository::new();
    responses
        .expect_find()
        .return_once(move |_| Ok(Some(response)));
    responses
        .expect_record_donation()
        .times(1)
        .return_once(move |_| {
            Err(ResponseRepositoryError::not_accepted(response_id.to_string()))
        });
    let service = make_service(
        MockUserRepository::new(),
        requests_returning(Some(request)),
        responses,
    );
    let error = service
        .complete_response(&requester, response_id)
        .await
        .expect_err("already completed");
    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(
        error.details().and_then(|details| details.get("code")).and_then(|code| code.as_str()),
        Some("not_accepted")
    );
}

#[tokio::test]
async fn private_requests_hidden_from_strangers() {
    let mut request = request_by(&UserId::random());
    request.is_public = false;
    let id = request.id;
    let service = make_service(
        MockUserRepository::new(),
        requests_returning(Some(request)),
        MockResponseRepository::new(),
    );
    let error = service
        .detail(Some(UserId::random()), id)
        .await
        .expect_err("hidden");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn anonymous_detail_cannot_respond() {
    let request = request_by(&UserId::random());
    let id = request.id;
    let service = make_service(
        MockUserRepository::new(),
        requests_returning(Some(request)),
        MockResponseRepository::new(),
    );
    let detail = service.detail(None, id).await.expect("public detail");
    assert!(!detail.can_respond);
    assert!(!detail.is_owner);
    assert!(detail.responses.is_empty());
}

#[tokio::test]
async fn requester_detail_lists_responses() {
    let owner = donor("owner@example.org");
    let request = request_by(&owner.id);
    let id = request.id;
    let owner_id = owner.id.clone();

    let mut responses = MockResponseRepository::new();
    responses
        .expect_find_for_donor()
        .return_once(|_, _| Ok(None));
    responses
        .expect_list()
        .withf(move |filter, _| filter.request_id == Some(id))
        .times(1)
        .return_once(|_, page| Ok(Page::new(Vec::new(), page, 0)));
    let service = make_service(
        users_returning(Some(owner)),
        requests_returning(Some(request)),
        responses,
    );
    let detail = service
        .detail(Some(owner_id), id)
        .await
        .expect("owner detail");
    assert!(detail.is_owner);
    assert!(!detail.can_respond);
}

#[tokio::test]
async fn compatible_donors_exclude_requester() {
    let requester = UserId::random();
    let request = request_by(&requester);
    let id = request.id;
    let mut users = MockUserRepository::new();
    let excluded = requester.clone();
    users
        .expect_search_donors()
        .withf(move |filter, _| {
            filter.exclude.as_ref() == Some(&excluded)
                && filter.blood_group == Some(BloodGroup::OPositive)
        })
        .times(1)
        .return_once(|_, page| Ok(Page::new(Vec::new(), page, 0)));
    let service = make_service(
        users,
        requests_returning(Some(request)),
        MockResponseRepository::new(),
    );
    service
        .compatible_donors(&requester, id, 1)
        .await
        .expect("donor list");
}

#[tokio::test]
async fn public_listing_reports_stats() {
    let mut requests = MockBloodRequestRepository::new();
    requests
        .expect_list()
        .withf(|filter, page| {
            filter.public_only
                && filter.status == Some(RequestStatus::Active)
                && filter.urgencies == vec![Urgency::Low]
                && page.per_page() == PUBLIC_PER_PAGE
        })
        .times(1)
        .return_once(|_, page| Ok(Page::new(Vec::new(), page, 0)));
    requests.expect_count().returning(|filter| {
        Ok(match (filter.status, filter.urgencies.is_empty()) {
            (None, _) => 10,
            (Some(RequestStatus::Active), true) => 6,
            (Some(RequestStatus::Active), false) => 2,
            (Some(_), _) => 3,
        })
    });
    let service = make_service(
        MockUserRepository::new(),
        requests,
        MockResponseRepository::new(),
    );
    let search = RequestSearch {
        urgency: Some(Urgency::Low),
        ..RequestSearch::default()
    };
    let listing = service.list_public(search, 1).await.expect("listing");
    assert_eq!(
        listing.stats,
        RequestStats {
            total_public: 10,
            active_public: 6,
            urgent_public: 2,
            fulfilled_public: 3,
        }
    );
}

#[tokio::test]
async fn expire_overdue_uses_clock() {
    let mut requests = MockBloodRequestRepository::new();
    requests
        .expect_expire_overdue()
        .withf(|now| *now == fixture_now())
        .times(1)
        .return_once(|_| Ok(4));
    let service = make_service(
        MockUserRepository::new(),
        requests,
        MockResponseRepository::new(),
    );
    assert_eq!(service.expire_overdue().await.expect("sweep"), 4);
}

#[tokio::test]
async fn dashboard_without_blood_group_skips_available_requests() {
    let mut user = donor("dash@example.org");
    user.blood_group = None;
    let user_id = user.id.clone();

    let mut requests = MockBloodRequestRepository::new();
    requests
        .expect_list()
        .times(1)
        .return_once(|_, page| Ok(Page::new(Vec::new(), page, 0)));
    requests.expect_count().times(1).return_once(|_| Ok(0));
    let mut responses = MockResponseRepository::new();
    responses
        .expect_list()
        .times(1)
        .return_once(|_, page| Ok(Page::new(Vec::new(), page, 0)));
    responses.expect_count().times(1).return_once(|_| Ok(0));

    let service = make_service(users_returning(Some(user)), requests, responses);
    let dashboard = service.dashboard(&user_id).await.expect("dashboard");
    assert!(dashboard.available_requests.is_empty());
    assert!(!dashboard.is_eligible);
    assert!(dashboard.can_donate);
}

#[tokio::test]
async fn connection_errors_become_service_unavailable() {
    let mut requests = MockBloodRequestRepository::new();
    requests
        .expect_find()
        .return_once(|_| Err(BloodRequestRepositoryError::connection("refused")));
    let service = make_service(
        MockUserRepository::new(),
        requests,
        MockResponseRepository::new(),
    );
    let error = service
        .detail(None, BloodRequestId::random())
        .await
        .expect_err("outage");
    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}
