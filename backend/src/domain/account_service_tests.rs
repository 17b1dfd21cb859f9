//! Tests for the account service.

use std::sync::Arc;

use chrono::{Datelike, Duration, NaiveDate};
use rstest::rstest;
use zeroize::Zeroizing;

use super::*;
use crate::domain::fixtures::{donor, fixture_clock, fixture_now};
use crate::domain::ports::{
    MailerError, MockPasswordHasher, MockUserRepository, MockVerificationMailer,
    StoredCredentials,
};
use crate::domain::{BloodGroup, ErrorCode, Gender, PrivacyLevel};

type Service = AccountService<MockUserRepository, MockPasswordHasher, MockVerificationMailer>;

fn make_service(
    users: MockUserRepository,
    hasher: MockPasswordHasher,
    mailer: MockVerificationMailer,
) -> Service {
    AccountService::new(
        Arc::new(users),
        Arc::new(hasher),
        Arc::new(mailer),
        fixture_clock(),
        "https://lifeline.test/",
    )
}

fn registration_form() -> RegistrationForm {
    let today = fixture_now().date_naive();
    RegistrationForm {
        email: "New.Donor@Example.org".into(),
        first_name: "New".into(),
        last_name: "Donor".into(),
        phone_number: "9841000000".into(),
        date_of_birth: today.with_year(today.year() - 25),
        gender: Some(Gender::Other),
        blood_group: Some(BloodGroup::AbPositive),
        city: "Pokhara".into(),
        weight_kg: Some(64.0),
        terms_accepted: true,
        password: Zeroizing::new("donate-often".into()),
        password_confirmation: Zeroizing::new("donate-often".into()),
    }
}

fn stored(user: User) -> StoredCredentials {
    StoredCredentials {
        user,
        password_hash: "$argon2id$stub".into(),
    }
}

#[tokio::test]
async fn register_creates_user_and_mails_link() {
    let mut users = MockUserRepository::new();
    users
        .expect_email_exists()
        .withf(|email| email == "new.donor@example.org")
        .times(1)
        .return_once(|_| Ok(false));
    users
        .expect_create()
        .withf(|user, profile, hash| {
            !user.is_email_verified
                && user.verification_token.is_some()
                && user.address == "Pokhara"
                && profile.user_id == user.id
                && hash == "hashed"
        })
        .times(1)
        .return_once(|_, _, _| Ok(()));

    let mut hasher = MockPasswordHasher::new();
    hasher
        .expect_hash()
        .withf(|password| password == "donate-often")
        .times(1)
        .return_once(|_| Ok("hashed".into()));

    let mut mailer = MockVerificationMailer::new();
    mailer
        .expect_send_verification()
        .withf(|email| {
            email.to.as_ref() == "new.donor@example.org"
                && email.full_name == "New Donor"
                && email
                    .link
                    .starts_with("https://lifeline.test/api/v1/verify-email/")
        })
        .times(1)
        .return_once(|_| Ok(()));

    let service = make_service(users, hasher, mailer);
    let outcome = service
        .register(registration_form())
        .await
        .expect("registration succeeds");
    assert!(outcome.email_sent);
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let mut users = MockUserRepository::new();
    users
        .expect_email_exists()
        .times(1)
        .return_once(|_| Ok(true));
    users.expect_create().times(0);

    let service = make_service(
        users,
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let error = service
        .register(registration_form())
        .await
        .expect_err("duplicate");
    assert_eq!(error.code(), ErrorCode::Conflict);
    assert_eq!(error.message(), "A user with this email already exists.");
}

#[tokio::test]
async fn register_maps_insert_race_to_conflict() {
    let mut users = MockUserRepository::new();
    users
        .expect_email_exists()
        .times(1)
        .return_once(|_| Ok(false));
    users
        .expect_create()
        .times(1)
        .return_once(|_, _, _| Err(UserRepositoryError::duplicate_email("new.donor@example.org")));
    let mut hasher = MockPasswordHasher::new();
    hasher.expect_hash().return_once(|_| Ok("hashed".into()));

    let service = make_service(users, hasher, MockVerificationMailer::new());
    let error = service
        .register(registration_form())
        .await
        .expect_err("duplicate");
    assert_eq!(error.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn register_survives_mail_failure() {
    let mut users = MockUserRepository::new();
    users.expect_email_exists().return_once(|_| Ok(false));
    users.expect_create().return_once(|_, _, _| Ok(()));
    let mut hasher = MockPasswordHasher::new();
    hasher.expect_hash().return_once(|_| Ok("hashed".into()));
    let mut mailer = MockVerificationMailer::new();
    mailer
        .expect_send_verification()
        .return_once(|_| Err(MailerError::delivery("smtp down")));

    let service = make_service(users, hasher, mailer);
    let outcome = service
        .register(registration_form())
        .await
        .expect("registration still succeeds");
    assert!(!outcome.email_sent);
}

#[tokio::test]
async fn register_reports_field_errors() {
    let mut form = registration_form();
    form.terms_accepted = false;
    let service = make_service(
        MockUserRepository::new(),
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let error = service.register(form).await.expect_err("invalid");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    let details = error.details().expect("field details");
    assert_eq!(details["field"], "termsAccepted");
}

#[tokio::test]
async fn verify_email_marks_user_verified() {
    let mut user = donor("pending@example.org");
    user.is_email_verified = false;
    let token = VerificationToken::generate();
    user.verification_token = Some(token);

    let mut users = MockUserRepository::new();
    users
        .expect_find_by_verification_token()
        .times(1)
        .return_once(move |_| Ok(Some(user)));
    users
        .expect_update()
        .withf(|user| user.is_email_verified)
        .times(1)
        .return_once(|_| Ok(()));

    let service = make_service(
        users,
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let outcome = service.verify_email(token).await.expect("verified");
    assert_eq!(outcome, VerificationOutcome::Verified);
}

#[tokio::test]
async fn verify_email_reports_already_verified() {
    let user = donor("done@example.org");
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_verification_token()
        .return_once(move |_| Ok(Some(user)));
    users.expect_update().times(0);

    let service = make_service(
        users,
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let outcome = service
        .verify_email(VerificationToken::generate())
        .await
        .expect("already verified");
    assert_eq!(outcome, VerificationOutcome::AlreadyVerified);
}

#[tokio::test]
async fn verify_email_rejects_unknown_token() {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_verification_token()
        .return_once(|_| Ok(None));
    let service = make_service(
        users,
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let error = service
        .verify_email(VerificationToken::generate())
        .await
        .expect_err("unknown token");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[rstest]
#[case::unknown_email(None, true, ErrorCode::Unauthorized, "Invalid email or password.")]
#[case::wrong_password(Some((true, true)), false, ErrorCode::Unauthorized, "Invalid email or password.")]
#[case::inactive(Some((false, true)), true, ErrorCode::Forbidden, "This account is inactive.")]
#[case::unverified(
    Some((true, false)),
    true,
    ErrorCode::Forbidden,
    "Please verify your email address before logging in."
)]
#[tokio::test]
async fn authenticate_rejects_bad_logins(
    #[case] account: Option<(bool, bool)>,
    #[case] password_ok: bool,
    #[case] code: ErrorCode,
    #[case] message: &str,
) {
    let mut users = MockUserRepository::new();
    let found = account.map(|(active, verified)| {
        let mut user = donor("login@example.org");
        user.is_active = active;
        user.is_email_verified = verified;
        stored(user)
    });
    users
        .expect_find_credentials()
        .withf(|email| email == "login@example.org")
        .return_once(move |_| Ok(found));
    let mut hasher = MockPasswordHasher::new();
    hasher
        .expect_hash()
        .returning(|_| Ok("$argon2id$decoy".into()));
    hasher
        .expect_verify()
        .returning(move |_, _| Ok(password_ok));

    let service = make_service(users, hasher, MockVerificationMailer::new());
    let credentials =
        LoginCredentials::try_from_parts(" LOGIN@example.org", "pw").expect("credentials");
    let error = service
        .authenticate(&credentials)
        .await
        .expect_err("login refused");
    assert_eq!(error.code(), code);
    assert_eq!(error.message(), message);
}

#[tokio::test]
async fn unknown_email_still_pays_for_a_verification() {
    let mut users = MockUserRepository::new();
    users.expect_find_credentials().returning(|_| Ok(None));
    let mut hasher = MockPasswordHasher::new();
    hasher
        .expect_hash()
        .times(1)
        .returning(|_| Ok("$argon2id$decoy".into()));
    hasher
        .expect_verify()
        .withf(|password, hash| password == "pw" && hash == "$argon2id$decoy")
        .times(2)
        .returning(|_, _| Ok(false));

    let service = make_service(users, hasher, MockVerificationMailer::new());
    let credentials =
        LoginCredentials::try_from_parts("nobody@example.org", "pw").expect("credentials");
    for _ in 0..2 {
        let error = service
            .authenticate(&credentials)
            .await
            .expect_err("unknown email");
        assert_eq!(error.code(), ErrorCode::Unauthorized);
    }
}

#[tokio::test]
async fn authenticate_returns_user_id() {
    let user = donor("ok@example.org");
    let expected = user.id.clone();
    let mut users = MockUserRepository::new();
    users
        .expect_find_credentials()
        .return_once(move |_| Ok(Some(stored(user))));
    let mut hasher = MockPasswordHasher::new();
    hasher.expect_verify().return_once(|_, _| Ok(true));

    let service = make_service(users, hasher, MockVerificationMailer::new());
    let credentials =
        LoginCredentials::try_from_parts("ok@example.org", "pw").expect("credentials");
    let id = service.authenticate(&credentials).await.expect("login");
    assert_eq!(id, expected);
}

#[tokio::test]
async fn repository_outage_is_service_unavailable() {
    let mut users = MockUserRepository::new();
    users
        .expect_email_exists()
        .return_once(|_| Err(UserRepositoryError::connection("pool exhausted")));
    let service = make_service(
        users,
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let error = service
        .email_available("someone@example.org")
        .await
        .expect_err("outage");
    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}

#[tokio::test]
async fn update_profile_rejects_future_donation_date() {
    let service = make_service(
        MockUserRepository::new(),
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let changes = ProfileChanges {
        first_name: "Test".into(),
        last_name: "Donor".into(),
        phone_number: String::new(),
        date_of_birth: None,
        gender: None,
        blood_group: None,
        weight_kg: None,
        address: String::new(),
        last_donation_date: Some(fixture_now().date_naive() + Duration::days(1)),
        medical_conditions: String::new(),
        is_available_for_donation: true,
    };
    let error = service
        .update_profile(&UserId::random(), changes)
        .await
        .expect_err("future date");
    assert_eq!(error.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        error.details().map(|details| details["field"].clone()),
        Some(serde_json::json!("lastDonationDate"))
    );
}

#[tokio::test]
async fn set_availability_persists_flag() {
    let user = donor("flag@example.org");
    let id = user.id.clone();
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(user)));
    let expected = id.clone();
    users
        .expect_set_availability()
        .withf(move |target, available, at| {
            target == &expected && !*available && *at == fixture_now()
        })
        .times(1)
        .return_once(|_, _, _| Ok(()));
    users.expect_update().times(0);
    let service = make_service(
        users,
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    assert!(!service.set_availability(&id, false).await.expect("updated"));
}

#[tokio::test]
async fn profile_edit_keeps_an_unchanged_donation_date_out_of_the_write() {
    let donated = fixture_now().date_naive() - Duration::days(30);
    let mut user = donor("edit@example.org");
    user.last_donation_date = Some(donated);
    let id = user.id.clone();
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(user)));
    users
        .expect_update_details()
        .withf(|_, update| update.last_donation_date.is_none() && update.first_name == "Renamed")
        .times(1)
        .return_once(|_, _| Ok(()));
    users.expect_update().times(0);
    let service = make_service(
        users,
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let changes = ProfileChanges {
        first_name: "Renamed".into(),
        last_name: "Donor".into(),
        phone_number: String::new(),
        date_of_birth: None,
        gender: None,
        blood_group: Some(BloodGroup::OPositive),
        weight_kg: Some(60.0),
        address: "Kathmandu".into(),
        last_donation_date: Some(donated),
        medical_conditions: String::new(),
        is_available_for_donation: true,
    };

    let updated = service
        .update_profile(&id, changes)
        .await
        .expect("profile saved");
    assert_eq!(updated.first_name, "Renamed");
    assert_eq!(updated.last_donation_date, Some(donated));
}

#[rstest]
#[case(PrivacyLevel::Public, false, true)]
#[case(PrivacyLevel::DonorsOnly, true, true)]
#[case(PrivacyLevel::DonorsOnly, false, false)]
#[case(PrivacyLevel::Private, true, false)]
#[tokio::test]
async fn profile_visibility_respects_privacy(
    #[case] level: PrivacyLevel,
    #[case] viewer_is_donor: bool,
    #[case] visible: bool,
) {
    let subject = donor("subject@example.org");
    let subject_id = subject.id.clone();
    let mut viewer = donor("viewer@example.org");
    viewer.is_donor = viewer_is_donor;
    let viewer_id = viewer.id.clone();

    let mut profile = UserProfile::new(subject_id.clone(), fixture_now());
    profile.privacy_level = level;

    let mut users = MockUserRepository::new();
    let lookup_subject = subject_id.clone();
    users.expect_find_by_id().returning(move |id| {
        if id == &lookup_subject {
            Ok(Some(subject.clone()))
        } else {
            Ok(Some(viewer.clone()))
        }
    });
    users
        .expect_find_profile()
        .return_once(move |_| Ok(Some(profile)));

    let service = make_service(
        users,
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let result = service.profile(&viewer_id, &subject_id).await;
    match (visible, result) {
        (true, Ok(view)) => {
            assert!(!view.is_own);
            assert!(view.is_eligible);
            assert_eq!(view.age, Some(30));
        }
        (false, Err(error)) => assert_eq!(error.code(), ErrorCode::NotFound),
        (true, Err(error)) => panic!("expected profile, got {error:?}"),
        (false, Ok(_)) => panic!("expected profile to be hidden"),
    }
}

#[tokio::test]
async fn unverified_profiles_are_hidden_from_others() {
    let mut subject = donor("hidden@example.org");
    subject.is_email_verified = false;
    let subject_id = subject.id.clone();
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .return_once(move |_| Ok(Some(subject)));
    users.expect_find_profile().return_once(|_| Ok(None));

    let service = make_service(
        users,
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let error = service
        .profile(&UserId::random(), &subject_id)
        .await
        .expect_err("hidden");
    assert_eq!(error.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn donor_search_uses_fixed_page_size() {
    let mut users = MockUserRepository::new();
    users
        .expect_search_donors()
        .withf(|filter, page| {
            filter.blood_group == Some(BloodGroup::ONegative)
                && page.page() == 2
                && page.per_page() == DONORS_PER_PAGE
        })
        .times(1)
        .return_once(|_, page| Ok(Page::new(Vec::new(), page, 0)));
    let service = make_service(
        users,
        MockPasswordHasher::new(),
        MockVerificationMailer::new(),
    );
    let filter = DonorFilter {
        blood_group: Some(BloodGroup::ONegative),
        ..DonorFilter::default()
    };
    let page = service.search_donors(filter, 2).await.expect("search");
    assert!(page.items.is_empty());
}

#[test]
fn fixture_donor_is_thirty() {
    let user = donor("age@example.org");
    let today = fixture_now().date_naive();
    assert_eq!(
        crate::domain::eligibility::age(&user, today),
        Some(30),
        "fixture donor born {:?}",
        user.date_of_birth.unwrap_or(NaiveDate::MIN)
    );
}
