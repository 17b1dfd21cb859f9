//! Account API handlers: sign-up, email verification and login.
//!
//! ```text
//! POST /api/v1/register {"email":"ada@example.org", ...}
//! GET /api/v1/verify-email/{token}
//! POST /api/v1/login {"email":"ada@example.org","password":"..."}
//! POST /api/v1/logout
//! GET /api/v1/email-availability?email=ada@example.org
//! ```

use actix_web::{HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use zeroize::Zeroizing;

use crate::domain::ports::VerificationOutcome;
use crate::domain::{
    Error, LoginCredentials, LoginValidationError, RegistrationForm, VerificationToken,
};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, parse_optional_choice, parse_optional_date};

/// Sign-up form for `POST /api/v1/register`.
///
/// Blank or missing fields are reported by the account service with the
/// offending field named in `details.field`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    /// `YYYY-MM-DD`.
    pub date_of_birth: Option<String>,
    /// `M`, `F` or `O`.
    pub gender: Option<String>,
    /// One of `A+ A- B+ B- AB+ AB- O+ O-`.
    pub blood_group: Option<String>,
    pub city: String,
    pub weight_kg: Option<f64>,
    pub terms_accepted: bool,
    pub password: String,
    pub password_confirmation: String,
}

impl TryFrom<RegisterRequest> for RegistrationForm {
    type Error = Error;

    fn try_from(value: RegisterRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            date_of_birth: parse_optional_date(
                value.date_of_birth.as_deref(),
                FieldName::new("dateOfBirth"),
            )?,
            gender: parse_optional_choice(value.gender.as_deref(), FieldName::new("gender"))?,
            blood_group: parse_optional_choice(
                value.blood_group.as_deref(),
                FieldName::new("bloodGroup"),
            )?,
            email: value.email,
            first_name: value.first_name,
            last_name: value.last_name,
            phone_number: value.phone_number,
            city: value.city,
            weight_kg: value.weight_kg,
            terms_accepted: value.terms_accepted,
            password: Zeroizing::new(value.password),
            password_confirmation: Zeroizing::new(value.password_confirmation),
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: String,
    /// False when the verification email could not be sent; the account
    /// still exists.
    pub email_sent: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailResponse {
    /// `verified` or `already_verified`.
    pub status: &'static str,
}

impl From<VerificationOutcome> for VerifyEmailResponse {
    fn from(outcome: VerificationOutcome) -> Self {
        let status = match outcome {
            VerificationOutcome::Verified => "verified",
            VerificationOutcome::AlreadyVerified => "already_verified",
        };
        Self { status }
    }
}

/// Login request body for `POST /api/v1/login`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl TryFrom<LoginRequest> for LoginCredentials {
    type Error = LoginValidationError;

    fn try_from(value: LoginRequest) -> Result<Self, Self::Error> {
        Self::try_from_parts(&value.email, &value.password)
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EmailAvailabilityQuery {
    pub email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EmailAvailabilityResponse {
    pub available: bool,
}

fn map_login_validation_error(err: LoginValidationError) -> Error {
    match err {
        LoginValidationError::EmptyEmail => Error::invalid_request("email must not be empty")
            .with_details(json!({ "field": "email", "code": "required" })),
        LoginValidationError::EmptyPassword => Error::invalid_request("password must not be empty")
            .with_details(json!({ "field": "password", "code": "required" })),
    }
}

/// Create an unverified account and send the verification email.
#[utoipa::path(
    post,
    path = "/api/v1/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 409, description = "Email already registered", body = Error),
        (status = 503, description = "Service unavailable", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "register",
    security([])
)]
#[post("/register")]
pub async fn register(
    state: web::Data<HttpState>,
    payload: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let form = RegistrationForm::try_from(payload.into_inner())?;
    let outcome = state.accounts.register(form).await?;
    Ok(HttpResponse::Created().json(RegisterResponse {
        user_id: outcome.user_id.to_string(),
        email_sent: outcome.email_sent,
    }))
}

/// Confirm ownership of an email address.
#[utoipa::path(
    get,
    path = "/api/v1/verify-email/{token}",
    params(("token" = String, Path, description = "Verification token from the email")),
    responses(
        (status = 200, description = "Email verified", body = VerifyEmailResponse),
        (status = 404, description = "Unknown token", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "verifyEmail",
    security([])
)]
#[get("/verify-email/{token}")]
pub async fn verify_email(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<VerifyEmailResponse>> {
    let token = path
        .into_inner()
        .parse::<VerificationToken>()
        .map_err(|_| Error::not_found("Invalid verification token."))?;
    let outcome = state.accounts.verify_email(token).await?;
    Ok(web::Json(outcome.into()))
}

/// Authenticate and establish a session.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login success", body = LoginResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Invalid credentials", body = Error),
        (status = 403, description = "Inactive or unverified account", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "login",
    security([])
)]
#[post("/login")]
pub async fn login(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<LoginRequest>,
) -> ApiResult<web::Json<LoginResponse>> {
    let credentials =
        LoginCredentials::try_from(payload.into_inner()).map_err(map_login_validation_error)?;
    let user_id = state.accounts.authenticate(&credentials).await?;
    session.log_in(&user_id)?;
    Ok(web::Json(LoginResponse {
        user_id: user_id.to_string(),
    }))
}

/// End the current session.
#[utoipa::path(
    post,
    path = "/api/v1/logout",
    responses((status = 204, description = "Session cleared")),
    tags = ["accounts"],
    operation_id = "logout",
    security([])
)]
#[post("/logout")]
pub async fn logout(session: SessionContext) -> HttpResponse {
    session.log_out();
    HttpResponse::NoContent().finish()
}

/// Check whether an email address is still free.
#[utoipa::path(
    get,
    path = "/api/v1/email-availability",
    params(EmailAvailabilityQuery),
    responses(
        (status = 200, description = "Availability", body = EmailAvailabilityResponse),
        (status = 400, description = "Invalid request", body = Error)
    ),
    tags = ["accounts"],
    operation_id = "emailAvailability",
    security([])
)]
#[get("/email-availability")]
pub async fn email_availability(
    state: web::Data<HttpState>,
    query: web::Query<EmailAvailabilityQuery>,
) -> ApiResult<web::Json<EmailAvailabilityResponse>> {
    let email = query.into_inner().email.unwrap_or_default();
    let available = state.accounts_query.email_available(&email).await?;
    Ok(web::Json(EmailAvailabilityResponse { available }))
}

#[cfg(test)]
#[path = "accounts_tests.rs"]
mod tests;
