//! Profile API handlers.
//!
//! ```text
//! GET /api/v1/profile
//! PUT /api/v1/profile {"firstName":"Ada", ...}
//! GET /api/v1/profile/{id}
//! PUT /api/v1/profile/settings {"privacyLevel":"DONORS_ONLY", ...}
//! POST /api/v1/profile/availability {"available":false}
//! ```

use actix_web::{get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::ProfileView;
use crate::domain::{EmergencyContact, Error, ProfileChanges, SettingsChanges};
use crate::inbound::http::ApiResult;
use crate::inbound::http::dto::{ProfileResponse, UserResponse};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_optional_choice, parse_optional_date, parse_user_id,
};

/// Editable account fields for `PUT /api/v1/profile`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileUpdateRequest {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub weight_kg: Option<f64>,
    pub address: String,
    pub last_donation_date: Option<String>,
    pub medical_conditions: String,
    pub is_available_for_donation: bool,
}

impl TryFrom<ProfileUpdateRequest> for ProfileChanges {
    type Error = Error;

    fn try_from(value: ProfileUpdateRequest) -> Result<Self, Self::Error> {
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
            last_donation_date: parse_optional_date(
                value.last_donation_date.as_deref(),
                FieldName::new("lastDonationDate"),
            )?,
            first_name: value.first_name,
            last_name: value.last_name,
            phone_number: value.phone_number,
            weight_kg: value.weight_kg,
            address: value.address,
            medical_conditions: value.medical_conditions,
            is_available_for_donation: value.is_available_for_donation,
        })
    }
}

/// Body for `PUT /api/v1/profile/settings`.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsRequest {
    pub emergency_contact: EmergencyContact,
    pub email_notifications: bool,
    pub sms_notifications: bool,
    /// `PUBLIC`, `DONORS_ONLY` or `PRIVATE`; defaults to `PUBLIC`.
    pub privacy_level: Option<String>,
}

impl TryFrom<SettingsRequest> for SettingsChanges {
    type Error = Error;

    fn try_from(value: SettingsRequest) -> Result<Self, Self::Error> {
        let privacy_level = parse_optional_choice(
            value.privacy_level.as_deref(),
            FieldName::new("privacyLevel"),
        )?
        .unwrap_or_default();
        Ok(Self {
            emergency_contact: value.emergency_contact,
            email_notifications: value.email_notifications,
            sms_notifications: value.sms_notifications,
            privacy_level,
        })
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityRequest {
    pub available: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub is_available_for_donation: bool,
}

/// A user's profile as seen by the caller.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProfileViewResponse {
    pub user: UserResponse,
    pub profile: ProfileResponse,
    /// Whole years; absent without a date of birth.
    pub age: Option<i32>,
    pub can_donate: bool,
    pub is_eligible: bool,
    pub is_own: bool,
}

impl From<ProfileView> for ProfileViewResponse {
    fn from(view: ProfileView) -> Self {
        Self {
            user: view.user.into(),
            profile: view.profile.into(),
            age: view.age,
            can_donate: view.can_donate,
            is_eligible: view.is_eligible,
            is_own: view.is_own,
        }
    }
}

/// The caller's own profile.
#[utoipa::path(
    get,
    path = "/api/v1/profile",
    responses(
        (status = 200, description = "Own profile", body = ProfileViewResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["profile"],
    operation_id = "getOwnProfile"
)]
#[get("/profile")]
pub async fn own_profile(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<ProfileViewResponse>> {
    let user_id = session.require_user_id()?;
    let view = state.accounts_query.profile(&user_id, &user_id).await?;
    Ok(web::Json(view.into()))
}

/// Edit the caller's account details.
#[utoipa::path(
    put,
    path = "/api/v1/profile",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated account", body = UserResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["profile"],
    operation_id = "updateProfile"
)]
#[put("/profile")]
pub async fn update_profile(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<ProfileUpdateRequest>,
) -> ApiResult<web::Json<UserResponse>> {
    let user_id = session.require_user_id()?;
    let changes = ProfileChanges::try_from(payload.into_inner())?;
    let user = state.accounts.update_profile(&user_id, changes).await?;
    Ok(web::Json(user.into()))
}

/// Another user's profile, subject to their privacy level.
#[utoipa::path(
    get,
    path = "/api/v1/profile/{id}",
    params(("id" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Profile", body = ProfileViewResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found or not visible", body = Error)
    ),
    tags = ["profile"],
    operation_id = "getProfile"
)]
#[get("/profile/{id}")]
pub async fn view_profile(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<ProfileViewResponse>> {
    let viewer = session.require_user_id()?;
    let subject = parse_user_id(&path.into_inner())?;
    let view = state.accounts_query.profile(&viewer, &subject).await?;
    Ok(web::Json(view.into()))
}

/// Update emergency contact, notification and privacy settings.
#[utoipa::path(
    put,
    path = "/api/v1/profile/settings",
    request_body = SettingsRequest,
    responses(
        (status = 200, description = "Updated settings", body = ProfileResponse),
        (status = 400, description = "Invalid request", body = Error),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["profile"],
    operation_id = "updateSettings"
)]
#[put("/profile/settings")]
pub async fn update_settings(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SettingsRequest>,
) -> ApiResult<web::Json<ProfileResponse>> {
    let user_id = session.require_user_id()?;
    let changes = SettingsChanges::try_from(payload.into_inner())?;
    let profile = state.accounts.update_settings(&user_id, changes).await?;
    Ok(web::Json(profile.into()))
}

/// Switch donation availability on or off.
#[utoipa::path(
    post,
    path = "/api/v1/profile/availability",
    request_body = AvailabilityRequest,
    responses(
        (status = 200, description = "New availability", body = AvailabilityResponse),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["profile"],
    operation_id = "setAvailability"
)]
#[post("/profile/availability")]
pub async fn set_availability(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<AvailabilityRequest>,
) -> ApiResult<web::Json<AvailabilityResponse>> {
    let user_id = session.require_user_id()?;
    let is_available_for_donation = state
        .accounts
        .set_availability(&user_id, payload.available)
        .await?;
    Ok(web::Json(AvailabilityResponse {
        is_available_for_donation,
    }))
}

#[cfg(test)]
#[path = "profile_tests.rs"]
mod tests;
