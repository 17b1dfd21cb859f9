//! Shared validation helpers for inbound HTTP adapters.
//!
//! Path segments and query strings arrive as text; these helpers turn them
//! into domain values and report failures as `400` errors whose details name
//! the offending field.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::domain::{BloodRequestId, Error, ResponseId, UserId};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    MissingField,
    InvalidUuid,
    InvalidDate,
    InvalidTimestamp,
    InvalidChoice,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::MissingField => "missing_field",
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidDate => "invalid_date",
            ErrorCode::InvalidTimestamp => "invalid_timestamp",
            ErrorCode::InvalidChoice => "invalid_choice",
        }
    }
}

/// Newtype wrapper for HTTP field names to provide type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ErrorCode, value: Option<&str>) -> Error {
    let details = match value {
        Some(value) => json!({
            "field": field.as_str(),
            "value": value,
            "code": code.as_str(),
        }),
        None => json!({
            "field": field.as_str(),
            "code": code.as_str(),
        }),
    };
    Error::invalid_request(message).with_details(details)
}

pub(crate) fn missing_field_error(field: FieldName) -> Error {
    field_error(
        field,
        format!("missing required field: {}", field.as_str()),
        ErrorCode::MissingField,
        None,
    )
}

/// Unwrap a required field.
pub(crate) fn require<T>(value: Option<T>, field: FieldName) -> Result<T, Error> {
    value.ok_or_else(|| missing_field_error(field))
}

fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value.trim()).map_err(|_| {
        field_error(
            field,
            format!("{} must be a valid UUID", field.as_str()),
            ErrorCode::InvalidUuid,
            Some(value),
        )
    })
}

pub(crate) fn parse_request_id(value: &str) -> Result<BloodRequestId, Error> {
    parse_uuid(value, FieldName::new("id")).map(BloodRequestId::from_uuid)
}

pub(crate) fn parse_response_id(value: &str) -> Result<ResponseId, Error> {
    parse_uuid(value, FieldName::new("id")).map(ResponseId::from_uuid)
}

pub(crate) fn parse_user_id(value: &str) -> Result<UserId, Error> {
    parse_uuid(value, FieldName::new("id")).map(UserId::from_uuid)
}

/// Parse one of a closed set of codes, such as a blood group or urgency.
pub(crate) fn parse_choice<T: FromStr>(value: &str, field: FieldName) -> Result<T, Error> {
    value.parse::<T>().map_err(|_| {
        field_error(
            field,
            format!("{} is not a recognised value", field.as_str()),
            ErrorCode::InvalidChoice,
            Some(value),
        )
    })
}

/// Parse an optional code, treating a blank value as absent.
pub(crate) fn parse_optional_choice<T: FromStr>(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<T>, Error> {
    value
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| parse_choice(raw, field))
        .transpose()
}

/// Parse an ISO 8601 calendar date (`YYYY-MM-DD`).
pub(crate) fn parse_date(value: &str, field: FieldName) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        field_error(
            field,
            format!("{} must be a date formatted YYYY-MM-DD", field.as_str()),
            ErrorCode::InvalidDate,
            Some(value),
        )
    })
}

pub(crate) fn parse_optional_date(
    value: Option<&str>,
    field: FieldName,
) -> Result<Option<NaiveDate>, Error> {
    value
        .filter(|raw| !raw.trim().is_empty())
        .map(|raw| parse_date(raw, field))
        .transpose()
}

pub(crate) fn parse_rfc3339_timestamp(
    value: &str,
    field: FieldName,
) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|_| {
            field_error(
                field,
                format!("{} must be an RFC 3339 timestamp", field.as_str()),
                ErrorCode::InvalidTimestamp,
                Some(value),
            )
        })
}

/// `?page=` query parameter shared by every paginated listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number; defaults to the first page.
    pub page: Option<u32>,
}

impl PageQuery {
    /// Requested page, never below 1.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }
}
