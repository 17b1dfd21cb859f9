//! HTTP adapter mapping for domain errors.
//!
//! Purpose: keep the domain error type HTTP-agnostic while allowing Actix
//! handlers to turn domain failures into consistent JSON responses and status
//! codes. Extractor failures (malformed JSON bodies, query strings and path
//! segments) are routed through the same envelope by the handlers in this
//! module.

use actix_web::error::{JsonPayloadError, PathError, QueryPayloadError};
use actix_web::{HttpRequest, HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use tracing::error;

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER, TraceId};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn redact_if_internal(error: &Error) -> Error {
    if matches!(error.code(), ErrorCode::InternalError) {
        let mut redacted = Error::internal("Internal server error");
        if let Some(id) = error.trace_id() {
            redacted = redacted.with_trace_id(id.to_owned());
        }
        redacted
    } else {
        error.clone()
    }
}

/// Attach the request's trace id when the error does not carry one yet.
fn with_current_trace(error: Error) -> Error {
    if error.trace_id().is_some() {
        return error;
    }
    match TraceId::current() {
        Some(id) => error.with_trace_id(id.to_string()),
        None => error,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        let error = with_current_trace(self.clone());
        if matches!(error.code(), ErrorCode::InternalError) {
            error!(message = error.message(), "request failed with internal error");
        }

        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = error.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }

        builder.json(redact_if_internal(&error))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        // Do not leak implementation details to clients.
        error!(error = %err, "actix error promoted to domain error");
        Error::internal("Internal server error")
    }
}

fn payload_error(source: &'static str, reason: String) -> Error {
    Error::invalid_request(format!("invalid {source}")).with_details(json!({
        "source": source,
        "reason": reason,
    }))
}

/// `JsonConfig` error handler: malformed bodies become `400 invalid_request`.
pub fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let error = match err {
        JsonPayloadError::ContentType => Error::invalid_request("expected application/json")
            .with_details(json!({ "source": "body", "reason": "content type" })),
        other => payload_error("body", other.to_string()),
    };
    error.into()
}

/// `QueryConfig` error handler for unparseable query strings.
pub fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    payload_error("query", err.to_string()).into()
}

/// `PathConfig` error handler for unparseable path segments.
pub fn path_error_handler(err: PathError, _req: &HttpRequest) -> actix_web::Error {
    payload_error("path", err.to_string()).into()
}
