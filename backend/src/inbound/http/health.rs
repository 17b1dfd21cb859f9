//! Liveness and readiness probes, mounted outside `/api/v1`.

use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, http::header, web};
use serde::Serialize;
use utoipa::ToSchema;

/// Which store backs the running server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Probe state shared with the server lifecycle.
///
/// Starts live but not ready; `main` flips readiness once migrations have
/// run and the listener is bound, and clears liveness while draining.
#[derive(Debug)]
pub struct HealthState {
    ready: AtomicBool,
    live: AtomicBool,
    storage: StorageBackend,
}

impl HealthState {
    pub fn new(storage: StorageBackend) -> Self {
        Self {
            ready: AtomicBool::new(false),
            live: AtomicBool::new(true),
            storage,
        }
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn mark_draining(&self) {
        self.live.store(false, Ordering::Release);
        self.ready.store(false, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn is_alive(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn storage(&self) -> StorageBackend {
        self.storage
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResponse {
    /// `ok` or `unavailable`.
    pub status: &'static str,
    pub storage: StorageBackend,
}

fn probe(ok: bool, storage: StorageBackend) -> HttpResponse {
    let mut response = if ok {
        HttpResponse::Ok()
    } else {
        HttpResponse::ServiceUnavailable()
    };
    response
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(ProbeResponse {
            status: if ok { "ok" } else { "unavailable" },
            storage,
        })
}

/// 200 once start-up has finished, 503 before that and while draining.
#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Ready for traffic", body = ProbeResponse),
        (status = 503, description = "Not ready", body = ProbeResponse)
    ),
    tags = ["health"],
    operation_id = "ready",
    security([])
)]
#[get("/health/ready")]
pub async fn ready(state: web::Data<HealthState>) -> HttpResponse {
    probe(state.is_ready(), state.storage())
}

/// 200 until shutdown begins.
#[utoipa::path(
    get,
    path = "/health/live",
    responses(
        (status = 200, description = "Alive", body = ProbeResponse),
        (status = 503, description = "Shutting down", body = ProbeResponse)
    ),
    tags = ["health"],
    operation_id = "live",
    security([])
)]
#[get("/health/live")]
pub async fn live(state: web::Data<HealthState>) -> HttpResponse {
    probe(state.is_alive(), state.storage())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use serde_json::Value;

    async fn call(state: web::Data<HealthState>, uri: &str) -> (StatusCode, Option<String>, Value) {
        let app = actix_test::init_service(
            App::new().app_data(state).service(ready).service(live),
        )
        .await;
        let response =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request())
                .await;
        let status = response.status();
        let cache = response
            .headers()
            .get(header::CACHE_CONTROL)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let body: Value = actix_test::read_body_json(response).await;
        (status, cache, body)
    }

    #[actix_web::test]
    async fn readiness_waits_for_start_up() {
        let state = web::Data::new(HealthState::new(StorageBackend::Memory));

        let (status, cache, body) = call(state.clone(), "/health/ready").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(cache.as_deref(), Some("no-store"));
        assert_eq!(body["status"], "unavailable");

        state.mark_ready();
        let (status, _, body) = call(state, "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage"], "memory");
    }

    #[rstest]
    #[case("/health/live")]
    #[case("/health/ready")]
    #[actix_web::test]
    async fn draining_fails_both_probes(#[case] uri: &str) {
        let state = web::Data::new(HealthState::new(StorageBackend::Postgres));
        state.mark_ready();
        state.mark_draining();

        let (status, _, body) = call(state, uri).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["storage"], "postgres");
    }

    #[actix_web::test]
    async fn liveness_holds_before_readiness() {
        let state = web::Data::new(HealthState::new(StorageBackend::Memory));

        let (status, _, body) = call(state, "/health/live").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
