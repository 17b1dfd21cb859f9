//! Test helpers for inbound HTTP components.

use std::sync::Arc;

use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::{App, HttpResponse, test as actix_test, web};

use crate::domain::ports::{
    MockAccountCommand, MockAccountQuery, MockBloodRequestCommand, MockBloodRequestQuery,
};
use crate::domain::{Error, UserId};
use crate::inbound::http::error::{json_error_handler, query_error_handler};
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::session_config::SESSION_COOKIE_NAME;
use crate::inbound::http::state::{HttpState, HttpStatePorts};

/// Build a session middleware configured for tests.
///
/// - Generates a fresh signing/encryption key per invocation.
/// - Sets the cookie name to `session` and disables the `Secure` flag for
///   local HTTP tests.
pub fn test_session_middleware() -> SessionMiddleware<CookieSessionStore> {
    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
        .cookie_name(SESSION_COOKIE_NAME.to_owned())
        .cookie_secure(false)
        .build()
}

/// Mocked driving ports. Set expectations, then hand the bundle to
/// [`test_app`].
#[derive(Default)]
pub(crate) struct MockPorts {
    pub accounts: MockAccountCommand,
    pub accounts_query: MockAccountQuery,
    pub requests: MockBloodRequestCommand,
    pub requests_query: MockBloodRequestQuery,
}

impl MockPorts {
    pub(crate) fn into_state(self) -> HttpState {
        HttpState::new(HttpStatePorts {
            accounts: Arc::new(self.accounts),
            accounts_query: Arc::new(self.accounts_query),
            requests: Arc::new(self.requests),
            requests_query: Arc::new(self.requests_query),
        })
    }
}

async fn log_in_as(session: SessionContext, path: web::Path<String>) -> Result<HttpResponse, Error> {
    let user_id = UserId::new(path.into_inner())
        .map_err(|err| Error::invalid_request(err.to_string()))?;
    session.log_in(&user_id)?;
    Ok(HttpResponse::NoContent().finish())
}

/// App with the mocked ports, the JSON error handlers, a test session and
/// the routes registered by `routes` under `/api/v1`.
///
/// `POST /test/login/{user_id}` establishes a session for tests that need an
/// authenticated caller.
pub(crate) fn test_app(
    ports: MockPorts,
    routes: impl FnOnce(&mut web::ServiceConfig),
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(web::Data::new(ports.into_state()))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
        .wrap(test_session_middleware())
        .route("/test/login/{user_id}", web::post().to(log_in_as))
        .service(web::scope("/api/v1").configure(routes))
}

/// Session cookie for `user_id`, obtained through the test login route.
pub(crate) async fn session_cookie_for(
    app: &impl Service<actix_http::Request, Response = ServiceResponse, Error = actix_web::Error>,
    user_id: &UserId,
) -> Cookie<'static> {
    let request = actix_test::TestRequest::post()
        .uri(&format!("/test/login/{user_id}"))
        .to_request();
    let response = actix_test::call_service(app, request).await;
    assert!(response.status().is_success(), "test login failed");
    response
        .response()
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE_NAME)
        .expect("session cookie")
        .into_owned()
}
