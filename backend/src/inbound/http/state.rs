//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports (use-cases) and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{AccountCommand, AccountQuery, BloodRequestCommand, BloodRequestQuery};

/// Parameter object bundling the port implementations for HTTP handlers.
#[derive(Clone)]
pub struct HttpStatePorts {
    pub accounts: Arc<dyn AccountCommand>,
    pub accounts_query: Arc<dyn AccountQuery>,
    pub requests: Arc<dyn BloodRequestCommand>,
    pub requests_query: Arc<dyn BloodRequestQuery>,
}

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub accounts: Arc<dyn AccountCommand>,
    pub accounts_query: Arc<dyn AccountQuery>,
    pub requests: Arc<dyn BloodRequestCommand>,
    pub requests_query: Arc<dyn BloodRequestQuery>,
}

impl From<HttpStatePorts> for HttpState {
    fn from(ports: HttpStatePorts) -> Self {
        Self::new(ports)
    }
}

impl HttpState {
    /// Construct state from a ports bundle.
    ///
    /// A single service usually backs both halves of a command/query pair:
    ///
    /// ```no_run
    /// use std::sync::Arc;
    ///
    /// use lifeline::domain::ports::{
    ///     AccountCommand, AccountQuery, BloodRequestCommand, BloodRequestQuery,
    /// };
    /// use lifeline::inbound::http::state::{HttpState, HttpStatePorts};
    ///
    /// fn wire<A, R>(accounts: Arc<A>, requests: Arc<R>) -> HttpState
    /// where
    ///     A: AccountCommand + AccountQuery + 'static,
    ///     R: BloodRequestCommand + BloodRequestQuery + 'static,
    /// {
    ///     HttpState::new(HttpStatePorts {
    ///         accounts: accounts.clone(),
    ///         accounts_query: accounts,
    ///         requests: requests.clone(),
    ///         requests_query: requests,
    ///     })
    /// }
    /// ```
    pub fn new(ports: HttpStatePorts) -> Self {
        let HttpStatePorts {
            accounts,
            accounts_query,
            requests,
            requests_query,
        } = ports;
        Self {
            accounts,
            accounts_query,
            requests,
            requests_query,
        }
    }
}
