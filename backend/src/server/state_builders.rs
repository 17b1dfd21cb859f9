//! Wire repositories, services and adapters into handler state.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};

use lifeline::domain::ports::{
    BloodRequestCommand, BloodRequestRepository, ResponseRepository, UserRepository,
};
use lifeline::domain::{AccountService, BloodRequestService};
use lifeline::inbound::http::health::StorageBackend;
use lifeline::inbound::http::state::{HttpState, HttpStatePorts};
use lifeline::outbound::mail::LoggingMailer;
use lifeline::outbound::memory::InMemoryStore;
use lifeline::outbound::persistence::{
    DbPool, DieselBloodRequestRepository, DieselResponseRepository, DieselUserRepository,
};
use lifeline::outbound::security::Argon2PasswordHasher;

use super::ServerSettings;

/// Everything the server needs from the domain side.
pub(crate) struct AppServices {
    pub http_state: HttpState,
    /// Handle used by the background expiry sweep.
    pub sweeper: Arc<dyn BloodRequestCommand>,
    pub storage: StorageBackend,
}

/// Build services over PostgreSQL when a pool is supplied, otherwise over a
/// fresh in-memory store.
pub(crate) fn build_services(settings: &ServerSettings, pool: Option<DbPool>) -> AppServices {
    match pool {
        Some(pool) => assemble(
            settings,
            Arc::new(DieselUserRepository::new(pool.clone())),
            Arc::new(DieselBloodRequestRepository::new(pool.clone())),
            Arc::new(DieselResponseRepository::new(pool)),
            StorageBackend::Postgres,
        ),
        None => {
            let store = Arc::new(InMemoryStore::new());
            assemble(
                settings,
                store.clone(),
                store.clone(),
                store,
                StorageBackend::Memory,
            )
        }
    }
}

fn assemble<U, R, S>(
    settings: &ServerSettings,
    users: Arc<U>,
    requests: Arc<R>,
    responses: Arc<S>,
    storage: StorageBackend,
) -> AppServices
where
    U: UserRepository + 'static,
    R: BloodRequestRepository + 'static,
    S: ResponseRepository + 'static,
{
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let accounts = Arc::new(AccountService::new(
        users.clone(),
        Arc::new(Argon2PasswordHasher::new()),
        Arc::new(LoggingMailer::new(settings.mail_from())),
        clock.clone(),
        settings.public_base_url(),
    ));
    let blood_requests = Arc::new(BloodRequestService::new(users, requests, responses, clock));
    AppServices {
        http_state: HttpState::new(HttpStatePorts {
            accounts: accounts.clone(),
            accounts_query: accounts,
            requests: blood_requests.clone(),
            requests_query: blood_requests.clone(),
        }),
        sweeper: blood_requests,
        storage,
    }
}
