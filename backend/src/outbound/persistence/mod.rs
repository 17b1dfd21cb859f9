//! PostgreSQL adapters for the repository ports.
//!
//! Repositories only translate between Diesel rows and domain types. Row
//! structs (`models`) and table definitions (`schema`) never leave this
//! module, and every Diesel or pool failure is classified by
//! `error_mapping` before it reaches a port error.
//!
//! ```no_run
//! use lifeline::outbound::persistence::{DbPool, DieselUserRepository, PoolConfig};
//!
//! # async fn wire() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/lifeline")).await?;
//! let _users = DieselUserRepository::new(pool);
//! # Ok(())
//! # }
//! ```

mod diesel_blood_request_repository;
mod diesel_response_repository;
mod diesel_user_repository;
mod error_mapping;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_blood_request_repository::DieselBloodRequestRepository;
pub use diesel_response_repository::DieselResponseRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use migrations::{MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
