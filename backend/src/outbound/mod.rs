//! Outbound adapters implementing the driven ports.
//!
//! - `persistence`: PostgreSQL repositories on Diesel and a bb8 pool.
//! - `memory`: process-local store used without a database and in tests.
//! - `security`: Argon2id password hashing.
//! - `mail`: verification mailers.
//!
//! Adapters translate between domain types and infrastructure; they hold no
//! business rules.

pub mod mail;
pub mod memory;
pub mod persistence;
pub mod security;
