//! LifeLine backend: donor accounts, blood requests and donor matching.
//!
//! The crate follows a hexagonal layout. [`domain`] owns the rules and the
//! ports; [`inbound`] adapts HTTP onto them; [`outbound`] implements the
//! ports over PostgreSQL, memory, hashing and mail.

pub mod doc;
pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;

/// Public OpenAPI surface used by Swagger UI and tooling.
pub use doc::ApiDoc;
pub use domain::TraceId;
pub use middleware::Trace;
