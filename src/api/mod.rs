//! API module
//!
//! Thin HTTP surface over the settlement handlers: request bodies map
//! 1:1 onto commands and responses are the handlers' own return values.
//! Authentication, rate limiting, and API documentation live in the
//! gateway in front of this service.

pub mod routes;

pub use routes::{create_router, AppState};
