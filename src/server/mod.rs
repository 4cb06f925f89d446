//! HTTP surface: shared state, router, request guards and route handlers.

pub mod guards;
pub mod openapi;
pub mod rate_limit;
pub mod router;
pub mod routes;

pub use router::{AppState, app_router};
