//! HTTP middleware stack for the checkout.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (reuse or generate `x-request-id`)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)

pub mod customer;
pub mod request_id;
pub mod session;

pub use customer::OptionalCustomer;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
