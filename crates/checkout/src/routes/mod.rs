//! HTTP route handlers for the checkout.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Liveness
//! GET  /health/ready             - Readiness (session database)
//!
//! # Location
//! GET  /checkout/autocomplete    - Location suggestions (fragment)
//! GET  /checkout/regions         - Region select for a country (fragment)
//!
//! # Checkout
//! GET  /checkout/prefill         - Remembered form values (JSON)
//! POST /checkout/update          - Recalculate; JSON of section -> HTML
//! POST /checkout/place           - Place the order (JSON in, JSON out)
//! POST /checkout/verify          - Card verification; JSON {url, html}
//! POST /checkout/reset           - Forget remembered checkout data
//! ```

pub mod checkout;
pub mod location;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/autocomplete", get(location::autocomplete))
        .route("/regions", get(location::regions))
        .route("/prefill", get(checkout::prefill))
        .route("/update", post(checkout::update))
        .route("/place", post(checkout::place))
        .route("/verify", post(checkout::verify))
        .route("/reset", post(checkout::reset))
}

/// Create all routes for the checkout.
pub fn routes() -> Router<AppState> {
    Router::new().nest("/checkout", checkout_routes())
}
