//! Session middleware configuration.
//!
//! Sessions are shared with the storefront that owns login and the cart, so
//! the cookie name and store must match its settings.

use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

use crate::config::CheckoutConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "onepage_session";

/// Sessions idle for longer than this expire (2 days).
const SESSION_IDLE_SECONDS: i64 = 2 * 24 * 60 * 60;

/// Create the session layer backed by `PostgreSQL`.
///
/// The session table must exist; see `onepage-cli migrate sessions`.
#[must_use]
pub fn create_session_layer(
    pool: &PgPool,
    config: &CheckoutConfig,
) -> SessionManagerLayer<PostgresStore> {
    let store = PostgresStore::new(pool.clone());
    let is_secure = config.base_url.starts_with("https://");

    SessionManagerLayer::new(store)
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_IDLE_SECONDS),
        ))
        .with_secure(is_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
