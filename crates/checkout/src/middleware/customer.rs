//! Logged-in customer extractor.
//!
//! The storefront writes the customer into the shared session at login;
//! the checkout only reads it.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::set_sentry_user;
use crate::models::{CustomerAccount, session_keys};

/// Extractor for the optional logged-in customer.
///
/// Never rejects: a missing session or an unreadable entry is a guest.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(OptionalCustomer(customer): OptionalCustomer) -> String {
///     customer.map_or_else(|| "guest".to_string(), |c| c.firstname)
/// }
/// ```
pub struct OptionalCustomer(pub Option<CustomerAccount>);

impl<S> FromRequestParts<S> for OptionalCustomer
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self(None));
        };

        let customer = session
            .get::<CustomerAccount>(session_keys::CURRENT_CUSTOMER)
            .await
            .ok()
            .flatten();

        if let Some(account) = &customer {
            set_sentry_user(&account.id, Some(account.email.as_str()));
        }

        Ok(Self(customer))
    }
}
