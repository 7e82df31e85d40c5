//! Session-related types.
//!
//! The checkout keeps a small amount of per-browser state between requests.
//! It lives in the tower-sessions store under the keys in [`keys`].

use onepage_core::{AddressId, CartId, CustomerId, Email};
use serde::{Deserialize, Serialize};

use super::{AddressFragment, UserPayload};

/// Session-stored customer identity, set by the storefront login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerAccount {
    pub id: CustomerId,
    pub email: Email,
    pub firstname: String,
    pub lastname: String,
    pub default_billing: Option<AddressId>,
    pub default_shipping: Option<AddressId>,
    /// Telephone of the default shipping address.
    pub primary_telephone: Option<String>,
}

/// What the checkout remembers between requests of one browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCheckoutState {
    /// Last `user` payload sent to place-order, used to refill the form.
    pub last_user_payload: Option<UserPayload>,
    /// Location last entered on the form.
    pub last_address: Option<AddressFragment>,
    /// Shipping method last chosen on the form.
    pub last_shipping_method: Option<String>,
}

impl SessionCheckoutState {
    /// Forget the submitted data after a successful placement.
    pub fn clear_submission(&mut self) {
        self.last_user_payload = None;
        self.last_address = None;
    }

    /// Forget everything, as on login or an explicit reset.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True when nothing is remembered.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.last_user_payload.is_none()
            && self.last_address.is_none()
            && self.last_shipping_method.is_none()
    }
}

/// Session keys for checkout data.
pub mod keys {
    /// Key for the logged-in customer (written by the storefront).
    pub const CURRENT_CUSTOMER: &str = "current_customer";

    /// Key for the active cart id (written by the storefront).
    pub const CART_ID: &str = "cart_id";

    /// Key for [`SessionCheckoutState`](super::SessionCheckoutState).
    pub const CHECKOUT_STATE: &str = "checkout_state";
}

/// Read the active cart id from the session.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn cart_id(
    session: &tower_sessions::Session,
) -> Result<Option<CartId>, tower_sessions::session::Error> {
    session.get(keys::CART_ID).await
}

/// Load the checkout state, defaulting to empty.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn load_checkout_state(
    session: &tower_sessions::Session,
) -> Result<SessionCheckoutState, tower_sessions::session::Error> {
    Ok(session
        .get::<SessionCheckoutState>(keys::CHECKOUT_STATE)
        .await?
        .unwrap_or_default())
}

/// Persist the checkout state; an empty state removes the key.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn store_checkout_state(
    session: &tower_sessions::Session,
    state: &SessionCheckoutState,
) -> Result<(), tower_sessions::session::Error> {
    if state.is_empty() {
        session
            .remove::<SessionCheckoutState>(keys::CHECKOUT_STATE)
            .await?;
        return Ok(());
    }
    session.insert(keys::CHECKOUT_STATE, state).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use onepage_core::CountryCode;

    use super::*;

    fn remembered() -> SessionCheckoutState {
        SessionCheckoutState {
            last_user_payload: Some(UserPayload::default()),
            last_address: Some(AddressFragment::new(CountryCode::us())),
            last_shipping_method: Some("flatrate_flatrate".to_string()),
        }
    }

    #[test]
    fn test_clear_submission_keeps_shipping_method() {
        let mut state = remembered();
        state.clear_submission();
        assert!(state.last_user_payload.is_none());
        assert!(state.last_address.is_none());
        assert_eq!(state.last_shipping_method.as_deref(), Some("flatrate_flatrate"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut state = remembered();
        state.reset();
        assert!(state.is_empty());
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let state = remembered();
        let json = serde_json::to_value(&state).unwrap();
        let back: SessionCheckoutState = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }
}
