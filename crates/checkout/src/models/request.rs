//! Inbound checkout payloads.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /checkout/place`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceOrderRequest {
    pub user: Option<UserPayload>,
    #[serde(default)]
    pub payment: PaymentInput,
    pub shipping_method: Option<String>,
    /// Accepted terms, keyed by agreement id.
    #[serde(default)]
    pub agreement: BTreeMap<String, String>,
    #[serde(default)]
    pub subscribe: bool,
}

/// The `user` section of a place-order request.
///
/// Kept in the session to refill the form, minus the password.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPayload {
    #[serde(default)]
    pub address: AddressInput,
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    pub note: Option<String>,
}

/// Address fields as the form posts them.
///
/// Everything is optional text; parsing happens in [`crate::location`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressInput {
    /// Saved address-book entry chosen by a logged-in customer.
    pub id: Option<String>,
    /// Single-field "Country, Region, City" text.
    pub location: Option<String>,
    pub country_id: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub street: Vec<String>,
    pub telephone: Option<String>,
}

/// The `payment` section, forwarded to the payment collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentInput {
    pub method: Option<String>,
    #[serde(flatten)]
    pub additional: BTreeMap<String, serde_json::Value>,
}
