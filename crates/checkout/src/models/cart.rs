//! Cart (quote) as seen by the checkout.

use std::collections::BTreeMap;

use onepage_core::{CartId, CheckoutMethod, Money};
use serde::{Deserialize, Serialize};

use super::Address;

/// An in-progress order owned by the commerce backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub items_count: u32,
    /// Set by the backend when an item fails stock or option checks.
    #[serde(default)]
    pub has_error: bool,
    #[serde(default)]
    pub is_multi_shipping: bool,
    /// Digital-only cart; no shipment.
    #[serde(default)]
    pub is_virtual: bool,
    pub is_active: bool,
    pub checkout_method: Option<CheckoutMethod>,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub totals: CartTotals,
    /// Cleared to force the next totals collection.
    #[serde(default)]
    pub totals_collected: bool,
}

impl Cart {
    /// True when the cart holds at least one item.
    #[must_use]
    pub const fn has_items(&self) -> bool {
        self.items_count > 0
    }
}

/// Cart totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartTotals {
    pub subtotal: Money,
    #[serde(default)]
    pub shipping: Money,
    #[serde(default)]
    pub discount: Money,
    pub grand_total: Money,
}

/// One shipping option offered by a carrier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRate {
    /// Method code submitted back as `shipping_method`, e.g. `flatrate_flatrate`.
    pub code: String,
    pub carrier_title: String,
    pub method_title: String,
    pub price: Money,
}

/// Shipping rates grouped by carrier code.
pub type RateGroups = BTreeMap<String, Vec<ShippingRate>>;

/// A payment method available to the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub code: String,
    pub title: String,
}
