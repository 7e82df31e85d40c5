//! Shipping method auto-selection.

use onepage_core::CartId;

use crate::models::{Address, RateGroups};
use crate::services::{BackendError, RateQuotingService};

/// Rates quoted for an address and the method picked from them, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateSelection {
    pub groups: RateGroups,
    pub assigned: Option<String>,
}

/// The only rate on offer, when there is exactly one carrier with exactly
/// one rate.
#[must_use]
pub fn single_rate_code(groups: &RateGroups) -> Option<&str> {
    let mut carriers = groups.values();
    match (carriers.next(), carriers.next()) {
        (Some(rates), None) if rates.len() == 1 => rates.first().map(|r| r.code.as_str()),
        _ => None,
    }
}

/// Quote rates for `address` and pick the method when there is no choice
/// to make. Otherwise the address keeps whatever method it had.
///
/// # Errors
///
/// Returns an error if the rate quote fails.
pub async fn auto_assign(
    cart_id: CartId,
    address: &mut Address,
    rates: &dyn RateQuotingService,
) -> Result<RateSelection, BackendError> {
    address.collect_shipping_rates = true;
    let groups = rates.quote(cart_id, address).await?;

    let assigned = single_rate_code(&groups).map(String::from);
    if let Some(code) = &assigned {
        tracing::debug!(cart_id = %cart_id, method = %code, "Shipping method auto-assigned");
        address.shipping_method = Some(code.clone());
    }

    Ok(RateSelection { groups, assigned })
}
