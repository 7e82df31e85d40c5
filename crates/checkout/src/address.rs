//! Address resolution.
//!
//! Combines the location parsed from the current request with what the
//! session remembers and the store defaults, then writes the result onto the
//! cart's shipping address and mirrors the location onto billing.

use crate::config::CheckoutSettings;
use crate::location::ParsedLocation;
use crate::models::{AddressFragment, Cart, SessionCheckoutState, non_empty};

/// Merges request, session and default locations.
#[derive(Debug, Clone, Copy)]
pub struct AddressResolver<'a> {
    settings: &'a CheckoutSettings,
}

impl<'a> AddressResolver<'a> {
    #[must_use]
    pub const fn new(settings: &'a CheckoutSettings) -> Self {
        Self { settings }
    }

    /// Resolve each field independently: request, then session, then default.
    ///
    /// The request only decides the country when it actually named one. The
    /// region pair is taken from the first source in the resolved country
    /// that has either half, so a region id never travels with another
    /// source's free text or into another country.
    #[must_use]
    pub fn resolve(
        &self,
        parsed: Option<&ParsedLocation>,
        session: &SessionCheckoutState,
    ) -> AddressFragment {
        let remembered = session.last_address.as_ref();
        let sources: Vec<&AddressFragment> = parsed
            .map(|p| &p.fragment)
            .into_iter()
            .chain(remembered)
            .collect();

        let country_id = parsed
            .filter(|p| p.country_given)
            .map(|p| &p.fragment.country_id)
            .or_else(|| remembered.map(|f| &f.country_id))
            .unwrap_or(&self.settings.default_country)
            .clone();

        let mut fragment = AddressFragment::new(country_id);

        let in_country = sources
            .iter()
            .find(|f| f.country_id == fragment.country_id && f.has_region());
        match in_country {
            Some(source) => match source.region_id {
                Some(id) => fragment.set_region_id(id),
                None => fragment.set_region_text(non_empty(source.region.clone())),
            },
            None if fragment.country_id == self.settings.default_country => {
                fragment.set_region_text(non_empty(self.settings.default_region.clone()));
            }
            None => {}
        }

        fragment.city = first_present(&sources, |f| f.city.clone())
            .or_else(|| non_empty(self.settings.default_city.clone()));
        fragment.postcode = first_present(&sources, |f| f.postcode.clone());

        fragment
    }

    /// Write `fragment` to the cart's shipping address and copy the location
    /// onto billing. A remembered shipping method is restored.
    pub fn apply(&self, fragment: &AddressFragment, session: &SessionCheckoutState, cart: &mut Cart) {
        let shipping = &mut cart.shipping_address;
        shipping.apply_fragment(fragment);

        if let Some(method) = session.last_shipping_method.as_deref().filter(|m| !m.is_empty()) {
            shipping.shipping_method = Some(method.to_string());
            shipping.collect_shipping_rates = true;
        }

        let shipping = cart.shipping_address.clone();
        cart.billing_address.copy_location_from(&shipping);

        tracing::debug!(
            cart_id = %cart.id,
            country = %fragment.country_id,
            region_id = ?fragment.region_id,
            "Address applied"
        );
    }
}

fn first_present(
    sources: &[&AddressFragment],
    field: impl Fn(&AddressFragment) -> Option<String>,
) -> Option<String> {
    sources.iter().find_map(|f| non_empty(field(f)))
}
