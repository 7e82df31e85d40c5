//! Address types.

use onepage_core::{AddressId, CountryCode, Email, RegionId};
use serde::{Deserialize, Serialize};

/// The location part of an address.
///
/// `region` and `region_id` are never both set: a region that resolves
/// against the directory keeps only its id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFragment {
    pub country_id: CountryCode,
    pub region: Option<String>,
    pub region_id: Option<RegionId>,
    pub city: Option<String>,
    pub postcode: Option<String>,
}

impl AddressFragment {
    /// A fragment holding only a country.
    #[must_use]
    pub const fn new(country_id: CountryCode) -> Self {
        Self {
            country_id,
            region: None,
            region_id: None,
            city: None,
            postcode: None,
        }
    }

    /// Record a resolved region id, dropping the free text.
    pub fn set_region_id(&mut self, region_id: RegionId) {
        self.region_id = Some(region_id);
        self.region = None;
    }

    /// Record a free-text region, dropping any id.
    pub fn set_region_text(&mut self, region: Option<String>) {
        self.region = non_empty(region);
        self.region_id = None;
    }

    /// True when either half of the region pair is set.
    #[must_use]
    pub fn has_region(&self) -> bool {
        self.region_id.is_some() || self.region.as_deref().is_some_and(|r| !r.trim().is_empty())
    }
}

/// A cart shipping or billing address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Address {
    /// Saved address-book entry this address was taken from.
    pub customer_address_id: Option<AddressId>,
    pub firstname: String,
    pub lastname: String,
    pub street: Vec<String>,
    pub telephone: Option<String>,
    pub email: Option<Email>,
    pub country_id: Option<CountryCode>,
    pub region: Option<String>,
    pub region_id: Option<RegionId>,
    pub city: Option<String>,
    pub postcode: Option<String>,
    pub save_in_address_book: bool,
    pub should_ignore_validation: bool,
    pub shipping_method: Option<String>,
    pub collect_shipping_rates: bool,
}

impl Address {
    /// Overwrite the location fields with `fragment`.
    pub fn apply_fragment(&mut self, fragment: &AddressFragment) {
        self.country_id = Some(fragment.country_id.clone());
        self.region.clone_from(&fragment.region);
        self.region_id = fragment.region_id;
        self.city.clone_from(&fragment.city);
        self.postcode.clone_from(&fragment.postcode);
    }

    /// Copy the location fields from `other`; nothing else is touched.
    pub fn copy_location_from(&mut self, other: &Self) {
        self.country_id.clone_from(&other.country_id);
        self.region.clone_from(&other.region);
        self.region_id = other.region_id;
        self.city.clone_from(&other.city);
        self.postcode.clone_from(&other.postcode);
    }

    /// The location fields as a fragment, if a country is set.
    #[must_use]
    pub fn fragment(&self) -> Option<AddressFragment> {
        Some(AddressFragment {
            country_id: self.country_id.clone()?,
            region: self.region.clone(),
            region_id: self.region_id,
            city: self.city.clone(),
            postcode: self.postcode.clone(),
        })
    }
}

/// `Some` only for a value with visible content, trimmed.
#[must_use]
pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn kyiv() -> AddressFragment {
        AddressFragment {
            country_id: CountryCode::parse("UA").unwrap(),
            region: None,
            region_id: Some(RegionId::new(7)),
            city: Some("Kyiv".to_string()),
            postcode: Some("01001".to_string()),
        }
    }

    #[test]
    fn test_region_pair_is_exclusive() {
        let mut fragment = kyiv();
        fragment.set_region_text(Some("Kyivska".to_string()));
        assert_eq!(fragment.region.as_deref(), Some("Kyivska"));
        assert!(fragment.region_id.is_none());

        fragment.set_region_id(RegionId::new(3));
        assert!(fragment.region.is_none());
        assert_eq!(fragment.region_id, Some(RegionId::new(3)));
    }

    #[test]
    fn test_copy_location_leaves_contact_fields() {
        let mut shipping = Address::default();
        shipping.apply_fragment(&kyiv());
        shipping.firstname = "Olena".to_string();

        let mut billing = Address {
            firstname: "Taras".to_string(),
            telephone: Some("+380441234567".to_string()),
            ..Address::default()
        };
        billing.copy_location_from(&shipping);

        assert_eq!(billing.city.as_deref(), Some("Kyiv"));
        assert_eq!(billing.region_id, Some(RegionId::new(7)));
        assert_eq!(billing.postcode.as_deref(), Some("01001"));
        assert_eq!(billing.firstname, "Taras");
        assert_eq!(billing.telephone.as_deref(), Some("+380441234567"));
    }

    #[test]
    fn test_fragment_requires_country() {
        assert!(Address::default().fragment().is_none());
        let mut address = Address::default();
        address.apply_fragment(&kyiv());
        assert_eq!(address.fragment(), Some(kyiv()));
    }

    #[test]
    fn test_non_empty_trims() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" Lviv ".to_string())), Some("Lviv".to_string()));
        assert_eq!(non_empty(None), None);
    }
}
