//! Location input handling.
//!
//! Buyers type their location either into one free-text field
//! ("Country, Region, City") or into discrete fields. [`LocationParser`]
//! turns either form into an [`AddressFragment`]; [`LocationMatcher`]
//! suggests completions for the free-text field.

mod matcher;
mod parser;

pub use matcher::LocationMatcher;
pub use parser::{LocationParser, ParsedLocation};

use crate::config::CheckoutSettings;
use crate::directory::CountryRegionIndex;
use crate::models::{AddressFragment, AddressInput};

/// Raw location input of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationQuery {
    /// Single-field text.
    pub value: Option<String>,
    pub country_id: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub postcode: Option<String>,
}

impl From<&AddressInput> for LocationQuery {
    fn from(input: &AddressInput) -> Self {
        Self {
            value: input.location.clone(),
            country_id: input.country_id.clone(),
            region: input.region.clone(),
            city: input.city.clone(),
            postcode: input.postcode.clone(),
        }
    }
}

impl LocationQuery {
    /// True when the request carried no location at all.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        [
            &self.value,
            &self.country_id,
            &self.region,
            &self.city,
            &self.postcode,
        ]
        .iter()
        .all(|field| field.as_deref().is_none_or(|v| v.trim().is_empty()))
    }
}

/// Split on commas and trim each segment, keeping positions.
#[must_use]
pub fn split_segments(raw: &str) -> Vec<&str> {
    raw.split(',').map(str::trim).collect()
}

/// Segment `index`, if present and non-empty.
fn segment<'a>(segments: &[&'a str], index: usize) -> Option<&'a str> {
    segments.get(index).copied().filter(|s| !s.is_empty())
}

/// Prefix the store country when checkout is restricted to it.
///
/// The prefix is the country's display name so that autocomplete, which
/// matches names, searches that country's regions.
#[must_use]
pub fn with_fixed_country(
    raw: &str,
    directory: &CountryRegionIndex,
    settings: &CheckoutSettings,
) -> String {
    if !settings.use_only_default_country {
        return raw.to_string();
    }
    let country = directory
        .country_name(&settings.default_country)
        .unwrap_or_else(|| settings.default_country.as_str());
    format!("{country},{raw}")
}

/// Display text for the single location field: "Country, Region, City".
///
/// The country is left out when checkout is restricted to one country.
#[must_use]
pub fn location_label(
    fragment: &AddressFragment,
    directory: &CountryRegionIndex,
    settings: &CheckoutSettings,
) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);

    if !settings.use_only_default_country {
        parts.push(
            directory
                .country_name(&fragment.country_id)
                .unwrap_or_else(|| fragment.country_id.as_str()),
        );
    }

    let region = fragment
        .region_id
        .and_then(|id| directory.region(&fragment.country_id, id))
        .map(crate::directory::Region::label)
        .or(fragment.region.as_deref());
    parts.extend(region.filter(|r| !r.is_empty()));
    parts.extend(fragment.city.as_deref().filter(|c| !c.is_empty()));

    parts.join(", ")
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::directory::CountryRegionIndex;

    /// A small directory shared by the location tests.
    pub fn directory() -> CountryRegionIndex {
        CountryRegionIndex::from_json_str(
            r#"{"countries": [
                {"code": "AE", "name": "United Arab Emirates"},
                {"code": "UA", "name": "Ukraine", "regions": [
                    {"region_id": 30, "default_name": "Kyiv"},
                    {"region_id": 32, "default_name": "Kyiv Oblast", "name": "Kyivska"},
                    {"region_id": 46, "default_name": "Lviv Oblast"}
                ]},
                {"code": "GB", "name": "United Kingdom"},
                {"code": "US", "name": "United States", "regions": [
                    {"region_id": 12, "default_name": "California"},
                    {"region_id": 32, "default_name": "Massachusetts"},
                    {"region_id": 33, "default_name": "Michigan"},
                    {"region_id": 43, "default_name": "New York"}
                ]}
            ]}"#,
        )
        .expect("test directory is valid")
    }
}
