//! Location parsing.

use onepage_core::CountryCode;

use super::{LocationQuery, segment, split_segments, with_fixed_country};
use crate::config::{CheckoutSettings, LocationType};
use crate::directory::CountryRegionIndex;
use crate::models::{AddressFragment, non_empty};

/// Location read from one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLocation {
    pub fragment: AddressFragment,
    /// False when the country is only the store default standing in for
    /// a missing or unknown one.
    pub country_given: bool,
}

/// Turns raw location input into an [`AddressFragment`].
///
/// Parsing never fails: unknown countries fall back to the store default
/// and unknown regions stay free text.
#[derive(Debug, Clone, Copy)]
pub struct LocationParser<'a> {
    directory: &'a CountryRegionIndex,
    settings: &'a CheckoutSettings,
}

impl<'a> LocationParser<'a> {
    #[must_use]
    pub const fn new(directory: &'a CountryRegionIndex, settings: &'a CheckoutSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    /// Parse `query` as the given form layout.
    #[must_use]
    pub fn parse(&self, query: &LocationQuery, mode: LocationType) -> ParsedLocation {
        let (mut fragment, country_given) = match mode {
            LocationType::One => self.parse_single(query.value.as_deref().unwrap_or_default()),
            LocationType::Few => self.parse_fields(query),
        };
        self.resolve_region(&mut fragment);
        fragment.postcode = non_empty(query.postcode.clone());
        ParsedLocation {
            fragment,
            country_given: country_given || self.settings.use_only_default_country,
        }
    }

    /// "Country, Region, City" with progressive fill: two segments put the
    /// second into both region and city, a third segment takes over city.
    fn parse_single(&self, raw: &str) -> (AddressFragment, bool) {
        let raw = with_fixed_country(raw, self.directory, self.settings);
        let segments = split_segments(&raw);

        let mut fragment = AddressFragment::new(self.settings.default_country.clone());
        let Some(first) = segment(&segments, 0) else {
            return (fragment, false);
        };

        let mut country_given = false;
        if !self.settings.use_only_default_country
            && let Some(code) = self.directory.country_code_by_name(first)
        {
            fragment.country_id = code.clone();
            country_given = true;
        }

        if let Some(second) = segment(&segments, 1) {
            fragment.region = Some(second.to_string());
            fragment.city = Some(second.to_string());
        }
        if let Some(third) = segment(&segments, 2) {
            fragment.city = Some(third.to_string());
        }

        (fragment, country_given)
    }

    fn parse_fields(&self, query: &LocationQuery) -> (AddressFragment, bool) {
        let given = query
            .country_id
            .as_deref()
            .filter(|_| !self.settings.use_only_default_country)
            .and_then(|raw| CountryCode::parse(raw).ok());
        let country_given = given.is_some();

        let mut fragment =
            AddressFragment::new(given.unwrap_or_else(|| self.settings.default_country.clone()));
        fragment.region = non_empty(query.region.clone());
        fragment.city = non_empty(query.city.clone());
        (fragment, country_given)
    }

    /// Swap a known region name for its id.
    fn resolve_region(&self, fragment: &mut AddressFragment) {
        let Some(region) = fragment.region.as_deref() else {
            return;
        };
        if let Some(region_id) = self
            .directory
            .region_id_by_name(region, &fragment.country_id)
        {
            tracing::debug!(region, %region_id, country = %fragment.country_id, "Region resolved");
            fragment.set_region_id(region_id);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use onepage_core::RegionId;

    use super::*;
    use crate::location::test_support::directory;

    fn single(value: &str) -> LocationQuery {
        LocationQuery {
            value: Some(value.to_string()),
            ..LocationQuery::default()
        }
    }

    fn code(s: &str) -> CountryCode {
        CountryCode::parse(s).unwrap()
    }

    #[test]
    fn test_two_segments_fill_region_and_city() {
        let directory = directory();
        let settings = CheckoutSettings::default();
        let parser = LocationParser::new(&directory, &settings);

        let parsed = parser.parse(&single("Ukraine, Brovary"), LocationType::One);
        assert!(parsed.country_given);
        let fragment = parsed.fragment;
        assert_eq!(fragment.country_id, code("UA"));
        assert_eq!(fragment.region.as_deref(), Some("Brovary"));
        assert_eq!(fragment.city.as_deref(), Some("Brovary"));
        assert!(fragment.region_id.is_none());
    }

    #[test]
    fn test_three_segments_split_region_and_city() {
        let directory = directory();
        let settings = CheckoutSettings::default();
        let parser = LocationParser::new(&directory, &settings);

        let fragment = parser
            .parse(&single("united kingdom, Kent, Canterbury"), LocationType::One)
            .fragment;
        assert_eq!(fragment.country_id, code("GB"));
        assert_eq!(fragment.region.as_deref(), Some("Kent"));
        assert_eq!(fragment.city.as_deref(), Some("Canterbury"));
    }

    #[test]
    fn test_ukraine_kyiv_kyiv_resolves_region() {
        let directory = directory();
        let settings = CheckoutSettings::default();
        let parser = LocationParser::new(&directory, &settings);

        let fragment = parser.parse(&single("Ukraine, Kyiv, Kyiv"), LocationType::One).fragment;
        assert_eq!(fragment.country_id, code("UA"));
        assert_eq!(fragment.region_id, Some(RegionId::new(30)));
        assert!(fragment.region.is_none());
        assert_eq!(fragment.city.as_deref(), Some("Kyiv"));
    }

    #[test]
    fn test_fixed_country_shifts_segments() {
        let directory = directory();
        let settings = CheckoutSettings {
            use_only_default_country: true,
            ..CheckoutSettings::default()
        };
        let parser = LocationParser::new(&directory, &settings);

        let fragment = parser.parse(&single("Boston"), LocationType::One).fragment;
        assert_eq!(fragment.country_id, code("US"));
        assert_eq!(fragment.region.as_deref(), Some("Boston"));
        assert_eq!(fragment.city.as_deref(), Some("Boston"));
    }

    #[test]
    fn test_fixed_country_ignores_country_names() {
        let directory = directory();
        let settings = CheckoutSettings {
            use_only_default_country: true,
            ..CheckoutSettings::default()
        };
        let parser = LocationParser::new(&directory, &settings);

        for input in ["Ukraine, Kyiv", "United Kingdom", "", "Massachusetts, Boston"] {
            let fragment = parser.parse(&single(input), LocationType::One).fragment;
            assert_eq!(fragment.country_id, code("US"), "input {input:?}");
        }

        let fragment = parser.parse(&single("Massachusetts, Boston"), LocationType::One).fragment;
        assert_eq!(fragment.region_id, Some(RegionId::new(32)));
        assert_eq!(fragment.city.as_deref(), Some("Boston"));
    }

    #[test]
    fn test_unknown_country_falls_back_to_default() {
        let directory = directory();
        let settings = CheckoutSettings::default();
        let parser = LocationParser::new(&directory, &settings);

        let parsed = parser.parse(&single("Atlantis, Poseidonia"), LocationType::One);
        assert_eq!(parsed.fragment.country_id, code("US"));
        assert_eq!(parsed.fragment.region.as_deref(), Some("Poseidonia"));
        assert!(!parsed.country_given);

        let empty = parser.parse(&LocationQuery::default(), LocationType::One).fragment;
        assert_eq!(empty.country_id, code("US"));
        assert!(empty.city.is_none());
    }

    #[test]
    fn test_empty_middle_segment_is_absent() {
        let directory = directory();
        let settings = CheckoutSettings::default();
        let parser = LocationParser::new(&directory, &settings);

        let fragment = parser.parse(&single("Ukraine,,Lviv"), LocationType::One).fragment;
        assert!(fragment.region.is_none());
        assert_eq!(fragment.city.as_deref(), Some("Lviv"));
    }

    #[test]
    fn test_fields_mode() {
        let directory = directory();
        let settings = CheckoutSettings::default();
        let parser = LocationParser::new(&directory, &settings);

        let query = LocationQuery {
            value: Some("ignored, in, this mode".to_string()),
            country_id: Some("ua".to_string()),
            region: Some("kyivska".to_string()),
            city: Some("Irpin".to_string()),
            postcode: Some("08200".to_string()),
        };
        let fragment = parser.parse(&query, LocationType::Few).fragment;
        assert_eq!(fragment.country_id, code("UA"));
        assert_eq!(fragment.region_id, Some(RegionId::new(32)));
        assert!(fragment.region.is_none());
        assert_eq!(fragment.city.as_deref(), Some("Irpin"));
        assert_eq!(fragment.postcode.as_deref(), Some("08200"));
    }

    #[test]
    fn test_fields_mode_defaults_country() {
        let directory = directory();
        let mut settings = CheckoutSettings::default();
        let parser = LocationParser::new(&directory, &settings);

        let query = LocationQuery {
            country_id: Some(String::new()),
            region: Some("Nowhere Land".to_string()),
            ..LocationQuery::default()
        };
        let parsed = parser.parse(&query, LocationType::Few);
        assert_eq!(parsed.fragment.country_id, code("US"));
        assert_eq!(parsed.fragment.region.as_deref(), Some("Nowhere Land"));
        assert!(parsed.fragment.region_id.is_none());
        assert!(!parsed.country_given);

        settings.use_only_default_country = true;
        let parser = LocationParser::new(&directory, &settings);
        let query = LocationQuery {
            country_id: Some("UA".to_string()),
            ..LocationQuery::default()
        };
        let parsed = parser.parse(&query, LocationType::Few);
        assert_eq!(parsed.fragment.country_id, code("US"));
        assert!(parsed.country_given);
    }

    #[test]
    fn test_postcode_passes_through() {
        let directory = directory();
        let settings = CheckoutSettings::default();
        let parser = LocationParser::new(&directory, &settings);

        let query = LocationQuery {
            value: Some("United States, New York, Brooklyn".to_string()),
            postcode: Some("11201".to_string()),
            ..LocationQuery::default()
        };
        let fragment = parser.parse(&query, LocationType::One).fragment;
        assert_eq!(fragment.postcode.as_deref(), Some("11201"));
        assert_eq!(fragment.region_id, Some(RegionId::new(43)));
        assert_eq!(fragment.city.as_deref(), Some("Brooklyn"));
    }
}
