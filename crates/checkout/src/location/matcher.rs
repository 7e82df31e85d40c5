//! Autocomplete for the single location field.

use onepage_core::CountryCode;

use super::{segment, split_segments, with_fixed_country};
use crate::config::CheckoutSettings;
use crate::directory::CountryRegionIndex;

/// Suggests labels for a partially typed "Country, Region, City".
///
/// Matching runs in stages and stops at the first stage that finds
/// anything: countries, then regions of one country, then cities.
/// Results keep the directory's order.
#[derive(Debug, Clone, Copy)]
pub struct LocationMatcher<'a> {
    directory: &'a CountryRegionIndex,
    settings: &'a CheckoutSettings,
}

impl<'a> LocationMatcher<'a> {
    #[must_use]
    pub const fn new(directory: &'a CountryRegionIndex, settings: &'a CheckoutSettings) -> Self {
        Self {
            directory,
            settings,
        }
    }

    /// Suggestions for what the buyer typed, capped at the configured limit.
    ///
    /// Blank input suggests nothing, even when the store country would be
    /// prefixed.
    #[must_use]
    pub fn suggest(&self, typed: &str) -> Vec<String> {
        if typed.trim().is_empty() {
            return Vec::new();
        }
        let raw = with_fixed_country(typed, self.directory, self.settings);
        self.filter(&raw, self.settings.autocomplete_limit)
    }

    /// Up to `limit` suggestion labels for `raw`.
    #[must_use]
    pub fn filter(&self, raw: &str, limit: usize) -> Vec<String> {
        let segments = split_segments(raw);
        let Some(first) = segment(&segments, 0) else {
            return Vec::new();
        };
        if limit == 0 {
            return Vec::new();
        }

        let mut labels = Vec::new();

        if segment(&segments, 1).is_none() {
            labels = self.match_countries(first, limit);
        }

        if labels.is_empty() && segment(&segments, 2).is_none() {
            let needle = segment(&segments, 1).unwrap_or(first);
            labels = self.match_regions(first, needle, limit);
        }

        if labels.is_empty() && segment(&segments, 3).is_none() {
            labels = self.match_cities(&segments, limit);
        }

        labels
    }

    fn match_countries(&self, needle: &str, limit: usize) -> Vec<String> {
        let needle = needle.to_lowercase();
        self.directory
            .countries()
            .iter()
            .filter(|c| c.name.to_lowercase().contains(&needle))
            .take(limit)
            .map(|c| c.name.clone())
            .collect()
    }

    /// Regions of the country named by `country_segment`, or of the store
    /// default when it names none.
    fn match_regions(&self, country_segment: &str, needle: &str, limit: usize) -> Vec<String> {
        let country: &CountryCode = self
            .directory
            .country_code_by_name(country_segment)
            .unwrap_or(&self.settings.default_country);
        let needle = needle.to_lowercase();

        self.directory
            .regions(country)
            .iter()
            .map(crate::directory::Region::label)
            .filter(|label| label.to_lowercase().contains(&needle))
            .take(limit)
            .map(String::from)
            .collect()
    }

    /// City suggestions. The directory carries no city data, so this stage
    /// always comes back empty.
    #[allow(clippy::unused_self)]
    const fn match_cities(&self, _segments: &[&str], _limit: usize) -> Vec<String> {
        Vec::new()
    }
}
