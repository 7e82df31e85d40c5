//! Country and region reference data.
//!
//! Loaded once at start-up from a JSON file and shared read-only. The order
//! of countries and regions in the file is the order autocomplete returns
//! them in.
//!
//! ```json
//! {
//!   "countries": [
//!     {
//!       "code": "UA",
//!       "name": "Ukraine",
//!       "regions": [
//!         {"region_id": 780, "code": "UA-30", "default_name": "Kyiv", "name": "Київ"}
//!       ]
//!     }
//!   ]
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use onepage_core::{CountryCode, RegionId};
use serde::Deserialize;
use thiserror::Error;

/// Errors loading the reference data.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid directory JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate country code {0}")]
    DuplicateCountry(CountryCode),
    #[error("duplicate region id {region_id} in {country}")]
    DuplicateRegion {
        country: CountryCode,
        region_id: RegionId,
    },
    #[error("country {0} has an empty name")]
    EmptyCountryName(CountryCode),
    #[error("region {region_id} in {country} has an empty name")]
    EmptyRegionName {
        country: CountryCode,
        region_id: RegionId,
    },
}

/// A country and its regions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Country {
    pub code: CountryCode,
    /// Display name in the store locale.
    pub name: String,
    #[serde(default)]
    pub regions: Vec<Region>,
}

/// A state, province or oblast.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Region {
    pub region_id: RegionId,
    #[serde(default)]
    pub code: Option<String>,
    /// Canonical name.
    pub default_name: String,
    /// Name in the store locale, when translated.
    #[serde(default)]
    pub name: Option<String>,
}

impl Region {
    /// Localized name, falling back to the canonical one.
    #[must_use]
    pub fn label(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.default_name)
    }

    /// Case-insensitive exact match against either name.
    fn is_named(&self, needle_lower: &str) -> bool {
        self.default_name.to_lowercase() == needle_lower
            || self
                .name
                .as_deref()
                .is_some_and(|n| n.to_lowercase() == needle_lower)
    }
}

#[derive(Deserialize)]
struct DirectoryFile {
    countries: Vec<Country>,
}

/// Read-only country/region lookup.
#[derive(Debug, Clone, Default)]
pub struct CountryRegionIndex {
    countries: Vec<Country>,
    by_code: HashMap<CountryCode, usize>,
}

impl CountryRegionIndex {
    /// Build an index, validating codes, ids and names.
    ///
    /// # Errors
    ///
    /// Returns an error on a duplicate country code, a duplicate region id
    /// within one country, or an empty name.
    pub fn new(countries: Vec<Country>) -> Result<Self, DirectoryError> {
        let mut by_code = HashMap::with_capacity(countries.len());

        for (position, country) in countries.iter().enumerate() {
            if country.name.trim().is_empty() {
                return Err(DirectoryError::EmptyCountryName(country.code.clone()));
            }
            if by_code.insert(country.code.clone(), position).is_some() {
                return Err(DirectoryError::DuplicateCountry(country.code.clone()));
            }

            let mut seen = HashSet::with_capacity(country.regions.len());
            for region in &country.regions {
                if !seen.insert(region.region_id) {
                    return Err(DirectoryError::DuplicateRegion {
                        country: country.code.clone(),
                        region_id: region.region_id,
                    });
                }
                if region.default_name.trim().is_empty() {
                    return Err(DirectoryError::EmptyRegionName {
                        country: country.code.clone(),
                        region_id: region.region_id,
                    });
                }
            }
        }

        Ok(Self { countries, by_code })
    }

    /// Parse and validate the JSON form.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, DirectoryError> {
        let file: DirectoryFile = serde_json::from_str(json)?;
        Self::new(file.countries)
    }

    /// Load and validate a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn load(path: &Path) -> Result<Self, DirectoryError> {
        let json = std::fs::read_to_string(path).map_err(|source| DirectoryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// All countries in their natural order.
    #[must_use]
    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    /// Look up a country by code.
    #[must_use]
    pub fn country(&self, code: &CountryCode) -> Option<&Country> {
        self.by_code
            .get(code)
            .and_then(|&position| self.countries.get(position))
    }

    /// Display name of a country.
    #[must_use]
    pub fn country_name(&self, code: &CountryCode) -> Option<&str> {
        self.country(code).map(|c| c.name.as_str())
    }

    /// Country whose display name equals `name`, ignoring case.
    #[must_use]
    pub fn country_code_by_name(&self, name: &str) -> Option<&CountryCode> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.countries
            .iter()
            .find(|c| c.name.to_lowercase() == needle)
            .map(|c| &c.code)
    }

    /// Regions of a country; empty for unknown countries.
    #[must_use]
    pub fn regions(&self, code: &CountryCode) -> &[Region] {
        self.country(code).map_or(&[], |c| c.regions.as_slice())
    }

    /// Region of `country` whose localized or canonical name equals `name`.
    #[must_use]
    pub fn region_id_by_name(&self, name: &str, country: &CountryCode) -> Option<RegionId> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.regions(country)
            .iter()
            .find(|r| r.is_named(&needle))
            .map(|r| r.region_id)
    }

    /// Look up a region by id within a country.
    #[must_use]
    pub fn region(&self, country: &CountryCode, region_id: RegionId) -> Option<&Region> {
        self.regions(country)
            .iter()
            .find(|r| r.region_id == region_id)
    }

    /// Total number of regions across all countries.
    #[must_use]
    pub fn region_count(&self) -> usize {
        self.countries.iter().map(|c| c.regions.len()).sum()
    }
}
