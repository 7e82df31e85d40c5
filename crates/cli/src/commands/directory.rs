//! Reference data commands.

use std::fmt;
use std::path::Path;

use onepage_checkout::directory::{CountryRegionIndex, DirectoryError};

/// What a reference data file contains.
#[derive(Debug, PartialEq, Eq)]
pub struct DirectorySummary {
    pub countries: usize,
    pub regions: usize,
    /// Countries with no regions; addresses there keep free-text regions.
    pub without_regions: Vec<String>,
}

impl fmt::Display for DirectorySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "OK: {} countries, {} regions",
            self.countries, self.regions
        )?;
        if !self.without_regions.is_empty() {
            write!(f, "\nWithout regions: {}", self.without_regions.join(", "))?;
        }
        Ok(())
    }
}

/// Load and validate the file at `path`.
///
/// # Errors
///
/// Returns the first validation problem found.
pub fn check(path: &Path) -> Result<DirectorySummary, DirectoryError> {
    let index = CountryRegionIndex::load(path)?;
    tracing::info!(path = %path.display(), "Directory loaded");

    Ok(DirectorySummary {
        countries: index.countries().len(),
        regions: index.region_count(),
        without_regions: index
            .countries()
            .iter()
            .filter(|c| c.regions.is_empty())
            .map(|c| c.code.to_string())
            .collect(),
    })
}
