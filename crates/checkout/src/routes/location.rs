//! Location field fragments.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use onepage_core::CountryCode;
use serde::Deserialize;
use tracing::instrument;

use crate::location::LocationMatcher;
use crate::state::AppState;

/// Query for `GET /checkout/autocomplete`.
#[derive(Debug, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub location: String,
}

/// Suggestion list fragment.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/autocomplete.html")]
pub struct AutocompleteTemplate {
    pub suggestions: Vec<String>,
}

/// Suggest locations for the partially typed single field.
#[instrument(skip(state))]
pub async fn autocomplete(
    State(state): State<AppState>,
    Query(query): Query<AutocompleteQuery>,
) -> AutocompleteTemplate {
    let suggestions =
        LocationMatcher::new(state.directory(), state.settings()).suggest(&query.location);

    tracing::debug!(count = suggestions.len(), "Location suggestions");
    AutocompleteTemplate { suggestions }
}

/// Query for `GET /checkout/regions`.
#[derive(Debug, Deserialize)]
pub struct RegionsQuery {
    #[serde(default)]
    pub country_id: String,
    pub region_id: Option<i32>,
}

/// One `<option>` of the region select.
pub struct RegionOption {
    pub id: i32,
    pub name: String,
    pub selected: bool,
}

/// Region select fragment; a text input when the country has no regions.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/regions.html")]
pub struct RegionsTemplate {
    pub options: Vec<RegionOption>,
}

/// Region options for a country.
#[instrument(skip(state))]
pub async fn regions(
    State(state): State<AppState>,
    Query(query): Query<RegionsQuery>,
) -> RegionsTemplate {
    let options = CountryCode::parse(&query.country_id)
        .map(|code| {
            state
                .directory()
                .regions(&code)
                .iter()
                .map(|region| RegionOption {
                    id: region.region_id.as_i32(),
                    name: region.label().to_string(),
                    selected: query.region_id == Some(region.region_id.as_i32()),
                })
                .collect()
        })
        .unwrap_or_default();

    RegionsTemplate { options }
}
