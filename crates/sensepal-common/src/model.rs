use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A WGS84 point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Both components finite and inside the usual latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// A point of interest returned by a nearby search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Place {
    /// Opaque provider identifier, e.g. a Google `place_id`.
    pub id: String,
    pub name: String,
    pub location: Coordinate,
    /// Provider category tags in provider order, e.g. `["library", "point_of_interest"]`.
    pub types: Vec<String>,
    pub rating: Option<f64>,
    /// Short street address ("vicinity" in Google terms).
    pub vicinity: Option<String>,
    pub open_now: Option<bool>,
    pub website: Option<String>,
}

impl Place {
    /// Rating usable for ordering. NaN is treated as missing.
    pub fn sortable_rating(&self) -> Option<f64> {
        self.rating.filter(|r| !r.is_nan())
    }
}

/// A resolved free-text search, e.g. from a find-place query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SearchResult {
    pub id: String,
    pub name: String,
    pub location: Coordinate,
    pub formatted_address: String,
}

/// A search-as-you-type suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Prediction {
    pub place_id: String,
    /// Full text; this is what gets submitted when the prediction is picked.
    pub description: String,
    pub main_text: String,
    pub secondary_text: String,
}
