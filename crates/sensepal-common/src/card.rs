/// List-card presentation of a discovered place.
use reqwest::Url;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::Place;

const DIRECTIONS_BASE: &str = "https://www.google.com/maps/dir/";

const TYPE_LABELS: [(&str, &str); 8] = [
    ("library", "📚 Library"),
    ("museum", "🏛️ Museum"),
    ("park", "🌳 Park"),
    ("art_gallery", "🎨 Art Gallery"),
    ("aquarium", "🐠 Aquarium"),
    ("school", "🏫 School"),
    ("health", "🏥 Health Center"),
    ("point_of_interest", "📍 Point of Interest"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlaceCard {
    pub place_id: String,
    pub name: String,
    pub type_label: String,
    pub rating: Option<f64>,
    pub vicinity: Option<String>,
    pub open_status: Option<String>,
    pub directions_url: String,
    pub website: Option<String>,
}

impl PlaceCard {
    pub fn new(place: &Place) -> Self {
        Self {
            place_id: place.id.clone(),
            name: place.name.clone(),
            type_label: type_label(&place.types),
            rating: place.rating,
            vicinity: place.vicinity.clone(),
            open_status: open_status(place).map(str::to_string),
            directions_url: directions_url(place),
            website: place.website.clone(),
        }
    }
}

/// Label for the most recognizable category: the first type with a known label,
/// otherwise the first type with underscores turned into spaces.
///
/// A known label anywhere in `types` beats position, so a generic leading type
/// such as `establishment` never hides `museum`.
pub fn type_label(types: &[String]) -> String {
    types
        .iter()
        .find_map(|t| {
            TYPE_LABELS
                .iter()
                .find(|(key, _)| key == t)
                .map(|(_, label)| label.to_string())
        })
        .or_else(|| types.first().map(|t| t.replace('_', " ")))
        .unwrap_or_else(|| "place".to_string())
}

pub fn open_status(place: &Place) -> Option<&'static str> {
    place
        .open_now
        .map(|open| if open { "✅ Open Now" } else { "❌ Closed" })
}

/// Google Maps directions link targeting the place by name and id.
pub fn directions_url(place: &Place) -> String {
    match Url::parse_with_params(
        DIRECTIONS_BASE,
        &[
            ("api", "1"),
            ("destination", place.name.as_str()),
            ("destination_place_id", place.id.as_str()),
        ],
    ) {
        Ok(url) => url.to_string(),
        // The base is a constant, valid URL.
        Err(_) => DIRECTIONS_BASE.to_string(),
    }
}
