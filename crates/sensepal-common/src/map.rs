/// Declarative map state handed to the external Maps SDK.
///
/// Nothing here draws anything: the page serializes a `MapView` and the SDK
/// binding on the client turns it into markers, an info window and a camera.
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Coordinate, Place};

pub const DEFAULT_ZOOM: u8 = 13;
pub const SELECTED_ZOOM: u8 = 15;

/// Where the map looks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Camera {
    pub center: Coordinate,
    pub zoom: u8,
}

impl Camera {
    /// Pan to a picked search result and zoom in.
    pub fn focus(center: Coordinate) -> Self {
        Self {
            center,
            zoom: SELECTED_ZOOM,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MarkerIcon {
    pub fill_color: String,
    pub fill_opacity: f32,
    pub stroke_color: String,
    pub stroke_weight: u8,
    pub scale: u8,
}

impl MarkerIcon {
    fn circle(fill: &str, stroke: &str) -> Self {
        Self {
            fill_color: fill.to_string(),
            fill_opacity: 1.0,
            stroke_color: stroke.to_string(),
            stroke_weight: 2,
            scale: 8,
        }
    }

    pub fn user() -> Self {
        Self::circle("#1E40AF", "#1E40AF")
    }

    pub fn place() -> Self {
        Self::circle("#3B82F6", "#2563EB")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Marker {
    /// Place id, or `None` for the user's own position.
    pub place_id: Option<String>,
    pub position: Coordinate,
    pub title: Option<String>,
    pub icon: MarkerIcon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InfoWindow {
    pub place_id: String,
    pub position: Coordinate,
    pub name: String,
    pub vicinity: Option<String>,
    pub rating_line: Option<String>,
}

impl InfoWindow {
    pub fn for_place(place: &Place) -> Self {
        Self {
            place_id: place.id.clone(),
            position: place.location,
            name: place.name.clone(),
            vicinity: place.vicinity.clone(),
            rating_line: place.rating.map(|r| format!("Rating: {r} ⭐")),
        }
    }
}

/// SDK control flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MapOptions {
    pub disable_default_ui: bool,
    pub zoom_control: bool,
    pub map_type_control: bool,
    pub scale_control: bool,
    pub street_view_control: bool,
    pub rotate_control: bool,
    pub fullscreen_control: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            disable_default_ui: false,
            zoom_control: true,
            map_type_control: false,
            scale_control: true,
            street_view_control: false,
            rotate_control: false,
            fullscreen_control: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MapView {
    pub camera: Camera,
    pub options: MapOptions,
    pub markers: Vec<Marker>,
    pub info_window: Option<InfoWindow>,
}

impl MapView {
    /// Build the view for a discovery result.
    ///
    /// The user marker comes first when a user position is known, followed by one
    /// marker per place in list order. `selected` opens the info window if it
    /// names one of `places`.
    pub fn build(
        center: Coordinate,
        user_location: Option<Coordinate>,
        places: &[Place],
        selected: Option<&str>,
    ) -> Self {
        let mut markers = Vec::with_capacity(places.len() + 1);
        if let Some(position) = user_location {
            markers.push(Marker {
                place_id: None,
                position,
                title: Some("Your Location".to_string()),
                icon: MarkerIcon::user(),
            });
        }
        markers.extend(places.iter().map(|p| Marker {
            place_id: Some(p.id.clone()),
            position: p.location,
            title: Some(p.name.clone()),
            icon: MarkerIcon::place(),
        }));

        let info_window = selected
            .and_then(|id| places.iter().find(|p| p.id == id))
            .map(InfoWindow::for_place);

        Self {
            camera: Camera {
                center,
                zoom: DEFAULT_ZOOM,
            },
            options: MapOptions::default(),
            markers,
            info_window,
        }
    }

    /// Open the info window on `place`, replacing any current one.
    pub fn select(&mut self, place: &Place) {
        self.info_window = Some(InfoWindow::for_place(place));
    }

    pub fn close_info_window(&mut self) {
        self.info_window = None;
    }
}
