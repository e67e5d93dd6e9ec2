use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use sensepal_common::card::PlaceCard;
use sensepal_common::discovery::Discovery;
use sensepal_common::location::{parse_reported, resolve_center};
use sensepal_common::map::Camera;
use sensepal_common::model::{Coordinate, Place, Prediction};
use sensepal_common::places::PlacesProvider;
use sensepal_common::search_bar::Selection;

use crate::rate_limit::RateLimiter;

pub type SharedProvider = Arc<dyn PlacesProvider>;

#[derive(Clone)]
pub struct SensePalServer {
    provider: Option<SharedProvider>,
    discovery: Option<Arc<Discovery<SharedProvider>>>,
    /// Places from the most recent discovery, for `place_card` lookups.
    last_places: Arc<RwLock<Vec<Place>>>,
    limiter: Option<RateLimiter>,
    tool_router: ToolRouter<SensePalServer>,
}

impl SensePalServer {
    /// `provider` is `None` when no API key is configured; every tool that needs
    /// the provider then fails with an explanatory message.
    pub fn new(provider: Option<SharedProvider>, radius_m: u32, limiter: Option<RateLimiter>) -> Self {
        let discovery = provider
            .as_ref()
            .map(|p| Arc::new(Discovery::new(Arc::clone(p), radius_m)));
        Self {
            provider,
            discovery,
            last_places: Arc::new(RwLock::new(Vec::new())),
            limiter,
            tool_router: Self::tool_router(),
        }
    }

    async fn gate(&self, cost: u32) -> Result<(), String> {
        if let Some(limiter) = &self.limiter {
            limiter.acquire(cost).await.map_err(|e| e.to_string())?;
        }
        Ok(())
    }

    fn provider(&self) -> Result<&SharedProvider, String> {
        self.provider.as_ref().ok_or_else(unavailable)
    }
}

fn unavailable() -> String {
    "places provider unavailable: set GOOGLE_MAPS_API_KEY (billing, Maps JavaScript API \
and Places API must be enabled for the key)"
        .to_string()
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DiscoverPlacesParams {
    /// Latitude of the user's position. Omit to use the default location.
    lat: Option<f64>,
    /// Longitude of the user's position. Omit to use the default location.
    lng: Option<f64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct AutocompleteParams {
    /// Partial text typed by the user.
    input: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct FindPlaceParams {
    /// Free text such as a place name or address.
    query: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct PlaceCardParams {
    /// A place id returned by discover_places.
    place_id: String,
}

#[derive(Debug, Serialize, JsonSchema)]
struct DiscoverPlacesResponse {
    center: Coordinate,
    count: usize,
    places: Vec<Place>,
}

#[derive(Debug, Serialize, JsonSchema)]
struct AutocompleteResponse {
    predictions: Vec<Prediction>,
}

#[tool_router]
impl SensePalServer {
    #[tool(description = "Find sensory-friendly places (quiet libraries, museums, parks, therapy and community centers) near a position. Results are unique by place id and sorted by rating, unrated places last.")]
    async fn discover_places(
        &self,
        Parameters(params): Parameters<DiscoverPlacesParams>,
    ) -> Result<Json<DiscoverPlacesResponse>, String> {
        let discovery = self.discovery.as_ref().ok_or_else(unavailable)?;
        self.gate(discovery.queries().len() as u32).await?;

        let center = resolve_center(parse_reported(params.lat, params.lng));
        let places = discovery.discover(center).await;
        *self.last_places.write().await = places.clone();

        Ok(Json(DiscoverPlacesResponse {
            center,
            count: places.len(),
            places,
        }))
    }

    #[tool(description = "Search-as-you-type suggestions for establishments. An empty input returns no suggestions.")]
    async fn autocomplete(
        &self,
        Parameters(params): Parameters<AutocompleteParams>,
    ) -> Result<Json<AutocompleteResponse>, String> {
        if params.input.trim().is_empty() {
            return Ok(Json(AutocompleteResponse {
                predictions: Vec::new(),
            }));
        }
        let provider = self.provider()?;
        self.gate(1).await?;
        let predictions = provider
            .autocomplete(&params.input)
            .await
            .map_err(|e| format!("autocomplete failed: {e}"))?;
        Ok(Json(AutocompleteResponse { predictions }))
    }

    #[tool(description = "Resolve free text to the best matching place and the camera position to show it.")]
    async fn find_place(
        &self,
        Parameters(params): Parameters<FindPlaceParams>,
    ) -> Result<Json<Selection>, String> {
        let query = params.query.trim().to_string();
        if query.is_empty() {
            return Err("query must not be empty".to_string());
        }
        let provider = self.provider()?;
        self.gate(1).await?;
        let result = provider
            .find_place(&query)
            .await
            .map_err(|e| format!("find_place failed: {e}"))?
            .into_iter()
            .next()
            .ok_or_else(|| format!("no place found for: {query}"))?;
        info!(place_id = %result.id, "find_place matched");
        Ok(Json(Selection {
            camera: Camera::focus(result.location),
            result,
        }))
    }

    #[tool(description = "Card details (category label, open status, directions link) for a place from the last discover_places call.")]
    async fn place_card(
        &self,
        Parameters(params): Parameters<PlaceCardParams>,
    ) -> Result<Json<PlaceCard>, String> {
        let place_id = params.place_id.trim();
        let places = self.last_places.read().await;
        places
            .iter()
            .find(|p| p.id == place_id)
            .map(|p| Json(PlaceCard::new(p)))
            .ok_or_else(|| format!("unknown place_id: {place_id} (run discover_places first)"))
    }
}

#[tool_handler]
impl ServerHandler for SensePalServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "sensepal".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "SensePal finds sensory-friendly places. Call discover_places with the user's \
position (or none for the default location), then place_card for details on a result. \
Use autocomplete and find_place to look up a specific place by name."
                    .to_string(),
            ),
        }
    }
}
