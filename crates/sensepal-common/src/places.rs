use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::discovery::DiscoveryQuery;
use crate::error::PlacesError;
use crate::model::{Coordinate, Place, Prediction, SearchResult};

pub const DEFAULT_BASE_URL: &str = "https://maps.googleapis.com/maps/api/place";

pub type PlacesFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PlacesError>> + Send + 'a>>;

/// A places provider: nearby search, autocomplete, and free-text lookup.
pub trait PlacesProvider: Send + Sync + 'static {
    /// Places within `query.radius_m` of `center` matching the query's keyword and type.
    fn nearby_search<'a>(
        &'a self,
        center: Coordinate,
        query: &'a DiscoveryQuery,
    ) -> PlacesFuture<'a, Vec<Place>>;

    /// Search-as-you-type suggestions for a partial input.
    fn autocomplete<'a>(&'a self, input: &'a str) -> PlacesFuture<'a, Vec<Prediction>>;

    /// Resolve free text to concrete places, best match first.
    fn find_place<'a>(&'a self, query: &'a str) -> PlacesFuture<'a, Vec<SearchResult>>;
}

impl<P: PlacesProvider + ?Sized> PlacesProvider for Arc<P> {
    fn nearby_search<'a>(
        &'a self,
        center: Coordinate,
        query: &'a DiscoveryQuery,
    ) -> PlacesFuture<'a, Vec<Place>> {
        (**self).nearby_search(center, query)
    }

    fn autocomplete<'a>(&'a self, input: &'a str) -> PlacesFuture<'a, Vec<Prediction>> {
        (**self).autocomplete(input)
    }

    fn find_place<'a>(&'a self, query: &'a str) -> PlacesFuture<'a, Vec<SearchResult>> {
        (**self).find_place(query)
    }
}

#[derive(Clone, Debug)]
pub struct PlacesClientConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl PlacesClientConfig {
    /// Load from environment.
    ///
    /// - `GOOGLE_MAPS_API_KEY`: provider key; absent means the map cannot load
    /// - `PLACES_BASE_URL`: defaults to the Google Places web service
    /// - `PLACES_TIMEOUT_SECS`: per-request timeout, default 10
    /// - `PLACES_MAX_ERROR_BODY_BYTES`: error body truncation, default 8 KiB
    pub fn from_env() -> Self {
        let api_key = std::env::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let base_url =
            std::env::var("PLACES_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let timeout = std::env::var("PLACES_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));

        let max_error_body_bytes = std::env::var("PLACES_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            max_error_body_bytes,
        }
    }
}

/// Client for the Google Places web service.
///
/// Requests are issued once; failures are returned to the caller, which decides
/// whether a failure is fatal (the discovery pipeline never treats it so).
#[derive(Clone)]
pub struct GooglePlacesClient {
    config: PlacesClientConfig,
    api_key: String,
    http: reqwest::Client,
}

impl GooglePlacesClient {
    pub fn new(config: PlacesClientConfig) -> Result<Self, PlacesError> {
        let api_key = config.api_key.clone().ok_or(PlacesError::MissingApiKey)?;
        let http = reqwest::Client::builder()
            .user_agent("sensepal")
            .build()?;
        Ok(Self {
            config,
            api_key,
            http,
        })
    }

    pub fn config(&self) -> &PlacesClientConfig {
        &self.config
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: Vec<(&'static str, String)>,
    ) -> Result<Vec<T>, PlacesError> {
        let url = format!("{}/{endpoint}/json", self.config.base_url);
        debug!(endpoint, "places request");
        let resp = self
            .http
            .get(&url)
            .query(&params)
            .query(&[("key", self.api_key.as_str())])
            .timeout(self.config.timeout)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = read_limited_text(resp, self.config.max_error_body_bytes).await;
            return Err(PlacesError::Upstream { status, body });
        }

        let body = resp.bytes().await?;
        let envelope: StatusEnvelope = serde_json::from_slice(&body)?;
        envelope.into_items()
    }
}

impl PlacesProvider for GooglePlacesClient {
    fn nearby_search<'a>(
        &'a self,
        center: Coordinate,
        query: &'a DiscoveryQuery,
    ) -> PlacesFuture<'a, Vec<Place>> {
        Box::pin(async move {
            let places: Vec<WirePlace> = self.get("nearbysearch", nearby_params(center, query)).await?;
            Ok(places.into_iter().map(Place::from).collect())
        })
    }

    fn autocomplete<'a>(&'a self, input: &'a str) -> PlacesFuture<'a, Vec<Prediction>> {
        Box::pin(async move {
            let params = vec![
                ("input", input.to_string()),
                ("types", "establishment".to_string()),
            ];
            let predictions: Vec<WirePrediction> = self.get("autocomplete", params).await?;
            Ok(predictions.into_iter().map(Prediction::from).collect())
        })
    }

    fn find_place<'a>(&'a self, query: &'a str) -> PlacesFuture<'a, Vec<SearchResult>> {
        Box::pin(async move {
            let params = vec![
                ("input", query.to_string()),
                ("inputtype", "textquery".to_string()),
                (
                    "fields",
                    "name,geometry,formatted_address,place_id".to_string(),
                ),
            ];
            let candidates: Vec<WireCandidate> = self.get("findplacefromtext", params).await?;
            Ok(candidates.into_iter().map(SearchResult::from).collect())
        })
    }
}

/// Query parameters for a nearby search.
///
/// The provider honors a single `type`; further entries in `place_types` are
/// ignored, the same as the Maps JavaScript SDK does.
fn nearby_params(center: Coordinate, query: &DiscoveryQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("location", format!("{},{}", center.lat, center.lng)),
        ("radius", query.radius_m.to_string()),
    ];
    if let Some(keyword) = query.keyword.as_deref().filter(|k| !k.is_empty()) {
        params.push(("keyword", keyword.to_string()));
    }
    if let Some(place_type) = query.place_types.first() {
        params.push(("type", place_type.clone()));
    }
    params
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

// --- Wire format ---

/// Every Places web service response carries a `status` plus one list field
/// whose name depends on the endpoint.
#[derive(Debug, Deserialize)]
struct StatusEnvelope {
    status: String,
    error_message: Option<String>,
    #[serde(alias = "results", alias = "predictions", alias = "candidates")]
    items: Option<Vec<serde_json::Value>>,
}

impl StatusEnvelope {
    fn into_items<T: DeserializeOwned>(self) -> Result<Vec<T>, PlacesError> {
        match self.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Vec::new()),
            _ => {
                return Err(PlacesError::Status {
                    status: self.status,
                    message: self.error_message.unwrap_or_default(),
                })
            }
        }

        // A single malformed entry should not sink the whole response.
        let items = self
            .items
            .unwrap_or_default()
            .into_iter()
            .filter_map(|value| {
                serde_json::from_value::<T>(value)
                    .inspect_err(|e| warn!(error = %e, "skipping malformed places entry"))
                    .ok()
            })
            .collect();
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct WireGeometry {
    location: Coordinate,
}

#[derive(Debug, Deserialize)]
struct WireOpeningHours {
    open_now: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct WirePlace {
    place_id: String,
    name: String,
    geometry: WireGeometry,
    #[serde(default)]
    types: Vec<String>,
    rating: Option<f64>,
    vicinity: Option<String>,
    opening_hours: Option<WireOpeningHours>,
    website: Option<String>,
}

impl From<WirePlace> for Place {
    fn from(w: WirePlace) -> Self {
        Place {
            id: w.place_id,
            name: w.name,
            location: w.geometry.location,
            types: w.types,
            // Google reports 0 for places without reviews.
            rating: w.rating.filter(|r| *r > 0.0),
            vicinity: w.vicinity,
            open_now: w.opening_hours.and_then(|h| h.open_now),
            website: w.website,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireStructuredFormatting {
    main_text: String,
    #[serde(default)]
    secondary_text: String,
}

#[derive(Debug, Deserialize)]
struct WirePrediction {
    place_id: String,
    description: String,
    structured_formatting: Option<WireStructuredFormatting>,
}

impl From<WirePrediction> for Prediction {
    fn from(w: WirePrediction) -> Self {
        let (main_text, secondary_text) = match w.structured_formatting {
            Some(f) => (f.main_text, f.secondary_text),
            None => (w.description.clone(), String::new()),
        };
        Prediction {
            place_id: w.place_id,
            description: w.description,
            main_text,
            secondary_text,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireCandidate {
    place_id: String,
    name: String,
    geometry: WireGeometry,
    #[serde(default)]
    formatted_address: String,
}

impl From<WireCandidate> for SearchResult {
    fn from(w: WireCandidate) -> Self {
        SearchResult {
            id: w.place_id,
            name: w.name,
            location: w.geometry.location,
            formatted_address: w.formatted_address,
        }
    }
}
