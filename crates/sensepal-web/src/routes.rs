use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::info;

use sensepal_common::card::PlaceCard;
use sensepal_common::location::{parse_reported, resolve_center, DEFAULT_LOCATION};
use sensepal_common::map::{Camera, MapView};
use sensepal_common::model::{Coordinate, Place, Prediction};
use sensepal_common::search_bar::Selection;

use crate::error::AppError;
use crate::page::{render_home, render_map_error, HomePage};
use crate::state::AppState;
use crate::ws::search_socket;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/", get(home_handler))
        .route("/api/places/nearby", get(nearby_handler))
        .route("/api/places/find", get(find_handler))
        .route("/api/places/autocomplete", get(autocomplete_handler))
        .route("/ws/search", get(search_socket))
        .route("/healthz", get(|| async { "ok" }))
        .layer(cors)
        .with_state(state)
}

/// Position reported by the browser. Values arrive as raw strings so that
/// garbage falls back to the default location instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PositionParams {
    pub lat: Option<String>,
    pub lng: Option<String>,
    /// Place id whose info window should be open.
    pub selected: Option<String>,
    /// Set by the page when geolocation was denied or is unsupported.
    pub geo: Option<String>,
}

impl PositionParams {
    fn center(&self) -> Coordinate {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<f64>().ok());
        let reported = match (&self.lat, &self.lng) {
            (None, None) => parse_reported(None, None),
            (lat, lng) => parse_reported(
                Some(parse(lat).unwrap_or(f64::NAN)),
                Some(parse(lng).unwrap_or(f64::NAN)),
            ),
        };
        resolve_center(reported)
    }

    /// True once the browser has reported a position or given up on one.
    fn located(&self) -> bool {
        self.lat.is_some() || self.lng.is_some() || self.geo.is_some()
    }
}

#[derive(Debug, Serialize)]
pub struct NearbyResponse {
    pub center: Coordinate,
    pub places: Vec<Place>,
    pub cards: Vec<PlaceCard>,
    pub map: MapView,
}

async fn discover_around(state: &AppState, params: &PositionParams) -> Result<NearbyResponse, AppError> {
    let places = state.places()?;
    let center = params.center();
    let found = places.discovery.discover(center).await;
    info!(count = found.len(), "nearby places ready");

    let cards = found.iter().map(PlaceCard::new).collect();
    let map = MapView::build(center, Some(center), &found, params.selected.as_deref());
    Ok(NearbyResponse {
        center,
        places: found,
        cards,
        map,
    })
}

async fn home_handler(
    State(state): State<AppState>,
    Query(params): Query<PositionParams>,
) -> Response {
    if state.places().is_err() {
        return (StatusCode::SERVICE_UNAVAILABLE, Html(render_map_error())).into_response();
    }
    let api_key = state.config.places.api_key.as_deref().unwrap_or_default();

    // First visit: the page script asks for the position and reloads, so
    // searching around the default location now would be thrown away.
    if !params.located() {
        let map = MapView::build(DEFAULT_LOCATION, None, &[], None);
        return Html(render_home(&HomePage {
            api_key,
            map: &map,
            cards: &[],
        }))
        .into_response();
    }

    let nearby = match discover_around(&state, &params).await {
        Ok(nearby) => nearby,
        Err(_) => {
            return (StatusCode::SERVICE_UNAVAILABLE, Html(render_map_error())).into_response();
        }
    };
    Html(render_home(&HomePage {
        api_key,
        map: &nearby.map,
        cards: &nearby.cards,
    }))
    .into_response()
}

async fn nearby_handler(
    State(state): State<AppState>,
    Query(params): Query<PositionParams>,
) -> Result<Json<NearbyResponse>, AppError> {
    Ok(Json(discover_around(&state, &params).await?))
}

#[derive(Debug, Deserialize)]
pub struct FindParams {
    pub query: String,
}

async fn find_handler(
    State(state): State<AppState>,
    Query(params): Query<FindParams>,
) -> Result<Json<Selection>, AppError> {
    let query = params.query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("query must not be empty".to_string()));
    }
    let places = state.places()?;
    let result = places
        .provider
        .find_place(query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::NotFound(query.to_string()))?;
    Ok(Json(Selection {
        camera: Camera::focus(result.location),
        result,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    #[serde(default)]
    pub input: String,
}

async fn autocomplete_handler(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Result<Json<Vec<Prediction>>, AppError> {
    if params.input.trim().is_empty() {
        return Ok(Json(Vec::new()));
    }
    let places = state.places()?;
    let predictions = places.provider.autocomplete(&params.input).await?;
    Ok(Json(predictions))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    use sensepal_common::discovery::default_queries;
    use sensepal_common::places::{PlacesClientConfig, DEFAULT_BASE_URL};
    use sensepal_common::testing::{place, prediction, search_result, FakeProvider};

    use super::*;
    use crate::config::Config;

    fn config(api_key: Option<&str>) -> Config {
        Config {
            port: 0,
            places: PlacesClientConfig {
                api_key: api_key.map(str::to_string),
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout: Duration::from_secs(1),
                max_error_body_bytes: 1024,
            },
            radius_m: 5000,
            debounce: Duration::from_millis(300),
            sub_search_timeout: Duration::from_secs(5),
        }
    }

    fn app(provider: FakeProvider) -> (Arc<FakeProvider>, Router) {
        let provider = Arc::new(provider);
        let state = AppState::with_provider(config(Some("test-key")), provider.clone());
        (provider, router(state))
    }

    fn keyword(index: usize) -> String {
        default_queries(5000)[index].keyword.clone().unwrap()
    }

    async fn get(router: Router, uri: &str) -> (StatusCode, String) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (_, router) = app(FakeProvider::default());
        let (status, body) = get(router, "/healthz").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn nearby_without_position_uses_default_center() {
        let (_, router) = app(
            FakeProvider::default()
                .with_nearby(&keyword(0), Ok(vec![place("a", Some(4.0))]))
                .with_nearby(&keyword(2), Ok(vec![place("b", Some(4.5)), place("a", Some(4.0))])),
        );
        let (status, body) = get(router, "/api/places/nearby").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let center: Coordinate = serde_json::from_value(json["center"].clone()).unwrap();
        assert_eq!(center, DEFAULT_LOCATION);
        let ids: Vec<&str> = json["places"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        // user marker plus one per place
        assert_eq!(json["map"]["markers"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn nearby_with_garbage_position_uses_default_center() {
        let (_, router) = app(FakeProvider::default());
        let (_, body) = get(router, "/api/places/nearby?lat=north&lng=-122").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let center: Coordinate = serde_json::from_value(json["center"].clone()).unwrap();
        assert_eq!(center, DEFAULT_LOCATION);
    }

    #[tokio::test]
    async fn nearby_with_position_centers_there() {
        let (_, router) = app(FakeProvider::default());
        let (_, body) = get(router, "/api/places/nearby?lat=40.7128&lng=-74.006").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        let center: Coordinate = serde_json::from_value(json["center"].clone()).unwrap();
        assert_eq!(center, Coordinate::new(40.7128, -74.006));
    }

    #[tokio::test]
    async fn empty_autocomplete_input_skips_provider() {
        let (provider, router) = app(FakeProvider::default());
        let (status, body) = get(router, "/api/places/autocomplete?input=").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[]");
        assert!(provider.autocomplete_calls().is_empty());
    }

    #[tokio::test]
    async fn autocomplete_returns_predictions() {
        let (_, router) = app(
            FakeProvider::default().with_predictions("lib", vec![prediction("p1", "Main Library")]),
        );
        let (status, body) = get(router, "/api/places/autocomplete?input=lib").await;
        assert_eq!(status, StatusCode::OK);
        let predictions: Vec<Prediction> = serde_json::from_str(&body).unwrap();
        assert_eq!(predictions[0].place_id, "p1");
    }

    #[tokio::test]
    async fn find_recenters_on_first_match() {
        let (_, router) = app(
            FakeProvider::default().with_results("pier 39", vec![search_result("r1", 37.8087, -122.4098)]),
        );
        let (status, body) = get(router, "/api/places/find?query=pier%2039").await;
        assert_eq!(status, StatusCode::OK);
        let selection: Selection = serde_json::from_str(&body).unwrap();
        assert_eq!(selection.camera.center, Coordinate::new(37.8087, -122.4098));
        assert_eq!(selection.camera.zoom, 15);
    }

    #[tokio::test]
    async fn find_without_match_is_not_found() {
        let (_, router) = app(FakeProvider::default());
        let (status, _) = get(router, "/api/places/find?query=atlantis").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn home_renders_places() {
        let (_, router) = app(
            FakeProvider::default().with_nearby(&keyword(1), Ok(vec![place("lib", Some(4.9))])),
        );
        let (status, html) = get(router, "/?lat=37.7&lng=-122.4").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Nearby Sensory-Friendly Places (1)"));
        assert!(html.contains("Place lib"));
    }

    #[tokio::test]
    async fn first_visit_skips_discovery_until_located() {
        let (provider, router) = app(
            FakeProvider::default().with_nearby(&keyword(1), Ok(vec![place("lib", Some(4.9))])),
        );
        let (status, html) = get(router.clone(), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Nearby Sensory-Friendly Places (0)"));
        assert_eq!(provider.nearby_calls(), 0);

        let (status, html) = get(router, "/?geo=denied").await;
        assert_eq!(status, StatusCode::OK);
        assert!(html.contains("Nearby Sensory-Friendly Places (1)"));
        assert_eq!(provider.nearby_calls(), default_queries(5000).len());
    }

    #[tokio::test]
    async fn missing_api_key_renders_error_panel() {
        let state = AppState::from_config(config(None)).unwrap();
        let router = router(state);

        let (status, html) = get(router.clone(), "/").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(html.contains("Error loading maps"));
        assert!(html.contains("Enabled Places API"));

        let (status, _) = get(router, "/api/places/nearby").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }
}
