use std::str::FromStr;
use std::time::Duration;

use sensepal_common::discovery::DEFAULT_RADIUS_M;
use sensepal_common::places::PlacesClientConfig;
use sensepal_common::search_bar::DEFAULT_DEBOUNCE;

use crate::error::AppError;

/// Web front-end configuration loaded explicitly from environment variables.
///
/// Nothing is required: without `GOOGLE_MAPS_API_KEY` the server still starts
/// and serves the map-load error panel.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port to listen on.
    pub port: u16,
    /// Places provider settings, including the API key handed to the Maps SDK.
    pub places: PlacesClientConfig,
    /// Radius of every nearby sub-search, in meters.
    pub radius_m: u32,
    /// Quiet period before a search-as-you-type lookup fires.
    pub debounce: Duration,
    /// Upper bound on a single nearby sub-search.
    pub sub_search_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional:
    /// - `SENSEPAL_PORT`: listen port (default 8080)
    /// - `SEARCH_RADIUS_M`: nearby search radius (default 5000)
    /// - `SEARCH_DEBOUNCE_MS`: search-as-you-type quiet period (default 300)
    /// - `SUB_SEARCH_TIMEOUT_SECS`: per sub-search bound (default 15)
    /// - everything read by [`PlacesClientConfig::from_env`]
    pub fn from_env() -> Result<Self, AppError> {
        let port = parse_var("SENSEPAL_PORT", 8080u16)?;
        let radius_m = parse_var("SEARCH_RADIUS_M", DEFAULT_RADIUS_M)?;
        if radius_m == 0 {
            return Err(AppError::Config(
                "SEARCH_RADIUS_M must be greater than zero".to_string(),
            ));
        }
        let debounce = parse_var("SEARCH_DEBOUNCE_MS", DEFAULT_DEBOUNCE.as_millis() as u64)
            .map(Duration::from_millis)?;
        let sub_search_timeout =
            parse_var("SUB_SEARCH_TIMEOUT_SECS", 15u64).map(Duration::from_secs)?;

        Ok(Self {
            port,
            places: PlacesClientConfig::from_env(),
            radius_m,
            debounce,
            sub_search_timeout,
        })
    }
}

/// Read `key`, falling back to `default` when unset. A set but unparsable value
/// is an error rather than a silent default.
fn parse_var<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| AppError::Config(format!("{key}={raw:?} is invalid: {e}"))),
        Err(_) => Ok(default),
    }
}
