/// Error types shared across the SensePal crates.
///
/// These cover the two failure sources the application knows about: the places
/// provider and the user's position. Binary crates wrap them in their own errors
/// or report them through `anyhow`.
use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum PlacesError {
    #[error("no places API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} body={body}")]
    Upstream { status: StatusCode, body: String },

    #[error("places API status {status}: {message}")]
    Status { status: String, message: String },

    #[error("sub-search timed out")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("location unavailable: {0}")]
    Unavailable(String),

    #[error("invalid coordinate: lat={lat} lng={lng}")]
    InvalidCoordinate { lat: f64, lng: f64 },
}
