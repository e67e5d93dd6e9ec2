use tracing::error;

use crate::error::LocationError;
use crate::model::Coordinate;

/// Used whenever the user's position is unknown (San Francisco).
pub const DEFAULT_LOCATION: Coordinate = Coordinate::new(37.7749, -122.4194);

/// Validate a position reported by the client.
///
/// Both components missing means the client never obtained a position; one
/// missing, or values out of range, means it sent garbage.
pub fn parse_reported(lat: Option<f64>, lng: Option<f64>) -> Result<Coordinate, LocationError> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => {
            let c = Coordinate::new(lat, lng);
            if c.is_valid() {
                Ok(c)
            } else {
                Err(LocationError::InvalidCoordinate { lat, lng })
            }
        }
        (None, None) => Err(LocationError::Unavailable("no position reported".to_string())),
        (lat, lng) => Err(LocationError::InvalidCoordinate {
            lat: lat.unwrap_or(f64::NAN),
            lng: lng.unwrap_or(f64::NAN),
        }),
    }
}

/// The map center for a geolocation outcome: the position itself, or the
/// default location after logging the failure.
pub fn resolve_center(outcome: Result<Coordinate, LocationError>) -> Coordinate {
    match outcome {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "error getting location, using default");
            DEFAULT_LOCATION
        }
    }
}
