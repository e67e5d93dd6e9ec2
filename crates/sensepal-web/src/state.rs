use std::sync::Arc;

use tracing::{info, warn};

use sensepal_common::discovery::Discovery;
use sensepal_common::error::PlacesError;
use sensepal_common::places::{GooglePlacesClient, PlacesProvider};

use crate::config::Config;
use crate::error::AppError;

pub type SharedProvider = Arc<dyn PlacesProvider>;

/// Provider handles, present only when an API key is configured.
#[derive(Clone)]
pub struct Places {
    pub provider: SharedProvider,
    pub discovery: Arc<Discovery<SharedProvider>>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    places: Option<Places>,
}

impl AppState {
    /// Build state from configuration. A missing API key leaves the app running
    /// in map-unavailable mode instead of failing startup.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        match GooglePlacesClient::new(config.places.clone()) {
            Ok(client) => {
                info!(base_url = %client.config().base_url, "places client configured");
                Ok(Self::with_provider(config, Arc::new(client)))
            }
            Err(PlacesError::MissingApiKey) => {
                warn!("GOOGLE_MAPS_API_KEY not set, map will not load");
                Ok(Self {
                    config: Arc::new(config),
                    places: None,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn with_provider(config: Config, provider: SharedProvider) -> Self {
        let discovery = Discovery::new(Arc::clone(&provider), config.radius_m)
            .with_sub_search_timeout(config.sub_search_timeout);
        Self {
            config: Arc::new(config),
            places: Some(Places {
                provider,
                discovery: Arc::new(discovery),
            }),
        }
    }

    pub fn places(&self) -> Result<&Places, AppError> {
        self.places.as_ref().ok_or(AppError::MapUnavailable)
    }
}
