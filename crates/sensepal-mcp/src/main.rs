mod rate_limit;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sensepal_common::discovery::DEFAULT_RADIUS_M;
use sensepal_common::error::PlacesError;
use sensepal_common::places::{GooglePlacesClient, PlacesClientConfig};

use server::{SensePalServer, SharedProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries MCP JSON-RPC, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting sensepal MCP server");

    let places_config = PlacesClientConfig::from_env();
    info!(
        base_url = %places_config.base_url,
        timeout_ms = places_config.timeout.as_millis(),
        "places client configured"
    );
    let provider: Option<SharedProvider> = match GooglePlacesClient::new(places_config) {
        Ok(client) => Some(Arc::new(client) as SharedProvider),
        Err(PlacesError::MissingApiKey) => {
            warn!("GOOGLE_MAPS_API_KEY not set, place tools will report unavailable");
            None
        }
        Err(e) => return Err(e.into()),
    };

    let radius_m = std::env::var("SEARCH_RADIUS_M")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|&r| r > 0)
        .unwrap_or(DEFAULT_RADIUS_M);

    let limiter = rate_limit::RateLimiter::from_env();
    if limiter.is_some() {
        info!("places rate limit enabled");
    }

    let server = SensePalServer::new(provider, radius_m, limiter);

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
