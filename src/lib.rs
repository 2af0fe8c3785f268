pub mod config;
pub mod error;
pub mod state;
pub mod db;
pub mod models;
pub mod store;
pub mod posters;
pub mod processor;
pub mod stats;
pub mod routes;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::posters::{HttpPoster, PosterRegistry};
use crate::state::SharedState;

/// Register one HTTP bridge poster per configured platform.
pub fn build_registry(config: &Config) -> Result<PosterRegistry, String> {
    let registry = PosterRegistry::new();
    // Outlive the processor's own timeout so a hung bridge always reports as a timeout there.
    let timeout = Duration::from_secs(config.poster_timeout_secs + 5);

    for platform in &config.platforms {
        let poster = HttpPoster::new(
            platform.key.clone(),
            platform.url.clone(),
            platform.token.clone(),
            timeout,
        )
        .map_err(|e| format!("Failed to build poster for {}: {e}", platform.key))?;
        registry.register(platform.key.clone(), Arc::new(poster));
    }

    if registry.platforms().is_empty() {
        tracing::warn!("No marketplace posters configured; queued items will fail");
    }

    Ok(registry)
}

pub fn build_app(state: SharedState) -> Router {
    Router::new()
        .merge(routes::api_routes())
        .route("/health", axum::routing::get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
