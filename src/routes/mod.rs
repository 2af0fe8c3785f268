pub mod platforms;
pub mod queue;

use axum::routing::{get, post};
use axum::Router;

use crate::state::SharedState;

pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Queue items
        .route("/api/v1/queue", post(queue::enqueue))
        .route("/api/v1/queue/process", post(queue::process))
        .route("/api/v1/queue/{id}", get(queue::get))
        // Per-user views
        .route("/api/v1/users/{user_id}/queue", get(queue::list_by_user))
        .route("/api/v1/users/{user_id}/queue/stats", get(queue::stats))
        // Platforms
        .route("/api/v1/platforms", get(platforms::list_platforms))
}
