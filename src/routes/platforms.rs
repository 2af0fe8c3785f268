use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::state::SharedState;

pub async fn list_platforms(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let platforms: Vec<serde_json::Value> = state
        .registry
        .platforms()
        .into_iter()
        .filter_map(|key| {
            let poster = state.registry.lookup(&key)?;
            Some(json!({
                "platform": key,
                "poster": poster.name(),
            }))
        })
        .collect();

    Json(json!({ "platforms": platforms }))
}
