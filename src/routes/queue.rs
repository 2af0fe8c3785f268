use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{NewQueueItem, QueueItem, QueueStats, QueueStatus};
use crate::state::SharedState;
use crate::stats::get_queue_stats;

#[derive(Deserialize)]
pub struct ListParams {
    pub status: Option<QueueStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Deserialize)]
pub struct ProcessRequest {
    pub batch_size: Option<usize>,
}

pub async fn enqueue(
    State(state): State<SharedState>,
    Json(mut req): Json<NewQueueItem>,
) -> Result<Json<QueueItem>, AppError> {
    req.target_platform = req.target_platform.trim().to_lowercase();
    if req.target_platform.is_empty() {
        return Err(AppError::BadRequest("target_platform is required".to_string()));
    }
    if req.max_retries.is_some_and(|n| n < 0) {
        return Err(AppError::BadRequest("max_retries must not be negative".to_string()));
    }

    let item = state
        .store
        .enqueue(req, state.config.default_max_retries)
        .await?;

    tracing::debug!(
        "Queued listing {} for {} (item={})",
        item.listing_id,
        item.target_platform,
        item.id
    );
    Ok(Json(item))
}

pub async fn get(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<QueueItem>, AppError> {
    let item = state
        .store
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Queue item not found".to_string()))?;
    Ok(Json(item))
}

pub async fn list_by_user(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<QueueItem>>, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let per_page = params.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let items = state
        .store
        .list_by_user(user_id, params.status, per_page, offset)
        .await?;
    Ok(Json(items))
}

pub async fn stats(
    State(state): State<SharedState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<QueueStats>, AppError> {
    let stats = get_queue_stats(state.store.as_ref(), user_id).await?;
    Ok(Json(stats))
}

/// Manual trigger for one batch, alongside the background scheduler.
pub async fn process(
    State(state): State<SharedState>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let batch_size = req.batch_size.unwrap_or(state.config.batch_size);
    let processed = state.processor.process_queue(batch_size).await?;
    Ok(Json(json!({ "processed": processed })))
}
