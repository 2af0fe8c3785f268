use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{QueueItem, QueueStatus};

pub async fn enqueue(
    pool: &PgPool,
    listing_id: Uuid,
    user_id: Uuid,
    target_platform: &str,
    max_retries: i32,
) -> Result<QueueItem, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>(
        "INSERT INTO posting_queue (id, listing_id, user_id, target_platform, max_retries)
         VALUES ($1, $2, $3, $4, $5) RETURNING *",
    )
    .bind(Uuid::now_v7())
    .bind(listing_id)
    .bind(user_id)
    .bind(target_platform)
    .bind(max_retries)
    .fetch_one(pool)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<QueueItem>, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>("SELECT * FROM posting_queue WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Oldest pending items that are due. Items deferred by a retry backoff stay
/// invisible until their `scheduled_at` passes.
pub async fn find_pending(
    pool: &PgPool,
    limit: i64,
    now: DateTime<Utc>,
) -> Result<Vec<QueueItem>, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>(
        "SELECT * FROM posting_queue
         WHERE status = 'PENDING'
           AND (scheduled_at IS NULL OR scheduled_at <= $2)
         ORDER BY created_at ASC, id ASC
         LIMIT $1",
    )
    .bind(limit)
    .bind(now)
    .fetch_all(pool)
    .await
}

/// Move an item to IN_PROGRESS only if it is still in `expected`.
/// Returns false when another processor got there first.
pub async fn claim(pool: &PgPool, id: Uuid, expected: QueueStatus) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE posting_queue SET status = 'IN_PROGRESS'
         WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(expected)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_posted(
    pool: &PgPool,
    id: Uuid,
    expected: QueueStatus,
    external_post_id: Option<&str>,
    external_post_url: Option<&str>,
    posted_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE posting_queue
         SET status = 'POSTED',
             external_post_id = $3,
             external_post_url = $4,
             posted_at = $5
         WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(expected)
    .bind(external_post_id)
    .bind(external_post_url)
    .bind(posted_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Put a failed item back in line. The CHECK constraint on the table keeps
/// `retry_count` from passing `max_retries`.
pub async fn mark_retry(
    pool: &PgPool,
    id: Uuid,
    expected: QueueStatus,
    retry_count: i32,
    error: &str,
    scheduled_at: Option<DateTime<Utc>>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE posting_queue
         SET status = 'PENDING',
             retry_count = $3,
             error_message = $4,
             scheduled_at = $5
         WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(expected)
    .bind(retry_count)
    .bind(error)
    .bind(scheduled_at)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn mark_failed(
    pool: &PgPool,
    id: Uuid,
    expected: QueueStatus,
    error: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE posting_queue SET status = 'FAILED', error_message = $3
         WHERE id = $1 AND status = $2",
    )
    .bind(id)
    .bind(expected)
    .bind(error)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn count(pool: &PgPool, user_id: Uuid, status: QueueStatus) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM posting_queue WHERE user_id = $1 AND status = $2",
    )
    .bind(user_id)
    .bind(status)
    .fetch_one(pool)
    .await
}

pub async fn list_by_user(
    pool: &PgPool,
    user_id: Uuid,
    status: Option<QueueStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<QueueItem>, sqlx::Error> {
    sqlx::query_as::<_, QueueItem>(
        "SELECT * FROM posting_queue
         WHERE user_id = $1 AND ($2::queue_status IS NULL OR status = $2)
         ORDER BY created_at DESC LIMIT $3 OFFSET $4",
    )
    .bind(user_id)
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
