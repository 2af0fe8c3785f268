use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{QueueStore, StoreError, Transition};
use crate::db;
use crate::models::{NewQueueItem, QueueItem, QueueStatus};

/// Queue store backed by the `posting_queue` table.
#[derive(Clone)]
pub struct PgQueueStore {
    pool: PgPool,
}

impl PgQueueStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QueueStore for PgQueueStore {
    async fn enqueue(
        &self,
        item: NewQueueItem,
        default_max_retries: i32,
    ) -> Result<QueueItem, StoreError> {
        let max_retries = item.max_retries.unwrap_or(default_max_retries);
        let created = db::posting_queue::enqueue(
            &self.pool,
            item.listing_id,
            item.user_id,
            &item.target_platform,
            max_retries,
        )
        .await?;
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<QueueItem>, StoreError> {
        Ok(db::posting_queue::find_by_id(&self.pool, id).await?)
    }

    async fn find_pending(
        &self,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<QueueItem>, StoreError> {
        Ok(db::posting_queue::find_pending(&self.pool, limit, now).await?)
    }

    async fn apply(
        &self,
        id: Uuid,
        expected: QueueStatus,
        transition: Transition,
    ) -> Result<bool, StoreError> {
        let applied = match transition {
            Transition::Claim => db::posting_queue::claim(&self.pool, id, expected).await?,
            Transition::Posted {
                external_post_id,
                external_post_url,
                posted_at,
            } => {
                db::posting_queue::mark_posted(
                    &self.pool,
                    id,
                    expected,
                    external_post_id.as_deref(),
                    external_post_url.as_deref(),
                    posted_at,
                )
                .await?
            }
            Transition::Retry {
                retry_count,
                error_message,
                scheduled_at,
            } => {
                db::posting_queue::mark_retry(
                    &self.pool,
                    id,
                    expected,
                    retry_count,
                    &error_message,
                    scheduled_at,
                )
                .await?
            }
            Transition::Failed { error_message } => {
                db::posting_queue::mark_failed(&self.pool, id, expected, &error_message).await?
            }
        };
        Ok(applied)
    }

    async fn count(&self, user_id: Uuid, status: QueueStatus) -> Result<i64, StoreError> {
        Ok(db::posting_queue::count(&self.pool, user_id, status).await?)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<QueueStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QueueItem>, StoreError> {
        Ok(db::posting_queue::list_by_user(&self.pool, user_id, status, limit, offset).await?)
    }
}
