pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{NewQueueItem, QueueItem, QueueStatus};

pub use memory::MemoryQueueStore;
pub use postgres::PgQueueStore;

#[derive(Debug)]
pub enum StoreError {
    Database(sqlx::Error),
    Internal(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Database(err) => write!(f, "Database Error: {err}"),
            StoreError::Internal(msg) => write!(f, "Store Error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err)
    }
}

/// A state change written to one queue item.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Claim,
    Posted {
        external_post_id: Option<String>,
        external_post_url: Option<String>,
        posted_at: DateTime<Utc>,
    },
    Retry {
        retry_count: i32,
        error_message: String,
        scheduled_at: Option<DateTime<Utc>>,
    },
    Failed {
        error_message: String,
    },
}

impl Transition {
    pub fn target(&self) -> QueueStatus {
        match self {
            Transition::Claim => QueueStatus::InProgress,
            Transition::Posted { .. } => QueueStatus::Posted,
            Transition::Retry { .. } => QueueStatus::Pending,
            Transition::Failed { .. } => QueueStatus::Failed,
        }
    }
}

/// Persistent collection of queue items.
///
/// `apply` is the only write path for existing items and must be a single
/// conditional update: it changes the row only while its status still equals
/// `expected`, and reports whether it did.
#[async_trait]
pub trait QueueStore: Send + Sync {
    async fn enqueue(
        &self,
        item: NewQueueItem,
        default_max_retries: i32,
    ) -> Result<QueueItem, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<QueueItem>, StoreError>;

    /// Oldest-first `PENDING` items whose `scheduled_at` is unset or due at `now`.
    async fn find_pending(
        &self,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<QueueItem>, StoreError>;

    async fn apply(
        &self,
        id: Uuid,
        expected: QueueStatus,
        transition: Transition,
    ) -> Result<bool, StoreError>;

    async fn count(&self, user_id: Uuid, status: QueueStatus) -> Result<i64, StoreError>;

    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<QueueStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QueueItem>, StoreError>;
}
