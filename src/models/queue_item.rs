use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "queue_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueueStatus {
    Pending,
    InProgress,
    Posted,
    Failed,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Pending => "PENDING",
            QueueStatus::InProgress => "IN_PROGRESS",
            QueueStatus::Posted => "POSTED",
            QueueStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request to publish a listing on one marketplace.
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub user_id: Uuid,
    pub target_platform: String,
    pub status: QueueStatus,
    pub retry_count: i32,
    pub max_retries: i32,
    pub external_post_id: Option<String>,
    pub external_post_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl QueueItem {
    pub fn retries_remaining(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

/// Fields supplied by the publication flow when a user picks a platform.
#[derive(Debug, Clone, Deserialize)]
pub struct NewQueueItem {
    pub listing_id: Uuid,
    pub user_id: Uuid,
    pub target_platform: String,
    pub max_retries: Option<i32>,
}
