//! In-process queue store.
//!
//! Used by the test suite and by deployments that run without `DATABASE_URL`.
//! A store built with [`MemoryQueueStore::with_write_log`] records every
//! successful write so callers can inspect the exact sequence of transitions
//! an item went through.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{QueueStore, StoreError, Transition};
use crate::models::{NewQueueItem, QueueItem, QueueStatus};

/// One applied write: which item moved from which status to which.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRecord {
    pub id: Uuid,
    pub from: QueueStatus,
    pub to: QueueStatus,
}

#[derive(Default)]
struct MemoryState {
    items: HashMap<Uuid, QueueItem>,
    /// Insertion sequence, breaks ties between equal `created_at` values.
    sequence: HashMap<Uuid, u64>,
    next_sequence: u64,
    /// `None` unless the write log was requested.
    writes: Option<Vec<WriteRecord>>,
}

impl MemoryState {
    fn insert(&mut self, item: QueueItem) {
        self.sequence.insert(item.id, self.next_sequence);
        self.next_sequence += 1;
        self.items.insert(item.id, item);
    }

    fn ordered<'a>(&'a self, items: &mut Vec<&'a QueueItem>) {
        items.sort_by_key(|item| (item.created_at, self.sequence.get(&item.id).copied()));
    }
}

#[derive(Default)]
pub struct MemoryQueueStore {
    state: Mutex<MemoryState>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that keeps every applied transition. The log is never
    /// trimmed, so this is meant for tests.
    pub fn with_write_log() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                writes: Some(Vec::new()),
                ..MemoryState::default()
            }),
        }
    }

    /// Store a fully formed item as-is, bypassing `enqueue` defaults.
    pub async fn insert(&self, item: QueueItem) {
        self.state.lock().await.insert(item);
    }

    /// Empty when the store was built without a write log.
    pub async fn writes(&self) -> Vec<WriteRecord> {
        self.state.lock().await.writes.clone().unwrap_or_default()
    }

    pub async fn writes_for(&self, id: Uuid) -> Vec<WriteRecord> {
        self.state
            .lock()
            .await
            .writes
            .iter()
            .flatten()
            .filter(|w| w.id == id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn enqueue(
        &self,
        item: NewQueueItem,
        default_max_retries: i32,
    ) -> Result<QueueItem, StoreError> {
        let created = QueueItem {
            id: Uuid::now_v7(),
            listing_id: item.listing_id,
            user_id: item.user_id,
            target_platform: item.target_platform,
            status: QueueStatus::Pending,
            retry_count: 0,
            max_retries: item.max_retries.unwrap_or(default_max_retries),
            external_post_id: None,
            external_post_url: None,
            posted_at: None,
            error_message: None,
            scheduled_at: None,
            created_at: Utc::now(),
        };
        self.state.lock().await.insert(created.clone());
        Ok(created)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<QueueItem>, StoreError> {
        Ok(self.state.lock().await.items.get(&id).cloned())
    }

    async fn find_pending(
        &self,
        limit: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<QueueItem>, StoreError> {
        let limit = usize::try_from(limit)
            .map_err(|_| StoreError::Internal(format!("invalid limit {limit}")))?;
        let state = self.state.lock().await;
        let mut due: Vec<&QueueItem> = state
            .items
            .values()
            .filter(|item| item.status == QueueStatus::Pending)
            .filter(|item| item.scheduled_at.is_none_or(|at| at <= now))
            .collect();
        state.ordered(&mut due);
        Ok(due.into_iter().take(limit).cloned().collect())
    }

    async fn apply(
        &self,
        id: Uuid,
        expected: QueueStatus,
        transition: Transition,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let Some(item) = state.items.get_mut(&id) else {
            return Ok(false);
        };
        if item.status != expected {
            return Ok(false);
        }

        let to = transition.target();
        match transition {
            Transition::Claim => {}
            Transition::Posted {
                external_post_id,
                external_post_url,
                posted_at,
            } => {
                item.external_post_id = external_post_id;
                item.external_post_url = external_post_url;
                item.posted_at = Some(posted_at);
            }
            Transition::Retry {
                retry_count,
                error_message,
                scheduled_at,
            } => {
                if retry_count > item.max_retries {
                    return Err(StoreError::Internal(format!(
                        "retry_count {retry_count} exceeds max_retries {} for {id}",
                        item.max_retries
                    )));
                }
                item.retry_count = retry_count;
                item.error_message = Some(error_message);
                item.scheduled_at = scheduled_at;
            }
            Transition::Failed { error_message } => {
                item.error_message = Some(error_message);
            }
        }
        item.status = to;

        if let Some(writes) = state.writes.as_mut() {
            writes.push(WriteRecord {
                id,
                from: expected,
                to,
            });
        }
        Ok(true)
    }

    async fn count(&self, user_id: Uuid, status: QueueStatus) -> Result<i64, StoreError> {
        let state = self.state.lock().await;
        let n = state
            .items
            .values()
            .filter(|item| item.user_id == user_id && item.status == status)
            .count();
        Ok(n as i64)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<QueueStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QueueItem>, StoreError> {
        let state = self.state.lock().await;
        let mut owned: Vec<&QueueItem> = state
            .items
            .values()
            .filter(|item| item.user_id == user_id)
            .filter(|item| status.is_none_or(|s| item.status == s))
            .collect();
        state.ordered(&mut owned);
        owned.reverse();
        Ok(owned
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
