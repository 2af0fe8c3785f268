pub mod retry;

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{FutureExt, StreamExt, stream};

use crate::models::{QueueItem, QueueStatus};
use crate::posters::{PlatformPoster, PosterRegistry, PostingResult};
use crate::store::{QueueStore, StoreError, Transition};

pub use retry::RetryPolicy;

const UNKNOWN_ERROR: &str = "Unknown error";
const UNKNOWN_POSTING_ERROR: &str = "Unknown posting error";

#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// Items of one batch in flight at the same time.
    pub concurrency: usize,
    pub poster_timeout: Duration,
    pub retry_policy: RetryPolicy,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poster_timeout: Duration::from_secs(30),
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Drives pending queue items through their posters.
#[derive(Clone)]
pub struct QueueProcessor {
    store: Arc<dyn QueueStore>,
    registry: Arc<PosterRegistry>,
    options: ProcessorOptions,
}

impl QueueProcessor {
    pub fn new(
        store: Arc<dyn QueueStore>,
        registry: Arc<PosterRegistry>,
        options: ProcessorOptions,
    ) -> Self {
        Self {
            store,
            registry,
            options,
        }
    }

    /// Process up to `batch_size` due items, oldest first.
    ///
    /// Returns how many items were attempted, not how many were posted.
    /// Per-item failures are recorded on the item and never abort the batch;
    /// only a failed batch read is returned as an error.
    pub async fn process_queue(&self, batch_size: usize) -> Result<usize, StoreError> {
        if batch_size == 0 {
            return Ok(0);
        }

        let limit = i64::try_from(batch_size).unwrap_or(i64::MAX);
        let items = self.store.find_pending(limit, Utc::now()).await?;
        if items.is_empty() {
            return Ok(0);
        }

        let attempted = items.len();
        tracing::debug!("Processing batch of {attempted} queue items");

        stream::iter(items)
            .for_each_concurrent(self.options.concurrency.max(1), |item| self.run_item(item))
            .await;

        Ok(attempted)
    }

    async fn run_item(&self, item: QueueItem) {
        if let Err(e) = self.process_item(&item).await {
            tracing::error!("Queue item {} error: {e}", item.id);
        }
    }

    async fn process_item(&self, item: &QueueItem) -> Result<(), StoreError> {
        let Some(poster) = self.registry.lookup(&item.target_platform) else {
            let error_message = format!(
                "No posting handler registered for platform {}",
                item.target_platform
            );
            tracing::warn!("Queue item {}: {error_message}", item.id);
            let applied = self
                .store
                .apply(
                    item.id,
                    QueueStatus::Pending,
                    Transition::Failed { error_message },
                )
                .await?;
            if !applied {
                tracing::debug!("Queue item {} changed before it could be failed", item.id);
            }
            return Ok(());
        };

        if !self
            .store
            .apply(item.id, QueueStatus::Pending, Transition::Claim)
            .await?
        {
            tracing::debug!("Queue item {} already claimed elsewhere, skipping", item.id);
            return Ok(());
        }

        tracing::debug!(
            "Claimed queue item {} (listing={}, platform={}, retry={}/{})",
            item.id,
            item.listing_id,
            item.target_platform,
            item.retry_count,
            item.max_retries
        );

        let result = self.dispatch(poster.as_ref(), item).await;
        let transition = settle(item, result, Utc::now(), &self.options.retry_policy);
        log_transition(item, &transition);

        if !self
            .store
            .apply(item.id, QueueStatus::InProgress, transition)
            .await?
        {
            tracing::warn!("Queue item {} left IN_PROGRESS by another writer", item.id);
        }
        Ok(())
    }

    /// Run the poster under the configured timeout. Whatever goes wrong comes
    /// back as a `Failure`.
    async fn dispatch(&self, poster: &dyn PlatformPoster, item: &QueueItem) -> PostingResult {
        let call = AssertUnwindSafe(poster.post(item)).catch_unwind();
        match tokio::time::timeout(self.options.poster_timeout, call).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(err))) => PostingResult::Failure {
                message: Some(err.message.unwrap_or_else(|| UNKNOWN_ERROR.to_string())),
            },
            Ok(Err(_)) => {
                tracing::error!(
                    "Poster '{}' panicked on queue item {}",
                    poster.name(),
                    item.id
                );
                PostingResult::failure(UNKNOWN_ERROR)
            }
            Err(_) => PostingResult::failure(format!(
                "Posting to {} timed out after {:?}",
                item.target_platform, self.options.poster_timeout
            )),
        }
    }
}

/// Decide the write that follows a poster call on a claimed item.
fn settle(
    item: &QueueItem,
    result: PostingResult,
    now: DateTime<Utc>,
    policy: &RetryPolicy,
) -> Transition {
    match result {
        PostingResult::Success {
            external_post_id,
            external_post_url,
        } => Transition::Posted {
            external_post_id,
            external_post_url,
            posted_at: now,
        },
        PostingResult::Failure { message } => {
            let error_message = message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| UNKNOWN_POSTING_ERROR.to_string());
            if item.retries_remaining() {
                let retry_count = item.retry_count + 1;
                Transition::Retry {
                    retry_count,
                    error_message,
                    scheduled_at: policy.next_attempt_at(now, retry_count),
                }
            } else {
                Transition::Failed { error_message }
            }
        }
    }
}

fn log_transition(item: &QueueItem, transition: &Transition) {
    match transition {
        Transition::Posted {
            external_post_url, ..
        } => tracing::info!(
            "Posted listing {} to {} ({})",
            item.listing_id,
            item.target_platform,
            external_post_url.as_deref().unwrap_or("no url")
        ),
        Transition::Retry {
            retry_count,
            error_message,
            ..
        } => tracing::warn!(
            "Posting listing {} to {} failed, retry {retry_count}/{}: {error_message}",
            item.listing_id,
            item.target_platform,
            item.max_retries
        ),
        Transition::Failed { error_message } => tracing::warn!(
            "Posting listing {} to {} failed permanently: {error_message}",
            item.listing_id,
            item.target_platform
        ),
        Transition::Claim => {}
    }
}
