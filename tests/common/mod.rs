#![allow(dead_code)]

pub mod pg;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crosspost::config::Config;
use crosspost::models::{QueueItem, QueueStatus};
use crosspost::posters::{PlatformPoster, PosterRegistry, PostingError, PostingResult};
use crosspost::processor::{ProcessorOptions, QueueProcessor, RetryPolicy};
use crosspost::store::MemoryQueueStore;

/// What a [`MockPoster`] does on every call.
#[derive(Clone)]
pub enum Behavior {
    Respond(PostingResult),
    Error(PostingError),
    Panic,
    Hang,
}

pub struct MockPoster {
    behavior: Behavior,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockPoster {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Self::with_delay(behavior, Duration::ZERO)
    }

    pub fn with_delay(behavior: Behavior, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            delay,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new(Behavior::Respond(PostingResult::success(
            "ext-123",
            "https://ebay.com/123",
        )))
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Self::new(Behavior::Respond(PostingResult::failure(message)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlatformPoster for MockPoster {
    fn name(&self) -> &str {
        "mock"
    }

    async fn post(&self, _item: &QueueItem) -> Result<PostingResult, PostingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.behavior {
            Behavior::Respond(result) => Ok(result.clone()),
            Behavior::Error(err) => Err(err.clone()),
            Behavior::Panic => panic!("poster blew up"),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(PostingError::from("unreachable"))
            }
        }
    }
}

pub struct Harness {
    pub store: Arc<MemoryQueueStore>,
    pub registry: Arc<PosterRegistry>,
    pub processor: QueueProcessor,
}

/// Memory store + empty registry, retries eligible immediately.
pub fn harness() -> Harness {
    harness_with(ProcessorOptions {
        concurrency: 4,
        poster_timeout: Duration::from_secs(5),
        retry_policy: RetryPolicy::immediate(),
    })
}

pub fn harness_with(options: ProcessorOptions) -> Harness {
    let store = Arc::new(MemoryQueueStore::with_write_log());
    let registry = Arc::new(PosterRegistry::new());
    let processor = QueueProcessor::new(store.clone(), registry.clone(), options);
    Harness {
        store,
        registry,
        processor,
    }
}

pub fn item(user_id: Uuid, platform: &str, retry_count: i32, max_retries: i32) -> QueueItem {
    item_at(user_id, platform, retry_count, max_retries, Utc::now())
}

pub fn item_at(
    user_id: Uuid,
    platform: &str,
    retry_count: i32,
    max_retries: i32,
    created_at: DateTime<Utc>,
) -> QueueItem {
    QueueItem {
        id: Uuid::now_v7(),
        listing_id: Uuid::now_v7(),
        user_id,
        target_platform: platform.to_string(),
        status: QueueStatus::Pending,
        retry_count,
        max_retries,
        external_post_id: None,
        external_post_url: None,
        posted_at: None,
        error_message: None,
        scheduled_at: None,
        created_at,
    }
}

pub fn with_status(mut item: QueueItem, status: QueueStatus) -> QueueItem {
    item.status = status;
    item
}

pub fn test_config() -> Config {
    Config {
        database_url: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 0,
        log_level: "warn".to_string(),
        batch_size: 10,
        concurrency: 2,
        poster_timeout_secs: 5,
        poll_interval_secs: 0,
        worker_threads: 1,
        default_max_retries: 3,
        retry_base_secs: 0,
        retry_max_secs: 0,
        platforms: vec![],
    }
}
