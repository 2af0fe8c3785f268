pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::models::QueueItem;

pub use http::HttpPoster;

/// What a marketplace reported back for one publish call.
#[derive(Debug, Clone, PartialEq)]
pub enum PostingResult {
    Success {
        external_post_id: Option<String>,
        external_post_url: Option<String>,
    },
    Failure {
        message: Option<String>,
    },
}

impl PostingResult {
    pub fn success(
        external_post_id: impl Into<String>,
        external_post_url: impl Into<String>,
    ) -> Self {
        PostingResult::Success {
            external_post_id: Some(external_post_id.into()),
            external_post_url: Some(external_post_url.into()),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        PostingResult::Failure {
            message: Some(message.into()),
        }
    }
}

/// A poster that gave up before producing a result. `message` is `None` when
/// the failure carried nothing readable.
#[derive(Debug, Clone, PartialEq)]
pub struct PostingError {
    pub message: Option<String>,
}

impl PostingError {
    pub fn unknown() -> Self {
        PostingError { message: None }
    }
}

impl std::fmt::Display for PostingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{message}"),
            None => write!(f, "Unknown error"),
        }
    }
}

impl std::error::Error for PostingError {}

impl From<String> for PostingError {
    fn from(s: String) -> Self {
        PostingError { message: Some(s) }
    }
}

impl From<&str> for PostingError {
    fn from(s: &str) -> Self {
        PostingError {
            message: Some(s.to_string()),
        }
    }
}

/// Publishes a listing on one marketplace.
#[async_trait]
pub trait PlatformPoster: Send + Sync {
    fn name(&self) -> &str;
    async fn post(&self, item: &QueueItem) -> Result<PostingResult, PostingError>;
}

/// Platform key -> poster. Filled at startup, read by every batch.
#[derive(Default)]
pub struct PosterRegistry {
    posters: DashMap<String, Arc<dyn PlatformPoster>>,
}

impl PosterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last registration for a key wins.
    pub fn register(&self, platform: impl Into<String>, poster: Arc<dyn PlatformPoster>) {
        let platform = platform.into();
        tracing::info!("Registered poster '{}' for platform {platform}", poster.name());
        if let Some(previous) = self.posters.insert(platform.clone(), poster) {
            tracing::debug!("Replaced poster '{}' for platform {platform}", previous.name());
        }
    }

    pub fn lookup(&self, platform: &str) -> Option<Arc<dyn PlatformPoster>> {
        self.posters.get(platform).map(|entry| Arc::clone(entry.value()))
    }

    pub fn platforms(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.posters.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    pub fn clear(&self) {
        self.posters.clear();
    }
}
