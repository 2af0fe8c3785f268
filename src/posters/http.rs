use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{PlatformPoster, PostingError, PostingResult};
use crate::models::QueueItem;

/// Forwards queue items to a marketplace bridge over HTTP.
///
/// The bridge answers 2xx with `{"id": ..., "url": "..."}` when the listing
/// went live; any other status is a failed attempt. A numeric `id` is kept as
/// text. A 2xx with a body that is not JSON is a failed attempt too.
pub struct HttpPoster {
    platform: String,
    url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpPoster {
    pub fn new(
        platform: impl Into<String>,
        url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            platform: platform.into(),
            url: url.into(),
            token,
            client: reqwest::Client::builder().timeout(timeout).build()?,
        })
    }
}

#[async_trait]
impl PlatformPoster for HttpPoster {
    fn name(&self) -> &str {
        &self.platform
    }

    async fn post(&self, item: &QueueItem) -> Result<PostingResult, PostingError> {
        let body = json!({
            "queue_item_id": item.id,
            "listing_id": item.listing_id,
            "user_id": item.user_id,
            "platform": &item.target_platform,
            "attempt": item.retry_count + 1,
        });

        let mut req = self.client.post(&self.url).json(&body);
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| PostingError::from(format!("{} request failed: {e}", self.platform)))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(256)
                .collect::<String>();
            let message = if detail.is_empty() {
                format!("{} responded with status {}", self.platform, status.as_u16())
            } else {
                format!(
                    "{} responded with status {}: {detail}",
                    self.platform,
                    status.as_u16()
                )
            };
            return Ok(PostingResult::failure(message));
        }

        let body = resp.text().await.map_err(|e| {
            PostingError::from(format!("{} response unreadable: {e}", self.platform))
        })?;
        if body.trim().is_empty() {
            tracing::warn!("{} accepted the listing without returning ids", self.platform);
            return Ok(PostingResult::Success {
                external_post_id: None,
                external_post_url: None,
            });
        }

        let Ok(parsed) = serde_json::from_str::<serde_json::Value>(&body) else {
            tracing::warn!(
                "{} returned a non-JSON body with status {}",
                self.platform,
                status.as_u16()
            );
            return Ok(PostingResult::failure(format!(
                "{} returned an unreadable response with status {}",
                self.platform,
                status.as_u16()
            )));
        };

        Ok(PostingResult::Success {
            external_post_id: scalar_field(&parsed, "id"),
            external_post_url: scalar_field(&parsed, "url"),
        })
    }
}

/// A string or number field of the bridge reply, as text.
fn scalar_field(body: &serde_json::Value, field: &str) -> Option<String> {
    match body.get(field)? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
