//! Hacker News connector.
//!
//! Reads the ranked top-stories id list from the Firebase API and resolves
//! each id into a story. Only the first `limit` ids are resolved per
//! cycle. A story that fails to resolve is skipped; only a failure of the
//! id list itself fails the batch.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::config::HackerNewsConnectorConfig;
use crate::error::FetchError;
use crate::models::Item;
use crate::traits::Connector;

pub const SOURCE_NAME: &str = "HackerNews";

/// Story payload from `/v0/item/{id}.json`.
#[derive(Debug, Deserialize)]
struct HnStory {
    id: u64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    by: String,
    #[serde(default)]
    time: i64,
    #[serde(default)]
    text: String,
}

pub struct HackerNewsConnector {
    client: reqwest::Client,
    base_url: String,
    limit: usize,
}

impl HackerNewsConnector {
    pub fn new(client: reqwest::Client, config: &HackerNewsConnectorConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limit: config.limit,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|cause| FetchError::Transport {
                source_name: SOURCE_NAME.to_string(),
                cause,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: SOURCE_NAME.to_string(),
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        resp.json::<T>().await.map_err(|e| FetchError::Parse {
            source_name: SOURCE_NAME.to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_story(&self, id: u64) -> Result<Item, FetchError> {
        let url = format!("{}/v0/item/{}.json", self.base_url, id);
        let story: Option<HnStory> = self.get_json(&url).await?;
        story
            .map(story_to_item)
            .ok_or_else(|| FetchError::Parse {
                source_name: SOURCE_NAME.to_string(),
                message: format!("item {} not found", id),
            })
    }
}

fn story_to_item(story: HnStory) -> Item {
    let url = story
        .url
        .filter(|u| !u.trim().is_empty())
        .unwrap_or_else(|| format!("https://news.ycombinator.com/item?id={}", story.id));

    let published_at = Utc
        .timestamp_opt(story.time, 0)
        .single()
        .unwrap_or_else(Utc::now);

    Item::new(
        SOURCE_NAME,
        story.title,
        url,
        story.text,
        story.by,
        published_at,
    )
}

#[async_trait]
impl Connector for HackerNewsConnector {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn description(&self) -> &str {
        "Hacker News top stories"
    }

    fn connector_type(&self) -> &str {
        "hackernews"
    }

    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        let ids_url = format!("{}/v0/topstories.json", self.base_url);
        let ids: Vec<u64> = self.get_json(&ids_url).await?;

        let mut items = Vec::with_capacity(self.limit.min(ids.len()));
        for id in ids.into_iter().take(self.limit) {
            match self.fetch_story(id).await {
                Ok(item) => items.push(item),
                Err(e) => debug!(id, error = %e, "skipping unresolvable story"),
            }
        }

        Ok(items)
    }
}
