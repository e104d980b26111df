//! RSS/Atom feed connector.
//!
//! One instance per configured feed. Feed parsing is delegated to
//! `feed-rs`, which accepts RSS 0.9x/2.0, Atom, and JSON Feed.

use async_trait::async_trait;
use chrono::Utc;
use feed_rs::model::Entry;

use crate::config::RssConnectorConfig;
use crate::error::FetchError;
use crate::models::Item;
use crate::traits::Connector;

pub struct RssConnector {
    client: reqwest::Client,
    name: String,
    url: String,
    description: String,
}

impl RssConnector {
    pub fn new(client: reqwest::Client, config: &RssConnectorConfig) -> Self {
        Self {
            client,
            name: config.name.clone(),
            url: config.url.clone(),
            description: format!("RSS/Atom feed {}", config.url),
        }
    }
}

#[async_trait]
impl Connector for RssConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn connector_type(&self) -> &str {
        "rss"
    }

    async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|cause| FetchError::Transport {
                source_name: self.name.clone(),
                cause,
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                source_name: self.name.clone(),
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        let bytes = resp.bytes().await.map_err(|cause| FetchError::Transport {
            source_name: self.name.clone(),
            cause,
        })?;

        parse_feed(&self.name, &bytes)
    }
}

/// Parse a feed document into items tagged with `source`.
///
/// Entries without a link are skipped; everything else maps onto the
/// canonical item shape with empty strings for missing text.
pub fn parse_feed(source: &str, bytes: &[u8]) -> Result<Vec<Item>, FetchError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FetchError::Parse {
        source_name: source.to_string(),
        message: format!("failed to parse feed: {}", e),
    })?;

    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| entry_to_item(source, entry))
        .collect())
}

fn entry_to_item(source: &str, entry: Entry) -> Option<Item> {
    let url = entry.links.first().map(|l| l.href.clone())?;

    let title = entry.title.map(|t| t.content).unwrap_or_default();

    let description = entry
        .summary
        .map(|s| s.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();

    let author = entry
        .authors
        .first()
        .map(|p| p.name.clone())
        .unwrap_or_default();

    let published_at = entry.published.or(entry.updated).unwrap_or_else(Utc::now);

    Some(Item::new(
        source,
        title.trim(),
        url,
        description.trim(),
        author,
        published_at,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Lobsters</title>
    <link>https://lobste.rs/</link>
    <description>test</description>
    <item>
      <title>Writing a parser in Rust</title>
      <link>https://example.com/parser</link>
      <description>Combinators all the way down</description>
      <author>alice@example.com (alice)</author>
      <pubDate>Mon, 06 Jan 2025 10:00:00 +0000</pubDate>
    </item>
    <item>
      <title>No date here</title>
      <link>https://example.com/nodate</link>
    </item>
    <item>
      <title>No link, skipped</title>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Trending</title>
  <id>urn:trending</id>
  <updated>2025-01-06T12:00:00Z</updated>
  <entry>
    <title>owner/repo</title>
    <id>urn:repo</id>
    <link href="https://github.com/owner/repo"/>
    <updated>2025-01-06T12:00:00Z</updated>
    <summary>A fast thing</summary>
    <author><name>owner</name></author>
  </entry>
</feed>"#;

    #[test]
    fn test_rss_entries_mapped() {
        let items = parse_feed("Lobsters", RSS.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.source, "Lobsters");
        assert_eq!(first.title, "Writing a parser in Rust");
        assert_eq!(first.url, "https://example.com/parser");
        assert_eq!(first.description, "Combinators all the way down");
        assert_eq!(
            first.published_at.to_rfc3339(),
            "2025-01-06T10:00:00+00:00"
        );
        assert_eq!(first.total(), 0);
    }

    #[test]
    fn test_missing_date_defaults_to_now() {
        let before = Utc::now();
        let items = parse_feed("Lobsters", RSS.as_bytes()).unwrap();
        let nodate = &items[1];
        assert!(nodate.published_at >= before);
        assert_eq!(nodate.author, "");
        assert_eq!(nodate.description, "");
    }

    #[test]
    fn test_atom_entry_mapped() {
        let items = parse_feed("GitHub", ATOM.as_bytes()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "https://github.com/owner/repo");
        assert_eq!(items[0].author, "owner");
        assert_eq!(items[0].description, "A fast thing");
        assert_eq!(items[0].published_at.to_rfc3339(), "2025-01-06T12:00:00+00:00");
    }

    #[test]
    fn test_garbage_is_parse_error() {
        let err = parse_feed("Broken", b"<html>not a feed").unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
        assert_eq!(err.source_name(), "Broken");
    }
}
