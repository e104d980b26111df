//! Extension traits for sources and scoring backends.
//!
//! The pipeline only talks to these traits, so custom sources and fake
//! scorers plug in without touching orchestration code.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │           ConnectorRegistry              │
//! │  ┌──────────┐ ┌─────────┐ ┌───────────┐ │
//! │  │HackerNews│ │RSS/Atom │ │  Custom   │ │
//! │  │          │ │ feeds   │ │  (Rust)   │ │
//! │  └──────────┘ └─────────┘ └───────────┘ │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!     Pipeline::run_cycle() → Scorer → gate → ItemStore
//! ```

use async_trait::async_trait;
use std::time::Duration;

use crate::config::Config;
use crate::connector_hn::HackerNewsConnector;
use crate::connector_rss::RssConnector;
use crate::error::{FetchError, ScoringError};
use crate::models::{Item, ScoreResult};

// ═══════════════════════════════════════════════════════════════════════
// Connector Trait
// ═══════════════════════════════════════════════════════════════════════

/// A content source that produces candidate items.
///
/// # Contract
///
/// - Every returned [`Item`] has source, title, url, description, author,
///   and published time populated, and a zeroed score.
/// - A transport or parse failure of the whole batch is a [`FetchError`];
///   it only skips this connector for the current cycle.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use chrono::Utc;
/// use info_sieve::error::FetchError;
/// use info_sieve::models::Item;
/// use info_sieve::traits::Connector;
///
/// pub struct StaticConnector;
///
/// #[async_trait]
/// impl Connector for StaticConnector {
///     fn name(&self) -> &str { "static" }
///     fn description(&self) -> &str { "Fixed list of links" }
///
///     async fn fetch(&self) -> Result<Vec<Item>, FetchError> {
///         Ok(vec![Item::new("static", "Hello", "https://example.com", "", "", Utc::now())])
///     }
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync {
    /// Source name stamped on every item (e.g. `"HackerNews"`, `"Lobsters"`).
    fn name(&self) -> &str;

    /// One-line description, shown by `sieve sources`.
    fn description(&self) -> &str;

    /// Connector type identifier (`"hackernews"`, `"rss"`, `"custom"`).
    fn connector_type(&self) -> &str {
        "custom"
    }

    /// Retrieve and normalize the current batch.
    async fn fetch(&self) -> Result<Vec<Item>, FetchError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Scorer Trait
// ═══════════════════════════════════════════════════════════════════════

/// A relevance scoring backend.
///
/// Implemented by [`GeminiScorer`](crate::scorer::GeminiScorer) in
/// production and by in-process fakes in tests.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Score an item. The returned result must already be finalized
    /// (see [`ScoreResult::finalize`]).
    async fn score(&self, item: &Item) -> Result<ScoreResult, ScoringError>;

    /// Answer a free-text question about an item. The answer is returned
    /// verbatim.
    async fn ask(&self, item: &Item, question: &str) -> Result<String, ScoringError>;
}

// ═══════════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════════

/// Ordered set of connectors visited by each cycle.
///
/// Registration order is processing order.
///
/// ```rust
/// use info_sieve::traits::ConnectorRegistry;
///
/// let connectors = ConnectorRegistry::new();
/// assert!(connectors.is_empty());
/// ```
pub struct ConnectorRegistry {
    connectors: Vec<Box<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self {
            connectors: Vec::new(),
        }
    }

    /// Build a registry with the connectors enabled in `config`:
    /// Hacker News first (when configured), then each RSS feed in file order.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.connectors.timeout_secs))
            .user_agent(concat!("info-sieve/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut registry = Self::new();
        if let Some(hn) = config.connectors.hackernews.as_ref().filter(|hn| hn.enabled) {
            registry.register(Box::new(HackerNewsConnector::new(client.clone(), hn)));
        }
        for feed in &config.connectors.rss {
            registry.register(Box::new(RssConnector::new(client.clone(), feed)));
        }
        Ok(registry)
    }

    pub fn register(&mut self, connector: Box<dyn Connector>) {
        self.connectors.push(connector);
    }

    pub fn connectors(&self) -> &[Box<dyn Connector>] {
        &self.connectors
    }

    pub fn find(&self, name: &str) -> Option<&dyn Connector> {
        self.connectors
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .map(|c| c.as_ref())
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_default_order() {
        let registry = ConnectorRegistry::from_config(&Config::default()).unwrap();
        let names: Vec<&str> = registry.connectors().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["HackerNews", "ProductHunt", "Lobsters", "GitHub"]);
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let registry = ConnectorRegistry::from_config(&Config::default()).unwrap();
        assert_eq!(registry.find("lobsters").unwrap().connector_type(), "rss");
        assert!(registry.find("slashdot").is_none());
    }

    #[test]
    fn test_disabled_hackernews_is_not_registered() {
        let mut config = Config::default();
        if let Some(hn) = config.connectors.hackernews.as_mut() {
            hn.enabled = false;
        }
        let registry = ConnectorRegistry::from_config(&config).unwrap();
        assert_eq!(registry.len(), 3);
        assert!(registry.find("HackerNews").is_none());
    }
}
