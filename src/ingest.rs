//! Ingestion pipeline orchestration.
//!
//! One cycle visits every connector in registry order and processes each
//! returned item strictly in sequence:
//!
//! ```text
//! fetch ─▶ exists(url)? ─no─▶ pace ─▶ score ─▶ total ≥ threshold? ─yes─▶ insert
//!              │yes                      │err               │no
//!              ▼                         ▼                  ▼
//!            skip                      skip               drop
//! ```
//!
//! No failure escapes a cycle: a fetch error skips one source, a scoring or
//! storage error skips one item. Items that were not stored are fetched and
//! retried naturally on the next cycle, since dedup only knows stored URLs.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::PipelineConfig;
use crate::gate::{Outcome, PersistenceGate};
use crate::ratelimit::{self, RateLimiter};
use crate::store::ItemStore;
use crate::traits::{Connector, ConnectorRegistry, Scorer};

/// Per-source counters for one cycle.
#[derive(Debug, Clone, Default)]
pub struct SourceReport {
    pub source: String,
    pub fetched: usize,
    pub skipped_existing: usize,
    pub scored: usize,
    pub stored: usize,
    pub dropped: usize,
    pub duplicates: usize,
    pub scoring_failures: usize,
    pub persistence_failures: usize,
    /// Set when the whole batch failed to fetch.
    pub fetch_error: Option<String>,
}

impl SourceReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }
}

/// Outcome of one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub sources: Vec<SourceReport>,
    /// The shutdown signal fired before the cycle finished.
    pub cancelled: bool,
}

impl CycleReport {
    pub fn stored(&self) -> usize {
        self.sources.iter().map(|s| s.stored).sum()
    }

    pub fn dropped(&self) -> usize {
        self.sources.iter().map(|s| s.dropped).sum()
    }

    pub fn scored(&self) -> usize {
        self.sources.iter().map(|s| s.scored).sum()
    }

    pub fn fetched(&self) -> usize {
        self.sources.iter().map(|s| s.fetched).sum()
    }

    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.fetch_error.is_some()).count()
    }

    pub fn source(&self, name: &str) -> Option<&SourceReport> {
        self.sources.iter().find(|s| s.source == name)
    }
}

/// Options for a single cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleOptions {
    /// Only visit the connector with this name.
    pub only: Option<String>,
    /// Fetch and dedup, but do not score or write.
    pub dry_run: bool,
}

/// The fetch → dedup → score → gate → persist pipeline.
pub struct Pipeline {
    connectors: ConnectorRegistry,
    scorer: Arc<dyn Scorer>,
    store: Arc<dyn ItemStore>,
    limiter: Box<dyn RateLimiter>,
    threshold: i64,
}

impl Pipeline {
    pub fn new(
        config: &PipelineConfig,
        connectors: ConnectorRegistry,
        scorer: Arc<dyn Scorer>,
        store: Arc<dyn ItemStore>,
    ) -> Self {
        Self {
            connectors,
            scorer,
            store,
            limiter: ratelimit::from_config(config),
            threshold: config.threshold,
        }
    }

    /// Replace the pacing policy.
    pub fn with_limiter(mut self, limiter: Box<dyn RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn connectors(&self) -> &ConnectorRegistry {
        &self.connectors
    }

    /// Run one full cycle with no cancellation.
    pub async fn run_once(&self) -> CycleReport {
        let (_tx, rx) = watch::channel(false);
        self.run_cycle(&CycleOptions::default(), &rx).await
    }

    /// Run one cycle. `shutdown` is checked between sources and between
    /// items; once it reads `true` the partial report is returned.
    pub async fn run_cycle(
        &self,
        opts: &CycleOptions,
        shutdown: &watch::Receiver<bool>,
    ) -> CycleReport {
        info!("Starting fetch cycle");
        let mut report = CycleReport::default();

        for connector in self.connectors.connectors() {
            if let Some(only) = &opts.only {
                if !connector.name().eq_ignore_ascii_case(only) {
                    continue;
                }
            }
            if *shutdown.borrow() {
                report.cancelled = true;
                break;
            }

            let source_report = self
                .run_source(connector.as_ref(), opts.dry_run, shutdown)
                .await;
            report.sources.push(source_report);

            if *shutdown.borrow() {
                report.cancelled = true;
                break;
            }
        }

        info!(
            fetched = report.fetched(),
            scored = report.scored(),
            stored = report.stored(),
            dropped = report.dropped(),
            failed_sources = report.failed_sources(),
            cancelled = report.cancelled,
            "Fetch cycle completed"
        );
        report
    }

    async fn run_source(
        &self,
        connector: &dyn Connector,
        dry_run: bool,
        shutdown: &watch::Receiver<bool>,
    ) -> SourceReport {
        let name = connector.name();
        let mut report = SourceReport::new(name);
        let gate = PersistenceGate::new(self.store.as_ref(), self.threshold);

        info!(source = name, "Fetching");
        let items = match connector.fetch().await {
            Ok(items) => items,
            Err(e) => {
                warn!(source = name, error = %e, "Failed to fetch source, skipping this cycle");
                report.fetch_error = Some(e.to_string());
                return report;
            }
        };
        report.fetched = items.len();
        info!(source = name, count = items.len(), "Fetched items");

        for mut item in items {
            if *shutdown.borrow() {
                debug!(source = name, "shutdown requested, stopping mid-batch");
                break;
            }

            match gate.exists(&item.url).await {
                Ok(true) => {
                    report.skipped_existing += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(source = name, url = %item.url, error = %e, "Existence check failed");
                    report.persistence_failures += 1;
                    continue;
                }
            }

            if dry_run {
                info!(source = name, title = %item.title, "[NEW] would score");
                continue;
            }

            self.limiter.acquire().await;

            let score = match self.scorer.score(&item).await {
                Ok(score) => score,
                Err(e) => {
                    warn!(source = name, title = %item.title, url = %item.url, error = %e, "Failed to score item");
                    report.scoring_failures += 1;
                    continue;
                }
            };
            report.scored += 1;
            item.apply_score(score);

            match gate.persist_if_qualified(&item).await {
                Outcome::Stored(id) => {
                    report.stored += 1;
                    info!(source = name, id, total = item.total(), "[PASS] {}", item.title);
                }
                Outcome::Dropped => {
                    report.dropped += 1;
                    info!(source = name, total = item.total(), "[DROP] {}", item.title);
                }
                Outcome::Duplicate => {
                    report.duplicates += 1;
                }
                Outcome::Failed(e) => {
                    report.persistence_failures += 1;
                    error!(source = name, url = %item.url, error = %e, "Failed to save item");
                }
            }
        }

        report
    }
}
