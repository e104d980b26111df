//! Core data models used throughout info-sieve.
//!
//! These types represent the candidate items, score results, and stored
//! records that flow through the ingestion, scoring, and read pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound for scarcity, actionable, leverage, and resonance.
pub const DIMENSION_MAX: i64 = 25;
/// Upper bound for the importance sub-score.
pub const IMPORTANCE_MAX: i64 = 8;
/// Upper bound for the benefit sub-score.
pub const BENEFIT_MAX: i64 = 9;
/// Upper bound for the noble sub-score.
pub const NOBLE_MAX: i64 = 8;

/// Output of the scoring service for one item.
///
/// The remote model is only asked for the six leaf scores and the reason.
/// `resonance` and `total` are always derived locally by [`ScoreResult::finalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub scarcity: i64,
    pub actionable: i64,
    pub leverage: i64,
    #[serde(default)]
    pub resonance: i64,
    pub importance: i64,
    pub benefit: i64,
    pub noble: i64,
    #[serde(default)]
    pub total: i64,
    pub reason: String,
}

impl ScoreResult {
    /// Clamp every leaf score into its declared range and recompute the
    /// derived fields, discarding whatever the remote service reported.
    pub fn finalize(mut self) -> Self {
        self.scarcity = self.scarcity.clamp(0, DIMENSION_MAX);
        self.actionable = self.actionable.clamp(0, DIMENSION_MAX);
        self.leverage = self.leverage.clamp(0, DIMENSION_MAX);
        self.importance = self.importance.clamp(0, IMPORTANCE_MAX);
        self.benefit = self.benefit.clamp(0, BENEFIT_MAX);
        self.noble = self.noble.clamp(0, NOBLE_MAX);

        self.resonance = self.importance + self.benefit + self.noble;
        self.total = self.scarcity + self.actionable + self.leverage + self.resonance;
        self
    }
}

/// A candidate item produced by a connector.
///
/// Connectors always emit items with a zeroed [`ScoreResult`]; the
/// pipeline fills `score` in place after a successful scoring call.
#[derive(Debug, Clone)]
pub struct Item {
    pub source: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub author: String,
    pub published_at: DateTime<Utc>,
    pub score: ScoreResult,
}

impl Item {
    /// Build an unscored item.
    pub fn new(
        source: impl Into<String>,
        title: impl Into<String>,
        url: impl Into<String>,
        description: impl Into<String>,
        author: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            url: url.into(),
            description: description.into(),
            author: author.into(),
            published_at,
            score: ScoreResult::default(),
        }
    }

    /// Fold a scoring result into this item.
    pub fn apply_score(&mut self, score: ScoreResult) {
        self.score = score;
    }

    /// Total score (0 until scored).
    pub fn total(&self) -> i64 {
        self.score.total
    }
}

/// Persisted item row, as served by the read API.
#[derive(Debug, Clone, Serialize)]
pub struct StoredItem {
    pub id: i64,
    pub source: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub author: String,
    pub published_at: String, // ISO8601
    pub scarcity_score: i64,
    pub actionable_score: i64,
    pub leverage_score: i64,
    pub resonance_score: i64,
    pub total_score: i64,
    pub importance_score: i64,
    pub benefit_score: i64,
    pub noble_score: i64,
    pub score_reason: String,
    pub pushed: bool,
    pub created_at: String, // ISO8601
    pub updated_at: String, // ISO8601
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl StoredItem {
    /// Rebuild the transient view of this row (used by the ask prompt).
    pub fn to_item(&self) -> Item {
        // Stores always write `published_at` via `format_ts_iso`, so the
        // fallback only covers hand-built rows.
        let published_at = DateTime::parse_from_rfc3339(&self.published_at)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());
        Item {
            source: self.source.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
            author: self.author.clone(),
            published_at,
            score: ScoreResult {
                scarcity: self.scarcity_score,
                actionable: self.actionable_score,
                leverage: self.leverage_score,
                resonance: self.resonance_score,
                importance: self.importance_score,
                benefit: self.benefit_score,
                noble: self.noble_score,
                total: self.total_score,
                reason: self.score_reason.clone(),
            },
        }
    }
}

/// A question about a stored item, before it is written.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub item_id: i64,
    pub question: String,
    pub answer: String,
}

/// Persisted question/answer pair.
#[derive(Debug, Clone, Serialize)]
pub struct ItemQuestion {
    pub id: i64,
    pub item_id: i64,
    pub question: String,
    pub answer: String,
    pub created_at: String,
}

/// Per-source item count in [`Stats`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SourceCount {
    pub source: String,
    pub count: i64,
}

/// Aggregate statistics over stored items.
#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub total: i64,
    pub qualified: i64,
    pub avg_score: f64,
    pub sources: Vec<SourceCount>,
    pub pass_rate: f64,
}

impl Stats {
    /// Assemble stats, deriving the pass rate as a percentage.
    pub fn new(total: i64, qualified: i64, avg_score: f64, sources: Vec<SourceCount>) -> Self {
        let pass_rate = if total > 0 {
            qualified as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total,
            qualified,
            avg_score,
            sources,
            pass_rate,
        }
    }
}

pub(crate) fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(scarcity: i64, actionable: i64, leverage: i64, i: i64, b: i64, n: i64) -> ScoreResult {
        ScoreResult {
            scarcity,
            actionable,
            leverage,
            importance: i,
            benefit: b,
            noble: n,
            reason: "because".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_finalize_derives_resonance_and_total() {
        let s = raw(20, 18, 15, 6, 7, 5).finalize();
        assert_eq!(s.resonance, 18);
        assert_eq!(s.total, 71);
    }

    #[test]
    fn test_finalize_ignores_remote_derived_fields() {
        let mut r = raw(10, 10, 10, 1, 2, 3);
        r.resonance = 25;
        r.total = 100;
        let s = r.finalize();
        assert_eq!(s.resonance, 6);
        assert_eq!(s.total, 36);
    }

    #[test]
    fn test_finalize_clamps_out_of_range() {
        let s = raw(40, -3, 25, 12, 9, 100).finalize();
        assert_eq!(s.scarcity, 25);
        assert_eq!(s.actionable, 0);
        assert_eq!(s.importance, 8);
        assert_eq!(s.noble, 8);
        assert_eq!(s.resonance, 25);
        assert_eq!(s.total, 75);
    }

    #[test]
    fn test_max_scores_total_100() {
        let s = raw(25, 25, 25, 8, 9, 8).finalize();
        assert_eq!(s.total, 100);
    }

    #[test]
    fn test_new_item_is_unscored() {
        let item = Item::new("HackerNews", "t", "https://x", "", "", Utc::now());
        assert_eq!(item.score, ScoreResult::default());
        assert_eq!(item.total(), 0);
    }

    #[test]
    fn test_stats_pass_rate() {
        let s = Stats::new(4, 1, 60.0, vec![]);
        assert!((s.pass_rate - 25.0).abs() < f64::EPSILON);
        let empty = Stats::new(0, 0, 0.0, vec![]);
        assert_eq!(empty.pass_rate, 0.0);
    }

    #[test]
    fn test_to_item_keeps_stored_published_time() {
        let stored = StoredItem {
            id: 1,
            source: "Lobsters".into(),
            title: "t".into(),
            url: "https://x.test".into(),
            description: String::new(),
            author: String::new(),
            published_at: format_ts_iso(1_700_000_000),
            scarcity_score: 20,
            actionable_score: 18,
            leverage_score: 15,
            resonance_score: 18,
            total_score: 71,
            importance_score: 6,
            benefit_score: 7,
            noble_score: 5,
            score_reason: "r".into(),
            pushed: false,
            created_at: format_ts_iso(1_700_000_100),
            updated_at: format_ts_iso(1_700_000_100),
            deleted_at: None,
        };
        let item = stored.to_item();
        assert_eq!(item.published_at.timestamp(), 1_700_000_000);
        assert_eq!(item.total(), 71);
    }
}
