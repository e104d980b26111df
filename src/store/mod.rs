//! Storage abstraction for stored items and questions.
//!
//! The [`ItemStore`] trait is the durable store the pipeline and read API
//! share. [`SqliteStore`] is the production backend; [`InMemoryStore`]
//! backs unit tests.
//!
//! Implementations must be `Send + Sync` to be shared across the
//! scheduler task and HTTP handlers.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Item, ItemQuestion, NewQuestion, Stats, StoredItem};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Filter for [`ItemStore::list_items`].
#[derive(Debug, Clone)]
pub struct ItemQuery {
    /// Minimum total score (inclusive).
    pub min_score: i64,
    /// Restrict to one source name.
    pub source: Option<String>,
    pub limit: i64,
}

impl Default for ItemQuery {
    fn default() -> Self {
        Self {
            min_score: 70,
            source: None,
            limit: 50,
        }
    }
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`find_by_url`](ItemStore::find_by_url) | Dedup lookup (soft-deleted rows included) |
/// | [`insert_item`](ItemStore::insert_item) | Write a scored item once |
/// | [`find_by_id`](ItemStore::find_by_id) | Fetch one live item |
/// | [`insert_question`](ItemStore::insert_question) | Record a Q&A pair |
/// | [`questions_for`](ItemStore::questions_for) | Q&A history of an item |
/// | [`list_items`](ItemStore::list_items) | Newest-first listing with filters |
/// | [`today_items`](ItemStore::today_items) | Today's best items by score |
/// | [`stats`](ItemStore::stats) | Aggregate counts and averages |
#[async_trait]
pub trait ItemStore: Send + Sync {
    async fn find_by_url(&self, url: &str) -> Result<Option<StoredItem>, StoreError>;

    /// Insert a scored item and return its id.
    ///
    /// Returns [`StoreError::UniqueViolation`] when the URL is already stored.
    async fn insert_item(&self, item: &Item) -> Result<i64, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<StoredItem>, StoreError>;

    async fn insert_question(&self, question: &NewQuestion) -> Result<i64, StoreError>;

    async fn questions_for(&self, item_id: i64) -> Result<Vec<ItemQuestion>, StoreError>;

    async fn list_items(&self, query: &ItemQuery) -> Result<Vec<StoredItem>, StoreError>;

    /// Items created since the start of the current UTC day with
    /// `total_score >= min_score`, highest score first.
    async fn today_items(&self, min_score: i64, limit: i64)
        -> Result<Vec<StoredItem>, StoreError>;

    /// Aggregate stats; `qualified_threshold` decides what counts as qualified.
    async fn stats(&self, qualified_threshold: i64) -> Result<Stats, StoreError>;
}

/// Unix timestamp of the most recent UTC midnight.
pub(crate) fn start_of_today() -> i64 {
    chrono::Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(0)
}
