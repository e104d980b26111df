//! Dedup and threshold gate in front of the item store.
//!
//! The gate is the only place that decides store-vs-drop. It is evaluated
//! independently for every item.

use tracing::debug;

use crate::error::StoreError;
use crate::models::Item;
use crate::store::ItemStore;

/// Result of [`PersistenceGate::persist_if_qualified`].
#[derive(Debug)]
pub enum Outcome {
    /// Written with the given id.
    Stored(i64),
    /// Scored below the threshold; never written.
    Dropped,
    /// Another writer stored the same URL first.
    Duplicate,
    /// Write failed for some other reason.
    Failed(StoreError),
}

pub struct PersistenceGate<'a> {
    store: &'a dyn ItemStore,
    threshold: i64,
}

impl<'a> PersistenceGate<'a> {
    pub fn new(store: &'a dyn ItemStore, threshold: i64) -> Self {
        Self { store, threshold }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    /// Whether any row (from any source, soft-deleted or not) has this URL.
    pub async fn exists(&self, url: &str) -> Result<bool, StoreError> {
        Ok(self.store.find_by_url(url).await?.is_some())
    }

    /// Inclusive threshold check.
    pub fn qualifies(&self, item: &Item) -> bool {
        item.total() >= self.threshold
    }

    /// Write `item` if its total clears the threshold.
    ///
    /// A unique-constraint collision means a concurrent writer won the
    /// race and maps to [`Outcome::Duplicate`].
    pub async fn persist_if_qualified(&self, item: &Item) -> Outcome {
        if !self.qualifies(item) {
            return Outcome::Dropped;
        }
        match self.store.insert_item(item).await {
            Ok(id) => Outcome::Stored(id),
            Err(StoreError::UniqueViolation { url }) => {
                debug!(url = %url, "lost insert race, already stored");
                Outcome::Duplicate
            }
            Err(e) => Outcome::Failed(e),
        }
    }
}
