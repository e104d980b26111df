//! In-memory [`ItemStore`] implementation for tests.
//!
//! Uses `Vec`s behind `std::sync::RwLock`. Enforces the same URL
//! uniqueness rule as the SQLite schema.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::{start_of_today, ItemQuery, ItemStore};
use crate::error::StoreError;
use crate::models::{
    format_ts_iso, Item, ItemQuestion, NewQuestion, SourceCount, Stats, StoredItem,
};

struct StoredRow {
    id: i64,
    item: Item,
    created_at: i64,
    deleted_at: Option<i64>,
}

impl StoredRow {
    fn to_stored(&self) -> StoredItem {
        let s = &self.item.score;
        StoredItem {
            id: self.id,
            source: self.item.source.clone(),
            title: self.item.title.clone(),
            url: self.item.url.clone(),
            description: self.item.description.clone(),
            author: self.item.author.clone(),
            published_at: format_ts_iso(self.item.published_at.timestamp()),
            scarcity_score: s.scarcity,
            actionable_score: s.actionable,
            leverage_score: s.leverage,
            resonance_score: s.resonance,
            total_score: s.total,
            importance_score: s.importance,
            benefit_score: s.benefit,
            noble_score: s.noble,
            score_reason: s.reason.clone(),
            pushed: false,
            created_at: format_ts_iso(self.created_at),
            updated_at: format_ts_iso(self.created_at),
            deleted_at: self.deleted_at.map(format_ts_iso),
        }
    }

    fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// In-memory store.
#[derive(Default)]
pub struct InMemoryStore {
    items: RwLock<Vec<StoredRow>>,
    questions: RwLock<Vec<ItemQuestion>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items, including soft-deleted ones.
    pub fn len(&self) -> usize {
        self.items.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of stored questions across all items.
    pub fn question_count(&self) -> usize {
        self.questions.read().unwrap().len()
    }

    /// Mark an item as deleted without removing it.
    pub fn soft_delete(&self, id: i64) {
        let mut items = self.items.write().unwrap();
        if let Some(row) = items.iter_mut().find(|r| r.id == id) {
            row.deleted_at = Some(Utc::now().timestamp());
        }
    }
}

#[async_trait]
impl ItemStore for InMemoryStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<StoredItem>, StoreError> {
        let items = self.items.read().unwrap();
        Ok(items
            .iter()
            .find(|r| r.item.url == url)
            .map(StoredRow::to_stored))
    }

    async fn insert_item(&self, item: &Item) -> Result<i64, StoreError> {
        let mut items = self.items.write().unwrap();
        if items.iter().any(|r| r.item.url == item.url) {
            return Err(StoreError::UniqueViolation {
                url: item.url.clone(),
            });
        }
        let id = items.len() as i64 + 1;
        items.push(StoredRow {
            id,
            item: item.clone(),
            created_at: Utc::now().timestamp(),
            deleted_at: None,
        });
        Ok(id)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<StoredItem>, StoreError> {
        let items = self.items.read().unwrap();
        Ok(items
            .iter()
            .find(|r| r.id == id && r.is_live())
            .map(StoredRow::to_stored))
    }

    async fn insert_question(&self, question: &NewQuestion) -> Result<i64, StoreError> {
        let mut questions = self.questions.write().unwrap();
        let id = questions.len() as i64 + 1;
        questions.push(ItemQuestion {
            id,
            item_id: question.item_id,
            question: question.question.clone(),
            answer: question.answer.clone(),
            created_at: format_ts_iso(Utc::now().timestamp()),
        });
        Ok(id)
    }

    async fn questions_for(&self, item_id: i64) -> Result<Vec<ItemQuestion>, StoreError> {
        let questions = self.questions.read().unwrap();
        Ok(questions
            .iter()
            .filter(|q| q.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn list_items(&self, query: &ItemQuery) -> Result<Vec<StoredItem>, StoreError> {
        let items = self.items.read().unwrap();
        let mut rows: Vec<&StoredRow> = items
            .iter()
            .filter(|r| r.is_live() && r.item.total() >= query.min_score)
            .filter(|r| query.source.as_deref().map_or(true, |s| r.item.source == s))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .take(query.limit.max(0) as usize)
            .map(StoredRow::to_stored)
            .collect())
    }

    async fn today_items(
        &self,
        min_score: i64,
        limit: i64,
    ) -> Result<Vec<StoredItem>, StoreError> {
        let cutoff = start_of_today();
        let items = self.items.read().unwrap();
        let mut rows: Vec<&StoredRow> = items
            .iter()
            .filter(|r| r.is_live() && r.item.total() >= min_score && r.created_at >= cutoff)
            .collect();
        rows.sort_by(|a, b| b.item.total().cmp(&a.item.total()).then(b.id.cmp(&a.id)));
        Ok(rows
            .into_iter()
            .take(limit.max(0) as usize)
            .map(StoredRow::to_stored)
            .collect())
    }

    async fn stats(&self, qualified_threshold: i64) -> Result<Stats, StoreError> {
        let items = self.items.read().unwrap();
        let live: Vec<&StoredRow> = items.iter().filter(|r| r.is_live()).collect();

        let total = live.len() as i64;
        let qualified = live
            .iter()
            .filter(|r| r.item.total() >= qualified_threshold)
            .count() as i64;
        let avg_score = if total > 0 {
            live.iter().map(|r| r.item.total() as f64).sum::<f64>() / total as f64
        } else {
            0.0
        };

        let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
        for r in &live {
            *counts.entry(r.item.source.as_str()).or_default() += 1;
        }
        let mut sources: Vec<SourceCount> = counts
            .into_iter()
            .map(|(source, count)| SourceCount {
                source: source.to_string(),
                count,
            })
            .collect();
        sources.sort_by(|a, b| b.count.cmp(&a.count).then(a.source.cmp(&b.source)));

        Ok(Stats::new(total, qualified, avg_score, sources))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoreResult;

    fn scored(source: &str, url: &str, total_leaf: i64) -> Item {
        let mut item = Item::new(source, "title", url, "", "", Utc::now());
        item.apply_score(
            ScoreResult {
                scarcity: total_leaf,
                reason: "r".into(),
                ..Default::default()
            }
            .finalize(),
        );
        item
    }

    #[tokio::test]
    async fn test_duplicate_url_rejected() {
        let store = InMemoryStore::new();
        store.insert_item(&scored("a", "https://x", 20)).await.unwrap();
        let err = store
            .insert_item(&scored("b", "https://x", 20))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_soft_deleted_still_counts_for_dedup() {
        let store = InMemoryStore::new();
        let id = store.insert_item(&scored("a", "https://x", 20)).await.unwrap();
        store.soft_delete(id);
        assert!(store.find_by_url("https://x").await.unwrap().is_some());
        assert!(store.find_by_id(id).await.unwrap().is_none());
        assert_eq!(store.stats(70).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_stats_by_source() {
        let store = InMemoryStore::new();
        store.insert_item(&scored("a", "https://1", 25)).await.unwrap();
        store.insert_item(&scored("a", "https://2", 5)).await.unwrap();
        store.insert_item(&scored("b", "https://3", 15)).await.unwrap();
        let stats = store.stats(20).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.qualified, 1);
        assert!((stats.avg_score - 15.0).abs() < 1e-9);
        assert_eq!(stats.sources[0].source, "a");
        assert_eq!(stats.sources[0].count, 2);
    }
}
