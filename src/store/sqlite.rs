//! SQLite-backed [`ItemStore`] implementation.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::{start_of_today, ItemQuery, ItemStore};
use crate::error::StoreError;
use crate::models::{
    format_ts_iso, Item, ItemQuestion, NewQuestion, SourceCount, Stats, StoredItem,
};

const ITEM_COLUMNS: &str = "id, source, title, url, description, author, published_at, \
    scarcity_score, actionable_score, leverage_score, resonance_score, total_score, \
    importance_score, benefit_score, noble_score, score_reason, pushed, \
    created_at, updated_at, deleted_at";

/// SQLite implementation of the [`ItemStore`] trait.
///
/// Wraps a [`SqlitePool`]; the schema is created by
/// [`migrate`](crate::migrate). The `UNIQUE(url)` constraint is what
/// serializes racing writers.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_item(row: &SqliteRow) -> StoredItem {
    let pushed: i64 = row.get("pushed");
    let deleted_at: Option<i64> = row.get("deleted_at");
    StoredItem {
        id: row.get("id"),
        source: row.get("source"),
        title: row.get("title"),
        url: row.get("url"),
        description: row.get("description"),
        author: row.get("author"),
        published_at: format_ts_iso(row.get("published_at")),
        scarcity_score: row.get("scarcity_score"),
        actionable_score: row.get("actionable_score"),
        leverage_score: row.get("leverage_score"),
        resonance_score: row.get("resonance_score"),
        total_score: row.get("total_score"),
        importance_score: row.get("importance_score"),
        benefit_score: row.get("benefit_score"),
        noble_score: row.get("noble_score"),
        score_reason: row.get("score_reason"),
        pushed: pushed != 0,
        created_at: format_ts_iso(row.get("created_at")),
        updated_at: format_ts_iso(row.get("updated_at")),
        deleted_at: deleted_at.map(format_ts_iso),
    }
}

fn map_insert_error(err: sqlx::Error, url: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::UniqueViolation {
                url: url.to_string(),
            }
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl ItemStore for SqliteStore {
    async fn find_by_url(&self, url: &str) -> Result<Option<StoredItem>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM items WHERE url = ?", ITEM_COLUMNS))
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_item))
    }

    async fn insert_item(&self, item: &Item) -> Result<i64, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let s = &item.score;
        let result = sqlx::query(
            r#"
            INSERT INTO items (source, title, url, description, author, published_at,
                               scarcity_score, actionable_score, leverage_score,
                               resonance_score, total_score, importance_score,
                               benefit_score, noble_score, score_reason, pushed,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&item.source)
        .bind(&item.title)
        .bind(&item.url)
        .bind(&item.description)
        .bind(&item.author)
        .bind(item.published_at.timestamp())
        .bind(s.scarcity)
        .bind(s.actionable)
        .bind(s.leverage)
        .bind(s.resonance)
        .bind(s.total)
        .bind(s.importance)
        .bind(s.benefit)
        .bind(s.noble)
        .bind(&s.reason)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, &item.url))?;

        Ok(result.last_insert_rowid())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<StoredItem>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM items WHERE id = ? AND deleted_at IS NULL",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(row_to_item))
    }

    async fn insert_question(&self, question: &NewQuestion) -> Result<i64, StoreError> {
        let now = chrono::Utc::now().timestamp();
        let result = sqlx::query(
            "INSERT INTO item_questions (item_id, question, answer, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(question.item_id)
        .bind(&question.question)
        .bind(&question.answer)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn questions_for(&self, item_id: i64) -> Result<Vec<ItemQuestion>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, item_id, question, answer, created_at FROM item_questions \
             WHERE item_id = ? AND deleted_at IS NULL ORDER BY id ASC",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ItemQuestion {
                id: row.get("id"),
                item_id: row.get("item_id"),
                question: row.get("question"),
                answer: row.get("answer"),
                created_at: format_ts_iso(row.get("created_at")),
            })
            .collect())
    }

    async fn list_items(&self, query: &ItemQuery) -> Result<Vec<StoredItem>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM items \
             WHERE deleted_at IS NULL AND total_score >= ? AND (? IS NULL OR source = ?) \
             ORDER BY created_at DESC, id DESC LIMIT ?",
            ITEM_COLUMNS
        ))
        .bind(query.min_score)
        .bind(&query.source)
        .bind(&query.source)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_item).collect())
    }

    async fn today_items(
        &self,
        min_score: i64,
        limit: i64,
    ) -> Result<Vec<StoredItem>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM items \
             WHERE deleted_at IS NULL AND total_score >= ? AND created_at >= ? \
             ORDER BY total_score DESC, id DESC LIMIT ?",
            ITEM_COLUMNS
        ))
        .bind(min_score)
        .bind(start_of_today())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(row_to_item).collect())
    }

    async fn stats(&self, qualified_threshold: i64) -> Result<Stats, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;

        let qualified: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM items WHERE deleted_at IS NULL AND total_score >= ?",
        )
        .bind(qualified_threshold)
        .fetch_one(&self.pool)
        .await?;

        let avg_score: Option<f64> = sqlx::query_scalar(
            "SELECT AVG(CAST(total_score AS REAL)) FROM items WHERE deleted_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        let source_rows = sqlx::query(
            "SELECT source, COUNT(*) AS count FROM items WHERE deleted_at IS NULL \
             GROUP BY source ORDER BY count DESC, source ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let sources = source_rows
            .iter()
            .map(|row| SourceCount {
                source: row.get("source"),
                count: row.get("count"),
            })
            .collect();

        Ok(Stats::new(total, qualified, avg_score.unwrap_or(0.0), sources))
    }
}
