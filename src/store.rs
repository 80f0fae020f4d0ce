//! Record store - captured pages in SQLite / 页面记录存储
//!
//! One row per URL: saving a page that is already stored updates the row in place
//! and increments its visit count. Every write either commits or returns an error.

use chrono::{SecondsFormat, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};

use crate::error::StoreError;
use crate::models::{
    positive, present, CapturedDocument, PageExport, PartialDocument, StoreStats, UpsertOutcome, UNTITLED,
};

const SELECT_COLUMNS: &str =
    "SELECT id, url, title, content, excerpt, site_name, word_count, reading_time, timestamp, visit_count FROM pages";

/// Export format version / 导出格式版本
pub const EXPORT_VERSION: &str = "1.0.0";

/// SQLite bind-variable budget per IN list / 每批 id 数量
const ID_BATCH: usize = 500;

/// Capture timestamp, fixed width so text ordering is chronological / 当前时间
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Write transaction opened with `BEGIN IMMEDIATE` / 立即写事务
///
/// The write lock is taken before the first read, so two upserts never both
/// hold a read snapshot and then race for the lock. A transaction dropped
/// before `commit` closes its connection, which rolls it back.
struct WriteTx {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteTx {
    async fn begin(db: &Pool<Sqlite>) -> Result<Self, sqlx::Error> {
        let mut conn = db.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(Self { conn: Some(conn) })
    }

    fn conn(&mut self) -> Result<&mut SqliteConnection, sqlx::Error> {
        self.conn.as_deref_mut().ok_or(sqlx::Error::PoolClosed)
    }

    async fn commit(mut self) -> Result<(), sqlx::Error> {
        sqlx::query("COMMIT").execute(self.conn()?).await?;
        // back to the pool
        drop(self.conn.take());
        Ok(())
    }
}

impl Drop for WriteTx {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            drop(conn.detach());
        }
    }
}

/// Page record store / 页面存储
#[derive(Clone)]
pub struct PageStore {
    db: Pool<Sqlite>,
}

impl PageStore {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.db
    }

    /// Insert a new page or update the stored page with the same URL / 新增或更新页面
    ///
    /// Runs in one immediate transaction so readers never see a half-applied
    /// update and concurrent upserts queue on the write lock.
    pub async fn upsert(&self, candidate: &PartialDocument) -> Result<UpsertOutcome, StoreError> {
        if candidate.url.trim().is_empty() {
            return Err(StoreError::Invalid("url is empty".to_string()));
        }

        let mut tx = WriteTx::begin(&self.db).await?;
        let now = now_timestamp();

        let existing: Option<CapturedDocument> =
            sqlx::query_as(&format!("{} WHERE url = ? ORDER BY id ASC LIMIT 1", SELECT_COLUMNS))
                .bind(&candidate.url)
                .fetch_optional(tx.conn()?)
                .await?;

        let outcome = match existing {
            Some(previous) => {
                let record = merge(previous, candidate, now);
                sqlx::query(
                    r#"UPDATE pages SET title = ?, content = ?, excerpt = ?, site_name = ?,
                       word_count = ?, reading_time = ?, timestamp = ?, visit_count = ?
                       WHERE id = ?"#,
                )
                .bind(&record.title)
                .bind(&record.content)
                .bind(&record.excerpt)
                .bind(&record.site_name)
                .bind(record.word_count)
                .bind(record.reading_time)
                .bind(&record.timestamp)
                .bind(record.visit_count)
                .bind(record.id)
                .execute(tx.conn()?)
                .await?;

                UpsertOutcome { record, was_update: true }
            }
            None => {
                let mut record = fresh(candidate, now);
                let result = sqlx::query(
                    r#"INSERT INTO pages (url, title, content, excerpt, site_name, word_count,
                       reading_time, timestamp, visit_count) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
                )
                .bind(&record.url)
                .bind(&record.title)
                .bind(&record.content)
                .bind(&record.excerpt)
                .bind(&record.site_name)
                .bind(record.word_count)
                .bind(record.reading_time)
                .bind(&record.timestamp)
                .bind(record.visit_count)
                .execute(tx.conn()?)
                .await?;
                record.id = result.last_insert_rowid();

                UpsertOutcome { record, was_update: false }
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// All pages, unordered / 获取所有页面
    pub async fn get_all(&self) -> Result<Vec<CapturedDocument>, StoreError> {
        let pages = sqlx::query_as(SELECT_COLUMNS).fetch_all(&self.db).await?;
        Ok(pages)
    }

    pub async fn get_by_url(&self, url: &str) -> Result<Option<CapturedDocument>, StoreError> {
        let page = sqlx::query_as(&format!("{} WHERE url = ? ORDER BY id ASC LIMIT 1", SELECT_COLUMNS))
            .bind(url)
            .fetch_optional(&self.db)
            .await?;
        Ok(page)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<CapturedDocument>, StoreError> {
        let page = sqlx::query_as(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        Ok(page)
    }

    /// Pages for a set of ids; unknown ids are ignored / 批量按 id 获取
    pub async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<CapturedDocument>, StoreError> {
        let batches = ids.chunks(ID_BATCH).map(|chunk| async move {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
            builder.push(" WHERE id IN (");
            let mut separated = builder.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            separated.push_unseparated(")");
            builder.build_query_as::<CapturedDocument>().fetch_all(&self.db).await
        });

        let batches = futures::future::try_join_all(batches).await?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Delete one page, returns whether it existed / 删除页面
    pub async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Remove every page, returns the removed count / 清空所有页面
    pub async fn clear(&self) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM pages").execute(&self.db).await?;
        Ok(result.rows_affected())
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM pages")
            .fetch_one(&self.db)
            .await?;
        Ok(count as u64)
    }

    /// Most recent capture time / 最近更新时间
    pub async fn last_updated(&self) -> Result<Option<String>, StoreError> {
        let latest: Option<String> = sqlx::query_scalar("SELECT MAX(timestamp) FROM pages")
            .fetch_one(&self.db)
            .await?;
        Ok(latest)
    }

    /// Record count and an estimated size (2 bytes per serialized char) / 统计信息
    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let pages = self.get_all().await?;
        let approximate_bytes = pages
            .iter()
            .map(|p| serde_json::to_string(p).map(|s| s.len() as u64 * 2).unwrap_or(0))
            .sum();

        Ok(StoreStats {
            record_count: pages.len() as u64,
            approximate_bytes,
            last_updated: self.last_updated().await?,
        })
    }

    /// Snapshot of every page for backup / 导出全部页面
    pub async fn export(&self) -> Result<PageExport, StoreError> {
        let mut pages = self.get_all().await?;
        pages.sort_by_key(|p| p.id);
        Ok(PageExport {
            export_date: now_timestamp(),
            version: EXPORT_VERSION.to_string(),
            total_pages: pages.len(),
            pages,
        })
    }
}

/// Merge a candidate into the stored page; absent fields keep their previous value / 合并字段
fn merge(previous: CapturedDocument, candidate: &PartialDocument, now: String) -> CapturedDocument {
    let pick = |value: &Option<String>, old: String| present(value).map(str::to_string).unwrap_or(old);

    let title = pick(&candidate.title, previous.title);
    CapturedDocument {
        id: previous.id,
        url: previous.url,
        title: if title.is_empty() { UNTITLED.to_string() } else { title },
        content: pick(&candidate.content, previous.content),
        excerpt: pick(&candidate.excerpt, previous.excerpt),
        site_name: pick(&candidate.site_name, previous.site_name),
        word_count: positive(candidate.word_count).unwrap_or(previous.word_count),
        reading_time: positive(candidate.reading_time).unwrap_or(previous.reading_time),
        timestamp: now,
        visit_count: previous.visit_count.max(0) + 1,
    }
}

/// New page with field defaults / 新页面（应用默认值）
fn fresh(candidate: &PartialDocument, now: String) -> CapturedDocument {
    let text = |value: &Option<String>| present(value).unwrap_or_default().to_string();

    CapturedDocument {
        id: 0,
        url: candidate.url.clone(),
        title: present(&candidate.title).unwrap_or(UNTITLED).to_string(),
        content: text(&candidate.content),
        excerpt: text(&candidate.excerpt),
        site_name: text(&candidate.site_name),
        word_count: positive(candidate.word_count).unwrap_or(0),
        reading_time: positive(candidate.reading_time).unwrap_or(0),
        timestamp: now,
        visit_count: 1,
    }
}
