//! Page library - owns the record store and the search index / 页面库服务
//!
//! Every store mutation is followed by the matching index mutation before the
//! caller gets control back:
//! - saves for the same URL are serialized by a per-URL lock / 同一 URL 串行保存
//! - `clear` excludes all saves while it empties store and index / 清空时独占
//! - an index error triggers a full rebuild under the exclusive gate / 索引漂移时独占重建

use parking_lot::Mutex;
use sqlx::{Pool, Sqlite};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard, RwLock};

use crate::config::AppConfig;
use crate::db;
use crate::error::{IndexError, LibraryError};
use crate::models::{CapturedDocument, PartialDocument, StoreStats, UpsertOutcome};
use crate::search::SearchIndex;
use crate::store::PageStore;

/// Keyed async locks, one per URL / 按 URL 加锁
#[derive(Default)]
struct UrlLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl UrlLocks {
    async fn acquire(&self, url: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.entry(url.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop locks nobody holds or waits on / 清理空闲锁
    fn prune(&self, url: &str) {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(url) {
            if Arc::strong_count(lock) == 1 {
                locks.remove(url);
            }
        }
    }
}

/// Page library service / 页面库
pub struct PageLibrary {
    store: PageStore,
    index: SearchIndex,
    url_locks: UrlLocks,
    /// Shared by saves, exclusive for clear and rebuild / 写入闸门
    gate: RwLock<()>,
}

impl PageLibrary {
    /// Open the configured database, migrate it and build the index / 打开页面库
    pub async fn open(config: &AppConfig) -> Result<Self, LibraryError> {
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| config.get_database_url());
        let pool = db::connect(&database_url, config.database.max_connections).await?;
        Self::with_pool(pool).await
    }

    /// Build on an existing pool / 使用现有连接池
    pub async fn with_pool(pool: Pool<Sqlite>) -> Result<Self, LibraryError> {
        db::run_migrations(&pool).await?;
        let library = Self {
            store: PageStore::new(pool),
            index: SearchIndex::new(),
            url_locks: UrlLocks::default(),
            gate: RwLock::new(()),
        };
        library.rebuild().await?;
        Ok(library)
    }

    /// In-memory library, used by tests / 内存页面库
    pub async fn in_memory() -> Result<Self, LibraryError> {
        let pool = db::connect_memory().await?;
        Self::with_pool(pool).await
    }

    pub fn store(&self) -> &PageStore {
        &self.store
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Close the connection pool / 关闭数据库连接池
    pub async fn close(&self) {
        self.store.pool().close().await;
    }

    /// Rebuild the index from every stored page / 从存储重建索引
    pub async fn rebuild(&self) -> Result<usize, LibraryError> {
        let _gate = self.gate.write().await;
        self.rebuild_locked().await
    }

    async fn rebuild_locked(&self) -> Result<usize, LibraryError> {
        let pages = self.store.get_all().await?;
        Ok(self.index.rebuild_from(&pages))
    }

    /// Upsert a page and index it / 保存页面并更新索引
    pub async fn save(&self, candidate: &PartialDocument) -> Result<UpsertOutcome, LibraryError> {
        let (outcome, drift) = {
            let _gate = self.gate.read().await;
            let guard = self.url_locks.acquire(&candidate.url).await;

            let result = self.save_locked(candidate).await;

            drop(guard);
            self.url_locks.prune(&candidate.url);
            result?
        };

        // Rebuild outside the shared gate so no concurrent save slips past it
        if let Some(error) = drift {
            tracing::error!("Search index inconsistent with store ({}), rebuilding", error);
            self.rebuild().await?;
        }

        tracing::debug!(
            "Saved page {} ({}), visit #{}{}",
            outcome.record.id,
            outcome.record.url,
            outcome.record.visit_count,
            if outcome.was_update { ", updated" } else { "" }
        );
        Ok(outcome)
    }

    /// Store then index; an index error is handed back for recovery / 写入存储与索引
    async fn save_locked(
        &self,
        candidate: &PartialDocument,
    ) -> Result<(UpsertOutcome, Option<IndexError>), LibraryError> {
        let outcome = self.store.upsert(candidate).await?;

        let indexed = if outcome.was_update {
            self.index.update(&outcome.record)
        } else {
            self.index.add(&outcome.record)
        };

        Ok((outcome, indexed.err()))
    }

    /// Delete one page from store and index / 删除单个页面
    pub async fn delete(&self, id: i64) -> Result<bool, LibraryError> {
        let _gate = self.gate.write().await;
        let removed = self.store.delete(id).await?;
        let unindexed = self.index.remove(id);
        if removed != unindexed {
            let error = IndexError::Drift { id, reason: "delete membership mismatch" };
            tracing::error!("Search index inconsistent with store ({}), rebuilding", error);
            // the write gate is already held
            self.rebuild_locked().await?;
        }
        Ok(removed)
    }

    /// Remove every page; the index is emptied before this returns / 清空页面与索引
    pub async fn clear(&self) -> Result<u64, LibraryError> {
        let _gate = self.gate.write().await;
        let removed = self.store.clear().await?;
        self.index.clear();
        tracing::info!("Cleared {} stored pages and the search index", removed);
        Ok(removed)
    }

    pub async fn get_all(&self) -> Result<Vec<CapturedDocument>, LibraryError> {
        Ok(self.store.get_all().await?)
    }

    pub async fn get_by_url(&self, url: &str) -> Result<Option<CapturedDocument>, LibraryError> {
        Ok(self.store.get_by_url(url).await?)
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<CapturedDocument>, LibraryError> {
        Ok(self.store.get_by_id(id).await?)
    }

    pub async fn stats(&self) -> Result<StoreStats, LibraryError> {
        Ok(self.store.stats().await?)
    }

    /// Compare index membership and content with the store / 校验索引与存储一致
    pub async fn verify(&self) -> Result<bool, LibraryError> {
        let _gate = self.gate.write().await;
        let pages = self.store.get_all().await?;
        let consistent = pages.len() == self.index.len()
            && pages
                .iter()
                .all(|p| self.index.entry(p.id).map(|e| e.matches(p)).unwrap_or(false));
        if !consistent {
            tracing::warn!("Search index drift detected during verification");
        }
        Ok(consistent)
    }
}
