//! Database connection and migrations / 数据库连接与迁移
//!
//! The schema is versioned with `PRAGMA user_version`. A version bump drops and
//! recreates the `pages` table, so captured pages are lost on upgrade.
//! 版本升级会重建 pages 表（数据丢失）

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Current page schema version / 当前表结构版本
pub const SCHEMA_VERSION: i64 = 3;

/// Open a pool on a SQLite URL with WAL mode / 打开连接池（WAL 模式）
pub async fn connect(database_url: &str, max_connections: u32) -> Result<Pool<Sqlite>, sqlx::Error> {
    if let Some(path) = database_url
        .strip_prefix("sqlite:")
        .map(|rest| rest.split('?').next().unwrap_or(rest))
        .filter(|p| !p.is_empty() && !p.starts_with(':'))
    {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    // Pragmas go on the connect options so every pooled connection gets them
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        // 启用WAL模式，提高并发性能
        .journal_mode(SqliteJournalMode::Wal)
        // 设置busy_timeout，避免锁超时
        .busy_timeout(Duration::from_secs(5))
        .synchronous(SqliteSynchronous::Normal);

    let db = SqlitePoolOptions::new()
        .max_connections(max_connections.max(1))
        .connect_with(options)
        .await?;

    tracing::info!("Page database opened: {} (WAL mode)", database_url);
    Ok(db)
}

/// In-memory database, single connection so every query sees the same data / 内存数据库
pub async fn connect_memory() -> Result<Pool<Sqlite>, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
}

/// Run database migrations / 运行数据库迁移
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<(), sqlx::Error> {
    let version: i64 = sqlx::query_scalar("PRAGMA user_version")
        .fetch_one(pool)
        .await?;

    if version != SCHEMA_VERSION {
        if version != 0 {
            tracing::warn!(
                "Page schema upgrade {} -> {}: dropping stored pages",
                version,
                SCHEMA_VERSION
            );
        }
        sqlx::query("DROP TABLE IF EXISTS pages").execute(pool).await?;
    }

    // AUTOINCREMENT 保证 id 删除后不复用
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            excerpt TEXT NOT NULL DEFAULT '',
            site_name TEXT NOT NULL DEFAULT '',
            word_count INTEGER NOT NULL DEFAULT 0,
            reading_time INTEGER NOT NULL DEFAULT 0,
            timestamp TEXT NOT NULL,
            visit_count INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_url ON pages(url)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pages_timestamp ON pages(timestamp)")
        .execute(pool)
        .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS capture_settings (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            auto_capture_enabled INTEGER NOT NULL DEFAULT 1,
            filter_mode TEXT NOT NULL DEFAULT 'blacklist',
            domain_blacklist TEXT NOT NULL DEFAULT '[]',
            domain_whitelist TEXT NOT NULL DEFAULT '[]',
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    let now = chrono::Utc::now().to_rfc3339();
    sqlx::query("INSERT OR IGNORE INTO capture_settings (id, updated_at) VALUES (1, ?)")
        .bind(&now)
        .execute(pool)
        .await?;

    // PRAGMA 不支持参数绑定
    sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
        .execute(pool)
        .await?;

    Ok(())
}
