//! Capture settings - auto capture toggle and domain filter lists / 捕获设置
//!
//! Stored in the `capture_settings` table and read fresh for every capture
//! decision, so changes apply without a restart.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Row, Sqlite};

use crate::capture::policy::{is_valid_domain_entry, normalize_domain_entry};
use crate::error::SettingsError;

/// Domain filter mode / 域名过滤模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Capture unless the host is listed / 黑名单
    #[default]
    Blacklist,
    /// Capture only listed hosts / 白名单
    Whitelist,
}

impl FilterMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterMode::Blacklist => "blacklist",
            FilterMode::Whitelist => "whitelist",
        }
    }
}

impl From<&str> for FilterMode {
    fn from(s: &str) -> Self {
        match s {
            "whitelist" => FilterMode::Whitelist,
            _ => FilterMode::Blacklist,
        }
    }
}

/// Which domain list an edit applies to / 域名列表类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainList {
    Blacklist,
    Whitelist,
}

/// Capture policy configuration / 捕获策略配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    pub auto_capture_enabled: bool,
    pub filter_mode: FilterMode,
    pub domain_blacklist: Vec<String>,
    pub domain_whitelist: Vec<String>,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            auto_capture_enabled: true,
            filter_mode: FilterMode::Blacklist,
            domain_blacklist: Vec::new(),
            domain_whitelist: Vec::new(),
        }
    }
}

impl CaptureSettings {
    fn list_mut(&mut self, list: DomainList) -> &mut Vec<String> {
        match list {
            DomainList::Blacklist => &mut self.domain_blacklist,
            DomainList::Whitelist => &mut self.domain_whitelist,
        }
    }
}

/// Read accessor for capture settings / 设置读取接口
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn load(&self) -> Result<CaptureSettings, SettingsError>;
}

/// Settings persisted in SQLite / SQLite 设置存储
#[derive(Clone)]
pub struct SqliteSettings {
    db: Pool<Sqlite>,
}

impl SqliteSettings {
    pub fn new(db: Pool<Sqlite>) -> Self {
        Self { db }
    }

    /// Replace all settings; domain entries are validated and normalized / 保存设置
    pub async fn save(&self, settings: &CaptureSettings) -> Result<CaptureSettings, SettingsError> {
        let mut clean = settings.clone();
        clean.domain_blacklist = normalize_list(&settings.domain_blacklist)?;
        clean.domain_whitelist = normalize_list(&settings.domain_whitelist)?;

        let now = chrono::Utc::now().to_rfc3339();
        sqlx::query(
            r#"INSERT OR REPLACE INTO capture_settings
               (id, auto_capture_enabled, filter_mode, domain_blacklist, domain_whitelist, updated_at)
               VALUES (1, ?, ?, ?, ?, ?)"#,
        )
        .bind(clean.auto_capture_enabled)
        .bind(clean.filter_mode.as_str())
        .bind(serde_json::to_string(&clean.domain_blacklist)?)
        .bind(serde_json::to_string(&clean.domain_whitelist)?)
        .bind(&now)
        .execute(&self.db)
        .await?;

        tracing::info!(
            "Capture settings saved: auto={}, mode={}, blacklist={}, whitelist={}",
            clean.auto_capture_enabled,
            clean.filter_mode.as_str(),
            clean.domain_blacklist.len(),
            clean.domain_whitelist.len()
        );
        Ok(clean)
    }

    /// Add one domain entry to a list / 添加域名
    pub async fn add_domain(&self, list: DomainList, entry: &str) -> Result<CaptureSettings, SettingsError> {
        let domain = normalize_domain_entry(entry);
        if !is_valid_domain_entry(&domain) {
            return Err(SettingsError::InvalidDomain(entry.to_string()));
        }

        let mut settings = self.load().await?;
        let target = settings.list_mut(list);
        if target.contains(&domain) {
            return Err(SettingsError::Duplicate(domain));
        }
        target.push(domain);
        target.sort();
        self.save(&settings).await
    }

    /// Remove one domain entry; removing an absent entry is not an error / 移除域名
    pub async fn remove_domain(&self, list: DomainList, entry: &str) -> Result<CaptureSettings, SettingsError> {
        let domain = normalize_domain_entry(entry);
        let mut settings = self.load().await?;
        settings.list_mut(list).retain(|d| d != &domain);
        self.save(&settings).await
    }
}

#[async_trait]
impl SettingsSource for SqliteSettings {
    async fn load(&self) -> Result<CaptureSettings, SettingsError> {
        let row = sqlx::query(
            "SELECT auto_capture_enabled, filter_mode, domain_blacklist, domain_whitelist FROM capture_settings WHERE id = 1",
        )
        .fetch_optional(&self.db)
        .await?;

        let Some(row) = row else {
            return Ok(CaptureSettings::default());
        };

        let mode: String = row.get("filter_mode");
        let blacklist: String = row.get("domain_blacklist");
        let whitelist: String = row.get("domain_whitelist");
        Ok(CaptureSettings {
            auto_capture_enabled: row.get("auto_capture_enabled"),
            filter_mode: FilterMode::from(mode.as_str()),
            domain_blacklist: serde_json::from_str(&blacklist)?,
            domain_whitelist: serde_json::from_str(&whitelist)?,
        })
    }
}

/// Fixed settings, for tests and embedding / 固定设置
#[async_trait]
impl SettingsSource for CaptureSettings {
    async fn load(&self) -> Result<CaptureSettings, SettingsError> {
        Ok(self.clone())
    }
}

fn normalize_list(entries: &[String]) -> Result<Vec<String>, SettingsError> {
    let mut out: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let domain = normalize_domain_entry(entry);
        if domain.is_empty() {
            continue;
        }
        if !is_valid_domain_entry(&domain) {
            return Err(SettingsError::InvalidDomain(entry.clone()));
        }
        if !out.contains(&domain) {
            out.push(domain);
        }
    }
    out.sort();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn create_settings() -> SqliteSettings {
        let pool = db::connect_memory().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        SqliteSettings::new(pool)
    }

    #[tokio::test]
    async fn test_defaults() {
        let settings = create_settings().await;
        assert_eq!(settings.load().await.unwrap(), CaptureSettings::default());
    }

    #[tokio::test]
    async fn test_save_is_read_back_fresh() {
        let settings = create_settings().await;
        let saved = settings
            .save(&CaptureSettings {
                auto_capture_enabled: false,
                filter_mode: FilterMode::Whitelist,
                domain_blacklist: vec![],
                domain_whitelist: vec!["Example.COM ".to_string(), "example.com".to_string()],
            })
            .await
            .unwrap();
        assert_eq!(saved.domain_whitelist, vec!["example.com"]);

        let loaded = settings.load().await.unwrap();
        assert!(!loaded.auto_capture_enabled);
        assert_eq!(loaded.filter_mode, FilterMode::Whitelist);
        assert_eq!(loaded.domain_whitelist, vec!["example.com"]);
    }

    #[tokio::test]
    async fn test_add_and_remove_domain() {
        let settings = create_settings().await;
        settings.add_domain(DomainList::Blacklist, "*.ads.test").await.unwrap();
        settings.add_domain(DomainList::Blacklist, "tracker.test").await.unwrap();

        let dup = settings.add_domain(DomainList::Blacklist, "TRACKER.test").await;
        assert!(matches!(dup, Err(SettingsError::Duplicate(_))));

        let invalid = settings.add_domain(DomainList::Blacklist, "not a domain").await;
        assert!(matches!(invalid, Err(SettingsError::InvalidDomain(_))));

        let after = settings.remove_domain(DomainList::Blacklist, "tracker.test").await.unwrap();
        assert_eq!(after.domain_blacklist, vec!["*.ads.test"]);
    }

    #[test]
    fn test_filter_mode_from_str() {
        assert_eq!(FilterMode::from("whitelist"), FilterMode::Whitelist);
        assert_eq!(FilterMode::from("blacklist"), FilterMode::Blacklist);
        assert_eq!(FilterMode::from("unknown"), FilterMode::Blacklist);
    }
}
