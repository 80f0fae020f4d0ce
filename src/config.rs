//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Database configuration / 数据库配置
    pub database: DatabaseConfig,
    /// Capture timing configuration / 捕获时序配置
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Content limits / 内容限制
    #[serde(default)]
    pub content: ContentLimits,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Database configuration / 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Page database file (relative to data_dir) / 页面数据库文件
    pub db_file: String,
    /// Max pool connections / 连接池大小
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 { 4 }

/// Capture timing, all values in milliseconds / 捕获时序（毫秒）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Readiness poll attempts / 就绪检测次数
    pub max_retries: u32,
    /// Delay between readiness polls / 重试间隔
    pub retry_delay_ms: u64,
    /// Settle delay for full document loads / 普通页面等待
    pub regular_page_delay_ms: u64,
    /// Settle delay for client-side route changes / SPA 页面等待
    pub spa_page_delay_ms: u64,
    /// Extra wait applied before an SPA capture is scheduled / SPA 额外检测延迟
    pub content_check_delay_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay_ms: 800,
            regular_page_delay_ms: 1000,
            spa_page_delay_ms: 2000,
            content_check_delay_ms: 1500,
        }
    }
}

impl CaptureConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Total settle delay before readiness polling starts / 轮询前的总等待
    pub fn settle_delay(&self, is_spa: bool) -> Duration {
        if is_spa {
            Duration::from_millis(self.content_check_delay_ms + self.spa_page_delay_ms)
        } else {
            Duration::from_millis(self.regular_page_delay_ms)
        }
    }
}

/// Content extraction limits / 内容提取限制
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentLimits {
    /// Stored content is truncated to this many characters / 最大内容长度
    pub max_content_length: usize,
    /// Excerpt length in characters / 摘要长度
    pub excerpt_length: usize,
    /// Body text shorter than this is not worth capturing / 最小内容长度
    pub min_content_length: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            max_content_length: 10_000,
            excerpt_length: 200,
            min_content_length: 50,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8190,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "pages.db".to_string(),
            max_connections: default_max_connections(),
        }
    }
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&get_config_path())
}

/// Load configuration from an explicit path / 从指定路径加载配置
pub fn load_config_from(config_path: &Path) -> Result<AppConfig, String> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config_to(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config_to(config: &AppConfig, config_path: &Path) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_written_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = load_config_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.capture.max_retries, 5);
        assert_eq!(config.content.excerpt_length, 200);

        let reloaded = load_config_from(&path).unwrap();
        assert_eq!(reloaded.server.port, config.server.port);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"server":{"host":"0.0.0.0","port":9000},"database":{"data_dir":"d","db_file":"x.db"}}"#,
        ).unwrap();

        let config = load_config_from(&path).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.database.max_connections, 4);
        assert_eq!(config.capture.retry_delay_ms, 800);
        assert_eq!(config.get_database_url(), format!("sqlite:{}?mode=rwc", Path::new("d").join("x.db").to_string_lossy()));
    }

    #[test]
    fn test_settle_delay() {
        let capture = CaptureConfig::default();
        assert_eq!(capture.settle_delay(false), Duration::from_millis(1000));
        assert_eq!(capture.settle_delay(true), Duration::from_millis(3500));
    }
}
