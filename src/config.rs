//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PARLEY__*` 覆盖（双下划线表示嵌套，如 `PARLEY__BACKEND__BASE_URL=http://10.0.0.2:8000`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub backend: BackendSection,
    #[serde(default)]
    pub health: HealthSection,
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub ui: UiSection,
}

/// [backend] 段：后端地址、实现选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct BackendSection {
    /// http（默认）/ mock；mock 不发起任何网络请求
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub timeouts: BackendTimeoutsSection,
}

impl Default for BackendSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            timeouts: BackendTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "http".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

/// [backend.timeouts] 段（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct BackendTimeoutsSection {
    /// /chat、/chat/clear、/chat/history 的请求超时
    #[serde(default = "default_request_timeout")]
    pub request: u64,
    /// /health 探测超时
    #[serde(default = "default_health_timeout")]
    pub health: u64,
}

impl Default for BackendTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
            health: default_health_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

fn default_health_timeout() -> u64 {
    5
}

/// [health] 段：轮询间隔
#[derive(Debug, Clone, Deserialize)]
pub struct HealthSection {
    #[serde(default = "default_health_interval")]
    pub interval_secs: u64,
}

impl Default for HealthSection {
    fn default() -> Self {
        Self {
            interval_secs: default_health_interval(),
        }
    }
}

fn default_health_interval() -> u64 {
    30
}

/// [storage] 段：会话 ID 持久化文件与键名
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSection {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            key: default_storage_key(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/session.json")
}

fn default_storage_key() -> String {
    "conversation_id".to_string()
}

/// [logging] 段：TUI 占用终端，日志写文件
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_file")]
    pub file: PathBuf,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            file: default_log_file(),
        }
    }
}

fn default_log_file() -> PathBuf {
    PathBuf::from("logs/parley.log")
}

/// [ui] 段
#[derive(Debug, Clone, Deserialize)]
pub struct UiSection {
    /// 空对话时显示的欢迎语
    #[serde(default = "default_welcome")]
    pub welcome: String,
    /// 清空对话前是否需要确认
    #[serde(default = "default_confirm_reset")]
    pub confirm_reset: bool,
}

impl Default for UiSection {
    fn default() -> Self {
        Self {
            welcome: default_welcome(),
            confirm_reset: default_confirm_reset(),
        }
    }
}

fn default_welcome() -> String {
    "Hi! Ask me anything: calculations, the current time, or a quick web search.".to_string()
}

fn default_confirm_reset() -> bool {
    true
}

/// 从 config 目录加载配置，环境变量 PARLEY__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PARLEY__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PARLEY")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.backend.base_url, "http://localhost:8000");
        assert_eq!(cfg.backend.timeouts.request, 60);
        assert_eq!(cfg.health.interval_secs, 30);
        assert_eq!(cfg.storage.key, "conversation_id");
        assert!(cfg.ui.confirm_reset);
    }

    #[test]
    fn test_load_from_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[backend]\nbase_url = \"http://example:9000\"\n[health]\ninterval_secs = 10\n",
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.backend.base_url, "http://example:9000");
        assert_eq!(cfg.health.interval_secs, 10);
        // 未出现的段保持默认
        assert_eq!(cfg.backend.timeouts.health, 5);
        assert_eq!(cfg.storage.path, PathBuf::from("data/session.json"));
    }
}
