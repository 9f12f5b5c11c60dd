//! 会话 ID 持久化
//!
//! 把当前会话 ID 写入/读出 JSON 文件，用于进程重启后继续同一会话。
//! 所有操作都是尽力而为：失败只记日志，不影响会话本身。

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// 持久化失败（只在内部使用，对外一律吞掉）
#[derive(Error, Debug)]
enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store file: {0}")]
    Json(#[from] serde_json::Error),
}

/// 会话 ID 存储：save / load / clear 均不返回错误
pub trait ConversationStore: Send + Sync {
    fn save(&self, conversation_id: &str);

    /// 不存在或文件损坏时返回 None
    fn load(&self) -> Option<String>;

    fn clear(&self);
}

/// 单文件 JSON 存储：`{ "<key>": "<conversation_id>" }`，同文件内的其他键保持不动
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    key: String,
}

impl FileStore {
    pub fn new(path: impl AsRef<Path>, key: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            key: key.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, serde_json::Value>, StoreError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write_all(&self, entries: &BTreeMap<String, serde_json::Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(entries)?)?;
        Ok(())
    }

    fn try_save(&self, conversation_id: &str) -> Result<(), StoreError> {
        // 旧文件损坏时直接覆盖
        let mut entries = self.read_all().unwrap_or_default();
        entries.insert(
            self.key.clone(),
            serde_json::Value::String(conversation_id.to_string()),
        );
        self.write_all(&entries)
    }

    fn try_load(&self) -> Result<Option<String>, StoreError> {
        let entries = self.read_all()?;
        Ok(entries
            .get(&self.key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from))
    }

    fn try_clear(&self) -> Result<(), StoreError> {
        let mut entries = match self.read_all() {
            Ok(entries) => entries,
            Err(StoreError::Json(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        if entries.remove(&self.key).is_none() && self.path.exists() {
            return Ok(());
        }
        if entries.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
            }
            return Ok(());
        }
        self.write_all(&entries)
    }
}

impl ConversationStore for FileStore {
    fn save(&self, conversation_id: &str) {
        if let Err(e) = self.try_save(conversation_id) {
            tracing::warn!(path = %self.path.display(), "Failed to persist conversation id: {}", e);
        }
    }

    fn load(&self) -> Option<String> {
        match self.try_load() {
            Ok(id) => id,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Ignoring unreadable session store: {}", e);
                None
            }
        }
    }

    fn clear(&self) {
        if let Err(e) = self.try_clear() {
            tracing::warn!(path = %self.path.display(), "Failed to clear conversation id: {}", e);
        }
    }
}

/// 内存存储（测试与 mock 模式用）
#[derive(Debug, Default)]
pub struct MemoryStore {
    value: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(conversation_id: impl Into<String>) -> Self {
        Self {
            value: Mutex::new(Some(conversation_id.into())),
        }
    }
}

impl ConversationStore for MemoryStore {
    fn save(&self, conversation_id: &str) {
        if let Ok(mut value) = self.value.lock() {
            *value = Some(conversation_id.to_string());
        }
    }

    fn load(&self) -> Option<String> {
        self.value.lock().ok().and_then(|v| v.clone())
    }

    fn clear(&self) {
        if let Ok(mut value) = self.value.lock() {
            *value = None;
        }
    }
}
