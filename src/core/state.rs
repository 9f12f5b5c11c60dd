//! 状态定义：UiState 投影
//!
//! UI 只持有轻量的 UiState（对话记录、输入中标记、健康状态、发送开关），由 Presenter 维护。

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::core::HealthStatus;

/// 消息角色
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    /// 解析服务端历史中的 role 字段；未知角色归为 System
    pub fn from_wire(role: &str) -> Self {
        match role {
            "user" | "human" => Role::User,
            "assistant" | "ai" => Role::Assistant,
            _ => Role::System,
        }
    }
}

/// 对话记录中的一条消息（纯文本，不做 markdown/HTML 解释）
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TranscriptEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

/// 「输入中」占位符句柄
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TypingHandle(pub(crate) u64);

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct UiState {
    pub transcript: Vec<TranscriptEntry>,
    pub typing: Vec<TypingHandle>,
    pub health: HealthStatus,
    /// 健康探测返回的模型名
    pub model: Option<String>,
    pub send_enabled: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            transcript: Vec::new(),
            typing: Vec::new(),
            health: HealthStatus::Unknown,
            model: None,
            send_enabled: true,
        }
    }
}

impl UiState {
    /// 某角色的消息条数（测试与渲染统计用）
    pub fn count(&self, role: Role) -> usize {
        self.transcript.iter().filter(|e| e.role == role).count()
    }

    pub fn is_typing(&self) -> bool {
        !self.typing.is_empty()
    }
}
