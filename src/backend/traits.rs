//! 后端客户端抽象
//!
//! 所有后端（HTTP / Mock）实现 ChatBackend：chat（非流式对话）、clear（删除服务端会话）、
//! history（读取服务端历史）、health（存活探测）。

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 远程调用失败（网络、状态码、响应体解析、超时）
///
/// 对用户统一显示一句兜底文案；这里保留区分仅用于日志。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed response body: {0}")]
    Malformed(String),
}

impl TransportError {
    /// 日志用的简短分类
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Timeout => "timeout",
            TransportError::Network(_) => "network",
            TransportError::Status(_) => "status",
            TransportError::Malformed(_) => "malformed",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TransportError::Status(404))
    }
}

/// POST /chat 请求体；stream 恒为 false
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<String>,
    pub stream: bool,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, conversation_id: Option<String>) -> Self {
        Self {
            message: message.into(),
            conversation_id,
            stream: false,
        }
    }
}

/// POST /chat 响应体
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub conversation_id: String,
    /// 服务端时间（无时区 ISO-8601），见 server_time
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

impl ChatReply {
    /// 解析服务端时间；缺失或格式不对时返回 None
    pub fn server_time(&self) -> Option<NaiveDateTime> {
        self.timestamp
            .as_deref()
            .and_then(|s| s.parse::<NaiveDateTime>().ok())
    }
}

/// GET /health 响应体；缺失或为 null 的字段按 false / None 处理
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ollama_connected: Option<bool>,
    #[serde(default)]
    pub model: Option<String>,
}

impl HealthReport {
    /// 推理服务是否可用；字段缺失或为 null 视为不可用
    pub fn is_model_ready(&self) -> bool {
        self.ollama_connected.unwrap_or(false)
    }
}

/// GET /chat/history/{id} 中的单条消息
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HistoryReply {
    pub conversation_id: String,
    #[serde(default)]
    pub messages: Vec<HistoryEntry>,
}

/// 对话后端 trait
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// 发送一条消息，返回回复与（可能新分配的）会话 ID
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, TransportError>;

    /// 删除服务端会话状态
    async fn clear(&self, conversation_id: &str) -> Result<(), TransportError>;

    /// 读取服务端保存的会话历史（用于重启后恢复对话记录）
    async fn history(&self, conversation_id: &str) -> Result<HistoryReply, TransportError>;

    /// 存活探测
    async fn health(&self) -> Result<HealthReport, TransportError>;
}
