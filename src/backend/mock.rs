//! Mock 后端（用于离线运行与测试，无需服务端）
//!
//! 回显用户消息，按需分配 UUID 会话 ID，并在内存中保存历史，行为与真实服务的内存存储一致。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backend::{
    ChatBackend, ChatReply, ChatRequest, HealthReport, HistoryEntry, HistoryReply, TransportError,
};

/// Mock 后端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockBackend {
    conversations: Mutex<HashMap<String, Vec<HistoryEntry>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatBackend for MockBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        let id = request
            .conversation_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let response = format!("Echo from Mock: {}", request.message);

        let mut conversations = self.conversations.lock().await;
        let history = conversations.entry(id.clone()).or_default();
        history.push(HistoryEntry {
            role: "user".to_string(),
            content: request.message.clone(),
        });
        history.push(HistoryEntry {
            role: "assistant".to_string(),
            content: response.clone(),
        });

        Ok(ChatReply {
            response,
            conversation_id: id,
            timestamp: None,
            metadata: None,
        })
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), TransportError> {
        match self.conversations.lock().await.remove(conversation_id) {
            Some(_) => Ok(()),
            None => Err(TransportError::Status(404)),
        }
    }

    async fn history(&self, conversation_id: &str) -> Result<HistoryReply, TransportError> {
        let conversations = self.conversations.lock().await;
        let messages = conversations
            .get(conversation_id)
            .cloned()
            .ok_or(TransportError::Status(404))?;
        Ok(HistoryReply {
            conversation_id: conversation_id.to_string(),
            messages,
        })
    }

    async fn health(&self) -> Result<HealthReport, TransportError> {
        Ok(HealthReport {
            status: Some("healthy".to_string()),
            ollama_connected: Some(true),
            model: Some("mock".to_string()),
        })
    }
}
