//! 集成测试共用的脚本化后端与确认

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parley::backend::{
    ChatBackend, ChatReply, ChatRequest, HealthReport, HistoryReply, TransportError,
};
use parley::ui::Confirm;
use tokio::sync::Semaphore;

pub fn reply(response: &str, conversation_id: &str) -> ChatReply {
    ChatReply {
        response: response.to_string(),
        conversation_id: conversation_id.to_string(),
        timestamp: None,
        metadata: None,
    }
}

/// 按脚本返回结果的后端，记录每次调用
#[derive(Default)]
pub struct ScriptedBackend {
    chat_calls: Mutex<Vec<ChatRequest>>,
    chat_replies: Mutex<VecDeque<Result<ChatReply, TransportError>>>,
    clear_calls: Mutex<Vec<String>>,
    clear_result: Mutex<Option<TransportError>>,
    history_result: Mutex<Option<Result<HistoryReply, TransportError>>>,
    health_results: Mutex<VecDeque<Result<HealthReport, TransportError>>>,
    health_calls: AtomicUsize,
    /// 设置后 chat 需要等到放行一个许可才返回
    gate: Option<Arc<Semaphore>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// chat 调用会卡住，直到 gate.add_permits(1)
    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        (
            Self {
                gate: Some(gate.clone()),
                ..Self::default()
            },
            gate,
        )
    }

    pub fn push_chat(&self, result: Result<ChatReply, TransportError>) {
        self.chat_replies.lock().unwrap().push_back(result);
    }

    pub fn fail_clear(&self, error: TransportError) {
        *self.clear_result.lock().unwrap() = Some(error);
    }

    pub fn set_history(&self, result: Result<HistoryReply, TransportError>) {
        *self.history_result.lock().unwrap() = Some(result);
    }

    pub fn push_health(&self, result: Result<HealthReport, TransportError>) {
        self.health_results.lock().unwrap().push_back(result);
    }

    pub fn chat_calls(&self) -> Vec<ChatRequest> {
        self.chat_calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) -> Vec<String> {
        self.clear_calls.lock().unwrap().clone()
    }

    pub fn health_calls(&self) -> usize {
        self.health_calls.load(Ordering::SeqCst)
    }

    /// 等到至少 n 次 chat 调用已经发出
    pub async fn wait_for_chat_calls(&self, n: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.chat_calls.lock().unwrap().len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("chat call never arrived");
    }
}

#[async_trait]
impl ChatBackend for ScriptedBackend {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, TransportError> {
        self.chat_calls.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
        let next = self.chat_replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(reply("ok", "default-id")))
    }

    async fn clear(&self, conversation_id: &str) -> Result<(), TransportError> {
        self.clear_calls
            .lock()
            .unwrap()
            .push(conversation_id.to_string());
        match self.clear_result.lock().unwrap().clone() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn history(&self, conversation_id: &str) -> Result<HistoryReply, TransportError> {
        self.history_result
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| {
                Ok(HistoryReply {
                    conversation_id: conversation_id.to_string(),
                    messages: vec![],
                })
            })
    }

    async fn health(&self) -> Result<HealthReport, TransportError> {
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.health_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }
}

/// 固定回答的确认，记录被问了几次
pub struct ScriptedConfirm {
    answer: bool,
    asked: AtomicUsize,
}

impl ScriptedConfirm {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirm for ScriptedConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
    }
}
