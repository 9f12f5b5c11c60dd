//! 请求编排器：发送消息、清空会话、启动时恢复对话记录
//!
//! 发送与恢复先取得会话许可（同一时刻至多一个在途请求，后来者直接拒绝、不排队）；清空不受许可
//! 限制，随时可执行，并使在途请求的迟到回复作废。远程调用是唯一的挂起点；所有远程失败都在这里
//! 吞掉并转为一句兜底回复或日志。

use std::sync::{Arc, Mutex};

use chrono::{Local, TimeZone};

use crate::backend::{ChatBackend, ChatReply, ChatRequest, TransportError};
use crate::core::{ConversationSession, Role, SendPermit, SkipReason};
use crate::store::ConversationStore;
use crate::ui::{Confirm, Presenter};

/// 远程失败时显示给用户的唯一一句话
pub const FALLBACK_REPLY: &str = "Sorry, I couldn't reach the assistant. Please try again.";

/// 清空确认提示
pub const RESET_PROMPT: &str = "Clear this conversation? (y/n)";

/// 一次 send_message 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// 空输入或已有请求在途，无任何副作用
    Skipped(SkipReason),
    /// 已收到回复并采用会话 ID
    Delivered { conversation_id: String },
    /// 远程失败，已显示兜底回复
    Failed(TransportError),
    /// 等待期间会话被清空，回复（或失败）已丢弃
    Superseded,
}

/// 一次 reset_conversation 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// 用户拒绝确认，状态未变
    Declined,
    /// 已回到空会话；remote_cleared 表示服务端是否确认删除
    Reset { remote_cleared: bool },
}

/// 启动恢复的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// 没有保存的会话 ID
    Fresh,
    /// 已回放 n 条历史消息
    Restored(usize),
    /// 服务端已不认识该会话，本地已清空
    Forgotten,
    /// 读取失败，保留会话 ID
    Unavailable,
}

/// 持有许可期间关闭发送按钮；Drop 时先释放许可再重新打开
struct SendGuard<'a> {
    permit: Option<SendPermit<'a>>,
    presenter: &'a dyn Presenter,
}

impl<'a> SendGuard<'a> {
    fn new(permit: SendPermit<'a>, presenter: &'a dyn Presenter) -> Self {
        presenter.set_send_enabled(false);
        Self {
            permit: Some(permit),
            presenter,
        }
    }
}

impl Drop for SendGuard<'_> {
    fn drop(&mut self) {
        drop(self.permit.take());
        self.presenter.set_send_enabled(true);
    }
}

/// 请求编排器：会话、后端、持久化、展示层的唯一协调者
pub struct RequestOrchestrator {
    session: ConversationSession,
    backend: Arc<dyn ChatBackend>,
    store: Arc<dyn ConversationStore>,
    presenter: Arc<dyn Presenter>,
    confirm: Arc<dyn Confirm>,
    /// 串行化「采用 ID + 保存」与「清空」两组同步步骤
    commit: Mutex<()>,
}

impl RequestOrchestrator {
    /// 创建编排器，并从持久化恢复会话 ID
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn ConversationStore>,
        presenter: Arc<dyn Presenter>,
        confirm: Arc<dyn Confirm>,
    ) -> Self {
        let restored = store.load();
        if let Some(id) = restored.as_deref() {
            tracing::info!(conversation_id = %id, "Restored conversation id");
        }
        Self {
            session: ConversationSession::restored(restored),
            backend,
            store,
            presenter,
            confirm,
            commit: Mutex::new(()),
        }
    }

    pub fn session(&self) -> &ConversationSession {
        &self.session
    }

    /// 发送一条用户消息
    pub async fn send_message(&self, raw_text: &str) -> SendOutcome {
        let text = raw_text.trim();
        if text.is_empty() {
            return SendOutcome::Skipped(SkipReason::EmptyInput);
        }
        let permit = match self.session.begin_send() {
            Ok(permit) => permit,
            Err(busy) => {
                tracing::debug!("Send ignored: {}", busy);
                return SendOutcome::Skipped(busy.into());
            }
        };
        let _guard = SendGuard::new(permit, self.presenter.as_ref());

        self.presenter.append_message(Role::User, text, Local::now());
        let typing = self.presenter.show_typing();

        let generation = self.session.generation();
        let request = ChatRequest::new(text, self.session.conversation_id());
        let result = self.backend.chat(&request).await;
        self.presenter.remove_typing(typing);

        match result {
            Ok(reply) => {
                if !self.apply_reply(&reply, generation) {
                    tracing::info!(
                        conversation_id = %reply.conversation_id,
                        "Conversation was reset while waiting, dropping reply"
                    );
                    return SendOutcome::Superseded;
                }
                SendOutcome::Delivered {
                    conversation_id: reply.conversation_id,
                }
            }
            Err(e) if self.session.generation() != generation => {
                tracing::debug!(kind = e.kind(), "Chat failed after reset: {}", e);
                SendOutcome::Superseded
            }
            Err(e) => {
                tracing::warn!(
                    kind = e.kind(),
                    conversation_id = ?request.conversation_id,
                    "Chat request failed: {}",
                    e
                );
                self.presenter
                    .append_message(Role::Assistant, FALLBACK_REPLY, Local::now());
                SendOutcome::Failed(e)
            }
        }
    }

    /// 采用回复；发出后会话已被清空（代次变化）时什么都不做，返回 false
    fn apply_reply(&self, reply: &ChatReply, generation: u64) -> bool {
        let _commit = self.commit.lock().unwrap_or_else(|e| e.into_inner());
        if self.session.generation() != generation {
            return false;
        }
        if self.session.adopt_conversation_id(&reply.conversation_id) {
            tracing::info!(conversation_id = %reply.conversation_id, "Adopted conversation id");
        }
        self.store.save(&reply.conversation_id);

        let timestamp = reply
            .server_time()
            .and_then(|t| Local.from_local_datetime(&t).single())
            .unwrap_or_else(Local::now);
        self.presenter
            .append_message(Role::Assistant, &reply.response, timestamp);
        true
    }

    /// 清空当前会话：有 ID 时先确认，再尽力删除服务端状态；本地状态总是以本地为准。
    /// 不检查 processing，在途请求的回复会被作废
    pub async fn reset_conversation(&self) -> ResetOutcome {
        let mut remote_cleared = false;
        if let Some(id) = self.session.conversation_id() {
            if !self.confirm.confirm(RESET_PROMPT).await {
                tracing::debug!("Reset declined");
                return ResetOutcome::Declined;
            }
            match self.backend.clear(&id).await {
                Ok(()) => remote_cleared = true,
                Err(e) => {
                    tracing::warn!(
                        kind = e.kind(),
                        conversation_id = %id,
                        "Remote clear failed, resetting locally: {}",
                        e
                    );
                }
            }
        }

        self.clear_local();
        ResetOutcome::Reset { remote_cleared }
    }

    fn clear_local(&self) {
        let _commit = self.commit.lock().unwrap_or_else(|e| e.into_inner());
        self.session.reset();
        self.store.clear();
        self.presenter.reset_transcript();
    }

    /// 启动时回放服务端保存的历史；服务端返回 404 说明会话已丢失（服务端重启），本地随之清空
    pub async fn restore_transcript(&self) -> RestoreOutcome {
        let Some(id) = self.session.conversation_id() else {
            return RestoreOutcome::Fresh;
        };
        let permit = match self.session.begin_send() {
            Ok(permit) => permit,
            Err(_) => return RestoreOutcome::Unavailable,
        };
        let _guard = SendGuard::new(permit, self.presenter.as_ref());

        let generation = self.session.generation();
        let result = self.backend.history(&id).await;
        if self.session.generation() != generation {
            tracing::debug!(conversation_id = %id, "Conversation was reset during restore");
            return RestoreOutcome::Fresh;
        }

        match result {
            Ok(history) => {
                let now = Local::now();
                for entry in &history.messages {
                    self.presenter
                        .append_message(Role::from_wire(&entry.role), &entry.content, now);
                }
                tracing::info!(
                    conversation_id = %id,
                    messages = history.messages.len(),
                    "Restored transcript"
                );
                RestoreOutcome::Restored(history.messages.len())
            }
            Err(e) if e.is_not_found() => {
                tracing::info!(conversation_id = %id, "Backend no longer knows this conversation");
                self.clear_local();
                RestoreOutcome::Forgotten
            }
            Err(e) => {
                tracing::warn!(kind = e.kind(), conversation_id = %id, "Could not load history: {}", e);
                RestoreOutcome::Unavailable
            }
        }
    }
}
