//! 会话状态：会话 ID、「处理中」标志与会话代次
//!
//! processing 用原子 CAS 置位，SendPermit 在 Drop 时复位，保证任何退出路径（包括 panic、
//! future 被丢弃）都会释放，同一时刻至多一个在途请求。
//!
//! generation 在每次 reset 时加一；在途请求发出前记下代次，回来时代次已变说明会话已被清空，
//! 迟到的回复不再被采用。

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::core::Busy;

/// 进程内唯一的会话对象，由编排器持有
#[derive(Debug, Default)]
pub struct ConversationSession {
    conversation_id: Mutex<Option<String>>,
    processing: AtomicBool,
    generation: AtomicU64,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以持久化恢复的 ID 创建
    pub fn restored(conversation_id: Option<String>) -> Self {
        Self {
            conversation_id: Mutex::new(conversation_id),
            processing: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// 获取独占发送许可；已有请求在途时返回 Busy
    pub fn begin_send(&self) -> Result<SendPermit<'_>, Busy> {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| SendPermit { session: self })
            .map_err(|_| Busy)
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub fn conversation_id(&self) -> Option<String> {
        self.conversation_id
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 采用后端分配的 ID；与当前相同时不做任何事。返回是否发生变化
    pub fn adopt_conversation_id(&self, id: &str) -> bool {
        let mut current = self.conversation_id.lock().unwrap_or_else(|e| e.into_inner());
        if current.as_deref() == Some(id) {
            return false;
        }
        if let Some(old) = current.as_deref() {
            tracing::info!(old = %old, new = %id, "Backend switched conversation id");
        }
        *current = Some(id.to_string());
        true
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// 清空会话 ID 并进入下一代，不影响 processing
    pub fn reset(&self) {
        let mut current = self.conversation_id.lock().unwrap_or_else(|e| e.into_inner());
        *current = None;
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn end_send(&self) {
        self.processing.store(false, Ordering::Release);
    }
}

/// 发送许可：持有期间 processing 为 true，Drop 时释放
#[derive(Debug)]
pub struct SendPermit<'a> {
    session: &'a ConversationSession,
}

impl Drop for SendPermit<'_> {
    fn drop(&mut self) {
        self.session.end_send();
    }
}
