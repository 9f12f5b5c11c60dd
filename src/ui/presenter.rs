//! 展示层接口
//!
//! 编排器与健康监测只通过 Presenter 发出渲染命令；WatchPresenter 把命令折叠进 UiState，
//! 经 watch 通道交给 TUI 渲染。

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Local};
use tokio::sync::watch;

use crate::core::{HealthStatus, Role, TranscriptEntry, TypingHandle, UiState};

/// 渲染命令接收方
pub trait Presenter: Send + Sync {
    fn append_message(&self, role: Role, text: &str, timestamp: DateTime<Local>);

    /// 显示「输入中」占位符，返回用于移除的句柄
    fn show_typing(&self) -> TypingHandle;

    fn remove_typing(&self, handle: TypingHandle);

    /// 回到空对话（欢迎页）状态
    fn reset_transcript(&self);

    fn publish_health(&self, status: HealthStatus, model: Option<String>);

    fn set_send_enabled(&self, enabled: bool);
}

static NEXT_TYPING_ID: AtomicU64 = AtomicU64::new(0);

impl TypingHandle {
    pub fn next() -> Self {
        Self(NEXT_TYPING_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// 基于 watch 通道的 Presenter：每条命令都会产生一份新的 UiState 快照
#[derive(Debug)]
pub struct WatchPresenter {
    state_tx: watch::Sender<UiState>,
}

impl WatchPresenter {
    pub fn new() -> (Self, watch::Receiver<UiState>) {
        let (state_tx, state_rx) = watch::channel(UiState::default());
        (Self { state_tx }, state_rx)
    }

    /// 当前快照
    pub fn snapshot(&self) -> UiState {
        self.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.state_tx.subscribe()
    }
}

impl Presenter for WatchPresenter {
    fn append_message(&self, role: Role, text: &str, timestamp: DateTime<Local>) {
        self.state_tx.send_modify(|state| {
            state.transcript.push(TranscriptEntry {
                role,
                content: text.to_string(),
                timestamp,
            });
        });
    }

    fn show_typing(&self) -> TypingHandle {
        let handle = TypingHandle::next();
        self.state_tx.send_modify(|state| state.typing.push(handle));
        handle
    }

    fn remove_typing(&self, handle: TypingHandle) {
        self.state_tx
            .send_modify(|state| state.typing.retain(|h| *h != handle));
    }

    fn reset_transcript(&self) {
        self.state_tx.send_modify(|state| {
            state.transcript.clear();
            state.typing.clear();
        });
    }

    fn publish_health(&self, status: HealthStatus, model: Option<String>) {
        self.state_tx.send_modify(|state| {
            state.health = status;
            state.model = model;
        });
    }

    fn set_send_enabled(&self, enabled: bool) {
        self.state_tx.send_modify(|state| state.send_enabled = enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typing_handles_are_removed_individually() {
        let (presenter, rx) = WatchPresenter::new();
        let a = presenter.show_typing();
        let b = presenter.show_typing();
        assert_ne!(a, b);
        presenter.remove_typing(a);
        assert_eq!(rx.borrow().typing, vec![b]);
    }

    #[test]
    fn test_reset_transcript_keeps_health() {
        let (presenter, rx) = WatchPresenter::new();
        presenter.publish_health(HealthStatus::Connected, Some("phi3:latest".into()));
        presenter.append_message(Role::User, "hi", Local::now());
        presenter.reset_transcript();

        let state = rx.borrow();
        assert!(state.transcript.is_empty());
        assert_eq!(state.health, HealthStatus::Connected);
        assert_eq!(state.model.as_deref(), Some("phi3:latest"));
    }
}
