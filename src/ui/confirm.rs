//! 是/否确认
//!
//! 清空对话前询问用户。TuiConfirm 把问题交给 TUI 主循环，在输入框上方显示并等待 y/n。

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// 确认界面
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// 不询问，直接同意（配置 ui.confirm_reset = false 时使用）
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

#[async_trait]
impl Confirm for AlwaysConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

/// 一次待回答的确认
#[derive(Debug)]
pub struct ConfirmRequest {
    pub prompt: String,
    pub reply: oneshot::Sender<bool>,
}

impl ConfirmRequest {
    pub fn answer(self, yes: bool) {
        let _ = self.reply.send(yes);
    }
}

/// 通过通道请求 TUI 确认；TUI 已退出或丢弃请求时视为拒绝
#[derive(Debug, Clone)]
pub struct TuiConfirm {
    tx: mpsc::UnboundedSender<ConfirmRequest>,
}

impl TuiConfirm {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConfirmRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl Confirm for TuiConfirm {
    async fn confirm(&self, prompt: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        let request = ConfirmRequest {
            prompt: prompt.to_string(),
            reply,
        };
        if self.tx.send(request).is_err() {
            return false;
        }
        answer.await.unwrap_or(false)
    }
}
