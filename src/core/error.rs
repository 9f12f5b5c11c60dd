//! 会话错误类型与跳过原因
//!
//! 远程调用失败见 backend::TransportError；这里只有会话层自身的拒绝理由。

use thiserror::Error;

/// 已有请求在途，拒绝新的发送（不排队）
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("a send is already in progress")]
pub struct Busy;

/// 静默跳过一次发送的原因（不向用户显示错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 去掉首尾空白后为空
    EmptyInput,
    /// 已有请求在途
    Busy,
}

impl From<Busy> for SkipReason {
    fn from(_: Busy) -> Self {
        SkipReason::Busy
    }
}
