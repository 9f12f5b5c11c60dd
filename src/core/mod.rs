//! 核心编排层：会话状态、请求编排、健康监测、运行时装配与关闭

pub mod error;
pub mod health;
pub mod orchestrator;
pub mod runtime;
pub mod session;
pub mod shutdown;
pub mod state;

pub use error::{Busy, SkipReason};
pub use health::{HealthMonitor, HealthStatus};
pub use orchestrator::{
    RequestOrchestrator, ResetOutcome, RestoreOutcome, SendOutcome, FALLBACK_REPLY, RESET_PROMPT,
};
pub use runtime::{create_client, ClientHandle, Command};
pub use session::{ConversationSession, SendPermit};
pub use shutdown::{ShutdownManager, ShutdownReason};
pub use state::{Role, TranscriptEntry, TypingHandle, UiState};
