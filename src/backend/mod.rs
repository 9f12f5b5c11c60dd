//! 后端层：对话服务客户端抽象与实现（HTTP / Mock）

pub mod http;
pub mod mock;
pub mod traits;

pub use http::HttpBackend;
pub use mock::MockBackend;
pub use traits::{
    ChatBackend, ChatReply, ChatRequest, HealthReport, HistoryEntry, HistoryReply, TransportError,
};
