//! 持久化层：会话 ID 的跨进程保存

pub mod persistence;

pub use persistence::{ConversationStore, FileStore, MemoryStore};
