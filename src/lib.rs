//! Parley - 单用户对话客户端
//!
//! 模块划分：
//! - **backend**: 对话服务客户端抽象与实现（HTTP / Mock）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 会话状态、请求编排、健康监测、运行时装配、优雅关闭
//! - **observability**: 日志初始化
//! - **store**: 会话 ID 持久化
//! - **ui**: 渲染命令接口与 Ratatui TUI 界面

pub mod backend;
pub mod config;
pub mod core;
pub mod observability;
pub mod store;
pub mod ui;
