//! Parley - 单用户对话客户端
//!
//! 入口：加载配置、初始化日志、创建客户端运行时与 TUI，并运行主循环。
//! 用法：`parley [config.toml]`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use parley::config::{load_config, AppConfig};
use parley::core::{create_client, ShutdownManager, ShutdownReason};
use parley::observability;
use parley::ui::run_app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let (cfg, load_error) = match load_config(config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    observability::init(&cfg.logging.file);
    if let Some(e) = load_error {
        tracing::warn!("Config load failed ({}), using defaults", e);
    }

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    // 运行时：恢复会话、启动健康轮询与命令循环
    let mut client = create_client(&cfg, shutdown.token()).await;

    let result = run_app(
        client.state_rx.clone(),
        &mut client.confirm_rx,
        client.cmd_tx.clone(),
        cfg.ui.welcome.clone(),
        shutdown.token(),
    )
    .await
    .context("App run failed");

    match &result {
        Ok(()) => shutdown.shutdown(ShutdownReason::UserInitiated),
        Err(e) => shutdown.shutdown(ShutdownReason::FatalError(e.to_string())),
    }
    client.join().await;

    result
}
