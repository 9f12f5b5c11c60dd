//! 客户端运行时：装配后端、持久化、展示层、编排器与健康监测
//!
//! 建立 cmd / state / confirm 三通道，后台命令循环消费用户命令（Submit/Reset/Quit）。
//! Submit 与 Reset 各自在独立任务中执行：重叠的发送由会话许可拒绝，清空随时可执行；命令循环本身从不阻塞。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backend::{ChatBackend, HttpBackend, MockBackend};
use crate::config::AppConfig;
use crate::core::{HealthMonitor, RequestOrchestrator, UiState};
use crate::store::FileStore;
use crate::ui::{AlwaysConfirm, Confirm, ConfirmRequest, TuiConfirm, WatchPresenter};

/// 从 UI 发往运行时的用户命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 提交用户输入
    Submit(String),
    /// 清空对话（需确认）
    Reset,
    /// 退出应用
    Quit,
}

/// 运行时句柄：UI 持有通道两端，退出时等待后台任务结束
pub struct ClientHandle {
    pub cmd_tx: mpsc::UnboundedSender<Command>,
    pub state_rx: watch::Receiver<UiState>,
    /// 待 TUI 回答的确认请求
    pub confirm_rx: mpsc::UnboundedReceiver<ConfirmRequest>,
    pub orchestrator: Arc<RequestOrchestrator>,
    pub monitor: Arc<HealthMonitor>,
    tasks: Vec<JoinHandle<()>>,
}

impl ClientHandle {
    /// 等待健康轮询与命令循环退出（需先取消 shutdown token 或发送 Quit）
    pub async fn join(self) {
        for task in self.tasks {
            let _ = task.await;
        }
    }
}

/// 根据配置选择后端（HTTP / Mock）
pub(crate) fn create_backend_from_config(cfg: &AppConfig) -> Arc<dyn ChatBackend> {
    match cfg.backend.provider.to_lowercase().as_str() {
        "mock" => {
            tracing::warn!("Using mock backend, no requests leave this process");
            Arc::new(MockBackend::new())
        }
        other => {
            if other != "http" {
                tracing::warn!(provider = %other, "Unknown backend provider, falling back to http");
            }
            tracing::info!(base_url = %cfg.backend.base_url, "Using HTTP backend");
            Arc::new(HttpBackend::new(
                &cfg.backend.base_url,
                cfg.backend.timeouts.request,
                cfg.backend.timeouts.health,
            ))
        }
    }
}

/// 创建客户端运行时：恢复会话、启动健康轮询与命令循环
pub async fn create_client(cfg: &AppConfig, shutdown: CancellationToken) -> ClientHandle {
    let backend = create_backend_from_config(cfg);
    let store = Arc::new(FileStore::new(&cfg.storage.path, cfg.storage.key.clone()));
    let (presenter, state_rx) = WatchPresenter::new();
    let presenter = Arc::new(presenter);

    let (tui_confirm, confirm_rx) = TuiConfirm::new();
    let confirm: Arc<dyn Confirm> = if cfg.ui.confirm_reset {
        Arc::new(tui_confirm)
    } else {
        Arc::new(AlwaysConfirm)
    };

    let orchestrator = Arc::new(RequestOrchestrator::new(
        backend.clone(),
        store,
        presenter.clone(),
        confirm,
    ));

    let monitor = Arc::new(HealthMonitor::new(
        backend,
        presenter,
        Duration::from_secs(cfg.health.interval_secs.max(1)),
    ));
    let monitor_task = monitor.clone().spawn(shutdown.clone());

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<Command>();
    let loop_task = tokio::spawn(command_loop(orchestrator.clone(), cmd_rx, shutdown));

    ClientHandle {
        cmd_tx,
        state_rx,
        confirm_rx,
        orchestrator,
        monitor,
        tasks: vec![monitor_task, loop_task],
    }
}

async fn command_loop(
    orchestrator: Arc<RequestOrchestrator>,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
) {
    // 先回放历史，期间发送按钮保持关闭
    orchestrator.restore_transcript().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(Command::Submit(input)) => {
                        let orchestrator = orchestrator.clone();
                        tokio::spawn(async move {
                            orchestrator.send_message(&input).await;
                        });
                    }
                    Some(Command::Reset) => {
                        let orchestrator = orchestrator.clone();
                        tokio::spawn(async move {
                            orchestrator.reset_conversation().await;
                        });
                    }
                    Some(Command::Quit) => {
                        shutdown.cancel();
                        break;
                    }
                    None => break,  // cmd_tx 已关闭，退出循环
                }
            }
        }
    }
}
