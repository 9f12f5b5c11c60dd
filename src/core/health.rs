//! 后端健康监测
//!
//! 启动时立即探测一次，之后按固定间隔（默认 30 秒）轮询 /health；每次结果直接覆盖已发布的状态，
//! 不做防抖。只向展示层发布状态，从不阻塞或限制发送。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::backend::{ChatBackend, HealthReport, TransportError};
use crate::ui::Presenter;

/// 后端健康状态
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// 尚未完成首次探测
    #[default]
    Unknown,
    /// 后端可达且推理服务可用
    Connected,
    /// 后端可达，但声明推理服务不可用
    Degraded,
    /// 后端在传输层不可达
    Offline,
}

impl HealthStatus {
    /// 把一次探测结果映射为状态
    pub fn from_probe(result: &Result<HealthReport, TransportError>) -> Self {
        match result {
            Ok(report) if report.is_model_ready() => HealthStatus::Connected,
            Ok(_) => HealthStatus::Degraded,
            Err(_) => HealthStatus::Offline,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthStatus::Unknown => "连接中…",
            HealthStatus::Connected => "已连接",
            HealthStatus::Degraded => "模型不可用",
            HealthStatus::Offline => "离线",
        }
    }
}

/// 周期性健康探测；状态通过 watch 通道与 Presenter 双路发布
pub struct HealthMonitor {
    backend: Arc<dyn ChatBackend>,
    presenter: Arc<dyn Presenter>,
    interval: Duration,
    status_tx: watch::Sender<HealthStatus>,
}

impl HealthMonitor {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        presenter: Arc<dyn Presenter>,
        interval: Duration,
    ) -> Self {
        let (status_tx, _) = watch::channel(HealthStatus::Unknown);
        Self {
            backend,
            presenter,
            interval,
            status_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.status_tx.subscribe()
    }

    /// 最近一次发布的状态
    pub fn status(&self) -> HealthStatus {
        *self.status_tx.borrow()
    }

    /// 探测一次并发布结果
    pub async fn probe(&self) -> HealthStatus {
        let result = self.backend.health().await;
        let status = HealthStatus::from_probe(&result);
        let model = match &result {
            Ok(report) => report.model.clone(),
            Err(e) => {
                tracing::debug!(kind = e.kind(), "Health probe failed: {}", e);
                None
            }
        };

        let previous = self.status_tx.send_replace(status);
        if previous != status {
            tracing::info!(?previous, ?status, "Backend health changed");
        }
        self.presenter.publish_health(status, model);
        status
    }

    /// 启动后台轮询任务，shutdown 取消时退出
    pub fn spawn(self: Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 首个 tick 立即完成，作为启动时的即时探测
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            _ = self.probe() => {}
                        }
                    }
                }
            }
            tracing::debug!("Health monitor stopped");
        })
    }
}
