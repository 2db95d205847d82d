//! 单个条目的处理流程 - 流程层
//!
//! 一次尝试 = 一次状态机运行：
//!
//! ```text
//! Pending → Pushing → Interacting → Pulling → Succeeded
//!              │                        │
//!              └────────→ Failed ←──────┘
//! ```
//!
//! - push 失败直接结束（设备上什么都没创建）
//! - 交互之后无条件 pull，pull 是唯一能观察到的成功信号
//! - 成功：删除设备上的上传和下载文件
//! - pull 失败：只删除上传文件
//!
//! 本模块不循环、不等待重试，重试由编排层负责

use std::fmt::Display;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::models::Item;
use crate::services::{InteractionDriver, TransferGateway};
use crate::utils::sleep_jittered;
use crate::workflow::AttemptCtx;

/// 状态机状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Pushing,
    Interacting,
    Pulling,
    Succeeded,
    Failed,
}

impl Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobState::Pending => "Pending",
            JobState::Pushing => "Pushing",
            JobState::Interacting => "Interacting",
            JobState::Pulling => "Pulling",
            JobState::Succeeded => "Succeeded",
            JobState::Failed => "Failed",
        };
        write!(f, "{}", name)
    }
}

/// 一次尝试的结果
#[derive(Debug)]
pub enum AttemptOutcome {
    /// 结果文件已确认存在
    Succeeded { local_path: PathBuf },
    /// 在 `at` 状态失败
    Failed { at: JobState, error: AppError },
}

impl AttemptOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, AttemptOutcome::Succeeded { .. })
    }
}

/// 单个条目的处理流程
///
/// - 组合传输网关和交互驱动
/// - 跨条目无状态，不持有任何持久化数据
/// - 所有错误在这里转为 `AttemptOutcome::Failed`，不向上抛出
pub struct ItemJob {
    gateway: TransferGateway,
    driver: Arc<dyn InteractionDriver>,
    download_base: PathBuf,
    push_settle: Duration,
    push_settle_jitter: Duration,
}

impl ItemJob {
    pub fn new(
        gateway: TransferGateway,
        driver: Arc<dyn InteractionDriver>,
        download_base: impl Into<PathBuf>,
    ) -> Self {
        Self {
            gateway,
            driver,
            download_base: download_base.into(),
            push_settle: Duration::ZERO,
            push_settle_jitter: Duration::ZERO,
        }
    }

    /// push 之后、开始交互之前的等待
    pub fn with_push_settle(mut self, base: Duration, jitter: Duration) -> Self {
        self.push_settle = base;
        self.push_settle_jitter = jitter;
        self
    }

    /// 执行一次完整尝试
    pub async fn attempt_once(&self, item: &Item, ctx: &AttemptCtx) -> AttemptOutcome {
        let paths = self.gateway.remote_paths(&item.name);
        let local_dest = item.local_result_path(&self.download_base);
        let mut state = JobState::Pending;

        info!("{} 📤 开始处理 {}", item, ctx);

        // ========== Pushing ==========
        state = transition(item, state, JobState::Pushing);
        if let Err(error) = self.gateway.push(&item.local_source_path, &paths.upload).await {
            warn!("{} ⚠️ 上传失败 {}: {}", item, ctx, error);
            return self.fail(item, state, error);
        }
        sleep_jittered(self.push_settle, self.push_settle_jitter).await;

        // ========== Interacting ==========
        state = transition(item, state, JobState::Interacting);
        let interaction_error = match self.driver.run(item).await {
            Ok(()) => None,
            Err(error) => {
                warn!("{} ⚠️ 交互中断，仍尝试拉取: {}", item, error);
                Some(error)
            }
        };

        // ========== Pulling ==========
        state = transition(item, state, JobState::Pulling);
        info!("{} 📥 拉取压缩结果", item);
        match self.gateway.pull_confirmed(&paths.download, &local_dest).await {
            Ok(()) => {
                info!("{} ✅ 下载成功: {}", item, local_dest.display());
                self.gateway
                    .cleanup_remote(&[paths.upload.as_str(), paths.download.as_str()])
                    .await;
                transition(item, state, JobState::Succeeded);
                AttemptOutcome::Succeeded {
                    local_path: local_dest,
                }
            }
            Err(pull_error) => {
                warn!("{} ⚠️ 拉取失败 {}: {}", item, ctx, pull_error);
                self.gateway.cleanup_remote(&[paths.upload.as_str()]).await;
                self.fail(item, state, interaction_error.unwrap_or(pull_error))
            }
        }
    }

    fn fail(&self, item: &Item, at: JobState, error: AppError) -> AttemptOutcome {
        transition(item, at, JobState::Failed);
        AttemptOutcome::Failed { at, error }
    }
}

fn transition(item: &Item, from: JobState, to: JobState) -> JobState {
    debug!("{} {} → {}", item, from, to);
    to
}
