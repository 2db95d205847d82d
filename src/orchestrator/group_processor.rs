//! 单个条目的重试循环 - 编排层
//!
//! 反复调用 `ItemJob::attempt_once`，直到成功或次数耗尽。
//! 失败后等待 基础延迟 + 随机抖动 再重试。

use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, warn};

use crate::config::Config;
use crate::models::Item;
use crate::utils::sleep_jittered;
use crate::workflow::{AttemptCtx, AttemptOutcome, ItemJob};

/// 重试与节奏参数
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 每个条目的最大尝试次数（至少 1）
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub retry_jitter: Duration,
    /// 每个条目结束后的间隔
    pub item_gap: Duration,
    pub item_gap_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay,
            retry_jitter: config.retry_jitter,
            item_gap: config.item_gap,
            item_gap_jitter: config.item_gap_jitter,
        }
    }

    /// 不等待，只限制次数
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
            retry_delay: Duration::ZERO,
            retry_jitter: Duration::ZERO,
            item_gap: Duration::ZERO,
            item_gap_jitter: Duration::ZERO,
        }
    }
}

/// 条目的最终结果
#[derive(Debug)]
pub enum ItemResult {
    Completed { attempts: u32, local_path: PathBuf },
    Exhausted { attempts: u32, last_error: String },
}

/// 带重试地处理一个条目
pub async fn run_with_retries(job: &ItemJob, item: &Item, policy: &RetryPolicy) -> ItemResult {
    let mut last_error = String::new();

    for attempt in 1..=policy.max_retries {
        let ctx = AttemptCtx::new(attempt, policy.max_retries);

        match job.attempt_once(item, &ctx).await {
            AttemptOutcome::Succeeded { local_path } => {
                return ItemResult::Completed {
                    attempts: attempt,
                    local_path,
                };
            }
            AttemptOutcome::Failed { at, error } => {
                last_error = format!("{}: {}", at, error);
                if ctx.is_last() {
                    break;
                }
                warn!("{} 🔁 Retrying {}", item, ctx);
                sleep_jittered(policy.retry_delay, policy.retry_jitter).await;
            }
        }
    }

    error!(
        "{} ❌ Gave up after {} retries: {}",
        item, policy.max_retries, last_error
    );
    ItemResult::Exhausted {
        attempts: policy.max_retries,
        last_error,
    }
}
