//! 带随机抖动的等待
//!
//! 设备 UI 有自己的动画节奏，固定间隔容易和它同步踩点

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// base + [0, jitter] 之间的随机时长
pub fn jittered(base: Duration, jitter: Duration) -> Duration {
    let jitter_ms = jitter.as_millis() as u64;
    if jitter_ms == 0 {
        return base;
    }
    base + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
}

/// 阻塞当前流程等待 base + 随机抖动
pub async fn sleep_jittered(base: Duration, jitter: Duration) {
    let total = jittered(base, jitter);
    if !total.is_zero() {
        sleep(total).await;
    }
}
