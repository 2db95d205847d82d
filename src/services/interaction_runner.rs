//! 交互脚本执行 - 业务能力层
//!
//! 按顺序注入输入并等待。无法读取设备界面状态，所以这里是纯计时的宏；
//! 界面没有响应不会在这里报错，只会体现为之后 pull 失败。

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::AppResult;
use crate::infrastructure::DeviceBridge;
use crate::models::{InteractionScript, Item};
use crate::utils::sleep_jittered;

/// 驱动设备应用产出结果
///
/// 将来换成能读取界面状态的实现时，重试和进度逻辑不需要改动
#[async_trait]
pub trait InteractionDriver: Send + Sync {
    async fn run(&self, item: &Item) -> AppResult<()>;
}

/// 基于固定脚本的驱动
pub struct ScriptRunner {
    bridge: Arc<dyn DeviceBridge>,
    script: InteractionScript,
}

impl ScriptRunner {
    pub fn new(bridge: Arc<dyn DeviceBridge>, script: InteractionScript) -> Self {
        Self { bridge, script }
    }
}

#[async_trait]
impl InteractionDriver for ScriptRunner {
    /// 任一步注入失败即返回 `Interaction` 错误，后续步骤不再执行
    async fn run(&self, item: &Item) -> AppResult<()> {
        let total = self.script.len();
        for (index, step) in self.script.steps.iter().enumerate() {
            info!("{} 👆 {} ({}/{})", item, step.label, index + 1, total);
            debug!("{} 动作: {:?}", item, step.action);

            self.bridge.inject_input(&step.action).await?;
            sleep_jittered(step.delay(), step.jitter()).await;
        }
        Ok(())
    }
}
