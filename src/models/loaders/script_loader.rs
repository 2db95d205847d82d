use crate::error::{AppError, AppResult};
use crate::models::script::InteractionScript;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载交互脚本
///
/// ```toml
/// [[steps]]
/// label = "点击加号按钮"
/// action = { type = "tap", x = 95, y = 2253 }
/// delay_ms = 2000
/// jitter_ms = 1500
/// ```
pub async fn load_script_file(path: &Path) -> AppResult<InteractionScript> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::io(format!("无法读取脚本文件: {}", path.display()), e))?;

    let script: InteractionScript = toml::from_str(&content).map_err(|e| AppError::Script {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    if script.is_empty() {
        return Err(AppError::Script {
            path: path.to_path_buf(),
            reason: "脚本没有任何步骤".to_string(),
        });
    }

    tracing::info!("已加载交互脚本: {} 个步骤", script.len());
    Ok(script)
}
