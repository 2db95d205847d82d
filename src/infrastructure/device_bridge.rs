//! 设备桥 - 基础设施层
//!
//! 唯一直接调用 adb 的地方，只暴露"传输文件 / 注入输入 / 执行命令"的能力

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult, TransferOp};
use crate::models::script::InputAction;

/// 设备桥
///
/// 职责：
/// - push / pull 文件
/// - 注入点击和按键
/// - 执行设备端 shell 命令
/// - 不认识 Item / Group，不做重试
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// `adb devices` 的原始输出
    async fn list_devices(&self) -> AppResult<String>;

    async fn push(&self, local_path: &Path, remote_path: &str) -> AppResult<()>;

    async fn pull(&self, remote_path: &str, local_path: &Path) -> AppResult<()>;

    async fn inject_input(&self, action: &InputAction) -> AppResult<()>;

    /// 执行设备端 shell 命令，返回 stdout
    async fn shell(&self, command: &str) -> AppResult<String>;
}

/// 子进程输出
#[derive(Debug)]
struct CommandOutput {
    success: bool,
    status: String,
    stdout: String,
    stderr: String,
}

/// 基于 adb 命令行的设备桥
pub struct AdbBridge {
    adb_path: String,
    serial: Option<String>,
}

impl AdbBridge {
    pub fn new(adb_path: impl Into<String>, serial: Option<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
            serial,
        }
    }

    /// 运行一次 adb；只有进程无法启动时返回错误
    async fn run(&self, args: &[&str]) -> std::io::Result<CommandOutput> {
        let mut cmd = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args).kill_on_drop(true);
        debug!("adb {}", args.join(" "));

        let output = cmd.output().await?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        if !stderr.is_empty() {
            warn!("adb: {}", stderr);
        }

        Ok(CommandOutput {
            success: output.status.success(),
            status: output.status.to_string(),
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr,
        })
    }

    async fn transfer(&self, op: TransferOp, from: &str, to: &str) -> AppResult<()> {
        let verb = match op {
            TransferOp::Push => "push",
            TransferOp::Pull => "pull",
        };
        let remote = match op {
            TransferOp::Push => to,
            TransferOp::Pull => from,
        };

        let out = self
            .run(&[verb, from, to])
            .await
            .map_err(|e| AppError::transfer(op, remote, e.to_string()))?;

        if out.success {
            Ok(())
        } else {
            Err(AppError::transfer(op, remote, failure_reason(&out)))
        }
    }
}

fn failure_reason(out: &CommandOutput) -> String {
    if out.stderr.is_empty() {
        out.status.clone()
    } else {
        format!("{} ({})", out.status, out.stderr)
    }
}

#[async_trait]
impl DeviceBridge for AdbBridge {
    async fn list_devices(&self) -> AppResult<String> {
        let out = self
            .run(&["devices"])
            .await
            .map_err(|e| AppError::Connectivity(format!("无法执行 {}: {}", self.adb_path, e)))?;
        Ok(out.stdout)
    }

    async fn push(&self, local_path: &Path, remote_path: &str) -> AppResult<()> {
        let local = local_path.to_string_lossy();
        self.transfer(TransferOp::Push, &local, remote_path).await
    }

    async fn pull(&self, remote_path: &str, local_path: &Path) -> AppResult<()> {
        let local = local_path.to_string_lossy();
        self.transfer(TransferOp::Pull, remote_path, &local).await
    }

    async fn inject_input(&self, action: &InputAction) -> AppResult<()> {
        let args = action.to_input_args();
        let mut full: Vec<&str> = vec!["shell"];
        full.extend(args.iter().map(String::as_str));

        let out = self.run(&full).await.map_err(|e| AppError::Interaction {
            step: args.join(" "),
            reason: e.to_string(),
        })?;

        if out.success {
            Ok(())
        } else {
            Err(AppError::Interaction {
                step: args.join(" "),
                reason: failure_reason(&out),
            })
        }
    }

    async fn shell(&self, command: &str) -> AppResult<String> {
        let out = self
            .run(&["shell", command])
            .await
            .map_err(|e| AppError::Bridge {
                command: command.to_string(),
                reason: e.to_string(),
            })?;

        if out.success {
            Ok(out.stdout)
        } else {
            Err(AppError::Bridge {
                command: command.to_string(),
                reason: failure_reason(&out),
            })
        }
    }
}

/// 判断 `adb devices` 输出中是否有已连接的设备
///
/// 看最后一个非空行；只有表头或状态不是 `device`（unauthorized / offline）都不算
pub fn has_connected_device(devices_output: &str) -> bool {
    let Some(last) = devices_output.lines().rev().find(|l| !l.trim().is_empty()) else {
        return false;
    };
    if last.trim_start().starts_with("List of devices") {
        return false;
    }
    last.split_whitespace().nth(1) == Some("device")
}

/// 检查设备连接，没有设备时返回致命错误
pub async fn check_device(bridge: &dyn DeviceBridge) -> AppResult<()> {
    let output = bridge.list_devices().await?;
    if !has_connected_device(&output) {
        return Err(AppError::Connectivity(
            "❌ No connected Android device found!".to_string(),
        ));
    }
    info!("✅ 设备连接成功");
    Ok(())
}

/// 把路径包成设备 shell 的单引号参数，内部的 `'` 转义为 `'\''`
pub fn shell_quote(path: &str) -> String {
    format!("'{}'", path.replace('\'', "'\\''"))
}

/// 在设备上创建目录（已存在时不报错）
pub async fn ensure_remote_dir(bridge: &dyn DeviceBridge, dir: &str) -> AppResult<()> {
    bridge.shell(&format!("mkdir -p {}", shell_quote(dir))).await?;
    info!("📁 已确保设备目录存在: {}", dir);
    Ok(())
}

/// 启动设备上的应用
pub async fn launch_activity(bridge: &dyn DeviceBridge, activity: &str) -> AppResult<()> {
    bridge.shell(&format!("am start -n {}", activity)).await?;
    info!("📱 已启动: {}", activity);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_device_detection() {
        assert!(has_connected_device(
            "List of devices attached\nR58M123ABC\tdevice"
        ));
        assert!(has_connected_device(
            "List of devices attached\nemulator-5554\tdevice\n\n"
        ));
        assert!(!has_connected_device("List of devices attached"));
        assert!(!has_connected_device("List of devices attached\n"));
        assert!(!has_connected_device(""));
        assert!(!has_connected_device(
            "List of devices attached\nR58M123ABC\tunauthorized"
        ));
        assert!(!has_connected_device(
            "List of devices attached\nR58M123ABC\toffline"
        ));
    }

    #[test]
    fn test_shell_quote_escapes_single_quotes() {
        assert_eq!(shell_quote("/sdcard/Download/a.JPG"), "'/sdcard/Download/a.JPG'");
        assert_eq!(
            shell_quote("/sdcard/Download/it's.JPG"),
            r"'/sdcard/Download/it'\''s.JPG'"
        );
    }

    #[tokio::test]
    async fn test_missing_adb_binary_is_connectivity_failure() {
        let bridge = AdbBridge::new("/definitely/not/a/real/adb-binary", None);
        let err = check_device(&bridge).await.unwrap_err();
        assert!(matches!(err, AppError::Connectivity(_)));
        assert!(err.is_fatal());
    }
}
