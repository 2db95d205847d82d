//! 传输网关 - 业务能力层
//!
//! 在设备桥的 push / pull 之上加两件事：
//! 1. 由文件名推导设备路径
//! 2. pull 之后以本地文件是否存在作为成功依据

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::infrastructure::{shell_quote, DeviceBridge};
use crate::models::RemotePaths;

/// 传输网关
///
/// 不重试；重试由编排层负责
pub struct TransferGateway {
    bridge: Arc<dyn DeviceBridge>,
    upload_root: String,
    download_root: String,
}

impl TransferGateway {
    pub fn new(
        bridge: Arc<dyn DeviceBridge>,
        upload_root: impl Into<String>,
        download_root: impl Into<String>,
    ) -> Self {
        Self {
            bridge,
            upload_root: upload_root.into(),
            download_root: download_root.into(),
        }
    }

    pub fn remote_paths(&self, name: &str) -> RemotePaths {
        RemotePaths::derive(&self.upload_root, &self.download_root, name)
    }

    /// 上传本地文件
    pub async fn push(&self, local_path: &Path, remote_upload_path: &str) -> AppResult<()> {
        debug!("push {} -> {}", local_path.display(), remote_upload_path);
        self.bridge.push(local_path, remote_upload_path).await
    }

    /// 拉取结果，只有传输成功且本地文件存在才返回 true
    pub async fn pull(&self, remote_download_path: &str, local_dest: &Path) -> bool {
        match self.pull_confirmed(remote_download_path, local_dest).await {
            Ok(()) => true,
            Err(e) => {
                warn!("⚠️ {}", e);
                false
            }
        }
    }

    /// 与 `pull` 相同，但保留失败原因
    pub async fn pull_confirmed(
        &self,
        remote_download_path: &str,
        local_dest: &Path,
    ) -> AppResult<()> {
        if let Some(parent) = local_dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                AppError::io(format!("无法创建目录: {}", parent.display()), e)
            })?;
        }

        // 旧结果（上次中断或不完整的 pull）不能算作本次成功
        match tokio::fs::remove_file(local_dest).await {
            Ok(()) => debug!("已删除旧的本地结果: {}", local_dest.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(AppError::io(
                    format!("无法删除旧的本地结果: {}", local_dest.display()),
                    e,
                ))
            }
        }

        self.bridge.pull(remote_download_path, local_dest).await?;

        if tokio::fs::try_exists(local_dest).await.unwrap_or(false) {
            Ok(())
        } else {
            Err(AppError::UnconfirmedResult {
                path: local_dest.to_path_buf(),
            })
        }
    }

    /// 尽力删除设备上的文件，失败只记日志
    pub async fn cleanup_remote(&self, paths: &[&str]) {
        for path in paths {
            match self.bridge.shell(&format!("rm -f {}", shell_quote(path))).await {
                Ok(_) => debug!("🗑️ 已删除设备文件: {}", path),
                Err(e) => warn!("⚠️ 删除设备文件失败 {}: {}", path, e),
            }
        }
    }

    /// 确保设备上的上传和下载目录存在
    pub async fn ensure_remote_dirs(&self) -> AppResult<()> {
        for dir in [&self.upload_root, &self.download_root] {
            crate::infrastructure::ensure_remote_dir(self.bridge.as_ref(), dir).await?;
        }
        info!("📁 设备目录就绪");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InputAction;
    use crate::testing::FakeDevice;

    const UP: &str = "/sdcard/create_dataset";
    const DOWN: &str = "/sdcard/Download";

    fn setup(device: FakeDevice) -> (Arc<FakeDevice>, TransferGateway, tempfile::TempDir) {
        let device = Arc::new(device);
        let gateway = TransferGateway::new(device.clone(), UP, DOWN);
        (device, gateway, tempfile::tempdir().unwrap())
    }

    #[tokio::test]
    async fn test_pull_creates_parent_and_confirms_file() {
        let (device, gateway, dir) = setup(FakeDevice::new(UP, DOWN));
        let src = dir.path().join("img001.JPG");
        std::fs::write(&src, b"raw").unwrap();

        let paths = gateway.remote_paths("img001.JPG");
        gateway.push(&src, &paths.upload).await.unwrap();
        device
            .inject_input(&InputAction::Tap { x: 1, y: 1 })
            .await
            .unwrap();

        let dest = dir.path().join("out").join("CameraA").join("img001.JPG");
        assert!(gateway.pull(&paths.download, &dest).await);
        assert_eq!(std::fs::read(&dest).unwrap(), b"compressed:raw");
    }

    #[tokio::test]
    async fn test_transport_success_without_file_is_unconfirmed() {
        let (_device, gateway, dir) =
            setup(FakeDevice::new(UP, DOWN).unconfirmed_pull("img001.JPG"));
        let dest = dir.path().join("CameraA").join("img001.JPG");
        let paths = gateway.remote_paths("img001.JPG");

        let err = gateway
            .pull_confirmed(&paths.download, &dest)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnconfirmedResult { .. }));
        assert!(!gateway.pull(&paths.download, &dest).await);
    }

    #[tokio::test]
    async fn test_stale_local_result_is_not_confirmation() {
        let (_device, gateway, dir) =
            setup(FakeDevice::new(UP, DOWN).unconfirmed_pull("img001.JPG"));
        let dest = dir.path().join("CameraA").join("img001.JPG");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"left over from an earlier run").unwrap();
        let paths = gateway.remote_paths("img001.JPG");

        let err = gateway
            .pull_confirmed(&paths.download, &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnconfirmedResult { .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fresh_pull_replaces_stale_local_result() {
        let (device, gateway, dir) = setup(FakeDevice::new(UP, DOWN));
        let src = dir.path().join("img001.JPG");
        std::fs::write(&src, b"raw").unwrap();
        let paths = gateway.remote_paths("img001.JPG");
        gateway.push(&src, &paths.upload).await.unwrap();
        device
            .inject_input(&InputAction::Tap { x: 1, y: 1 })
            .await
            .unwrap();

        let dest = dir.path().join("out").join("img001.JPG");
        std::fs::create_dir_all(dest.parent().unwrap()).unwrap();
        std::fs::write(&dest, b"stale").unwrap();

        assert!(gateway.pull(&paths.download, &dest).await);
        assert_eq!(std::fs::read(&dest).unwrap(), b"compressed:raw");
    }

    #[tokio::test]
    async fn test_cleanup_handles_quote_in_name() {
        let (device, gateway, dir) = setup(FakeDevice::new(UP, DOWN));
        let src = dir.path().join("it's.JPG");
        std::fs::write(&src, b"raw").unwrap();
        let paths = gateway.remote_paths("it's.JPG");
        gateway.push(&src, &paths.upload).await.unwrap();

        gateway.cleanup_remote(&[paths.upload.as_str()]).await;

        assert_eq!(
            device.shell_commands(),
            vec![format!(r"rm -f '{}/it'\''s.JPG'", UP)]
        );
        assert!(device.remote_files().is_empty());
    }

    #[tokio::test]
    async fn test_push_failure_is_transfer_error() {
        let (_device, gateway, dir) = setup(FakeDevice::new(UP, DOWN).failing_push("a.JPG"));
        let src = dir.path().join("a.JPG");
        std::fs::write(&src, b"raw").unwrap();

        let err = gateway.push(&src, &format!("{}/a.JPG", UP)).await.unwrap_err();
        assert!(matches!(err, AppError::Transfer { .. }));
    }

    #[tokio::test]
    async fn test_cleanup_failure_is_swallowed() {
        let (device, gateway, _dir) = setup(FakeDevice::new(UP, DOWN).failing_shell());
        gateway
            .cleanup_remote(&["/sdcard/create_dataset/a.JPG", "/sdcard/Download/a.JPG"])
            .await;
        assert_eq!(device.shell_commands().len(), 2);
    }

    #[tokio::test]
    async fn test_ensure_remote_dirs() {
        let (device, gateway, _dir) = setup(FakeDevice::new(UP, DOWN));
        gateway.ensure_remote_dirs().await.unwrap();
        assert_eq!(
            device.shell_commands(),
            vec![
                "mkdir -p '/sdcard/create_dataset'".to_string(),
                "mkdir -p '/sdcard/Download'".to_string()
            ]
        );
    }
}
