//! 进度存储 - 业务能力层
//!
//! 记录每个分组中已经端到端处理完成的文件名。
//! 文件不存在时视为空进度；文件存在但无法解析时是致命错误。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// 进度：group_id -> 已完成文件名（按完成顺序）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint {
    groups: BTreeMap<String, Vec<String>>,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记完成；已存在时不做任何修改并返回 false
    pub fn mark_completed(&mut self, group_id: &str, name: &str) -> bool {
        let names = self.groups.entry(group_id.to_string()).or_default();
        if names.iter().any(|n| n == name) {
            return false;
        }
        names.push(name.to_string());
        true
    }

    pub fn is_completed(&self, group_id: &str, name: &str) -> bool {
        self.groups
            .get(group_id)
            .is_some_and(|names| names.iter().any(|n| n == name))
    }

    /// 某个分组已完成的文件名
    pub fn completed_in(&self, group_id: &str) -> &[String] {
        self.groups.get(group_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_completed(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_completed() == 0
    }
}

/// 进度存储
///
/// 编排层持有唯一实例，也是唯一的写入者
pub trait CheckpointStore: Send + Sync {
    /// 读取进度；不存在时返回空进度
    fn load(&self) -> AppResult<Checkpoint>;

    /// 完整覆盖写入
    fn persist(&self, checkpoint: &Checkpoint) -> AppResult<()>;
}

/// JSON 文件进度存储（先写临时文件，再原子重命名）
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "progress.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn persist_error(&self, source: std::io::Error) -> AppError {
        AppError::CheckpointPersist {
            path: self.path.clone(),
            source,
        }
    }
}

impl CheckpointStore for JsonCheckpointStore {
    fn load(&self) -> AppResult<Checkpoint> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("📄 未找到进度文件，从头开始: {}", self.path.display());
                return Ok(Checkpoint::new());
            }
            Err(e) => {
                return Err(AppError::CheckpointCorruption {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };

        let checkpoint: Checkpoint =
            serde_json::from_str(&content).map_err(|e| AppError::CheckpointCorruption {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        info!(
            "📄 已加载进度: {} 个分组, {} 个已完成",
            checkpoint.groups.len(),
            checkpoint.total_completed()
        );
        Ok(checkpoint)
    }

    fn persist(&self, checkpoint: &Checkpoint) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.persist_error(e))?;
        }

        let temp_path = self.temp_path();
        let file = File::create(&temp_path).map_err(|e| self.persist_error(e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, checkpoint)
            .map_err(|e| self.persist_error(e.into()))?;
        writer.flush().map_err(|e| self.persist_error(e))?;
        writer
            .get_ref()
            .sync_all()
            .map_err(|e| self.persist_error(e))?;
        drop(writer);

        fs::rename(&temp_path, &self.path).map_err(|e| self.persist_error(e))?;

        debug!("进度已保存: {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_then_is_completed() {
        let mut cp = Checkpoint::new();
        assert!(!cp.is_completed("CameraA", "img001.JPG"));
        assert!(cp.mark_completed("CameraA", "img001.JPG"));
        assert!(cp.is_completed("CameraA", "img001.JPG"));
        assert!(!cp.is_completed("CameraB", "img001.JPG"));
    }

    #[test]
    fn test_mark_twice_is_noop() {
        let mut cp = Checkpoint::new();
        cp.mark_completed("CameraA", "img001.JPG");
        let before = cp.clone();
        assert!(!cp.mark_completed("CameraA", "img001.JPG"));
        assert_eq!(cp, before);
        assert_eq!(cp.completed_in("CameraA"), ["img001.JPG".to_string()]);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("progress.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonCheckpointStore::new(dir.path().join("progress.json"));

        let mut cp = Checkpoint::new();
        cp.mark_completed("CameraA", "img002.JPG");
        cp.mark_completed("CameraA", "img001.JPG");
        cp.mark_completed("CameraB", "x.JPG");
        store.persist(&cp).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, cp);
        // 保留完成顺序
        assert_eq!(
            loaded.completed_in("CameraA"),
            ["img002.JPG".to_string(), "img001.JPG".to_string()]
        );
        assert!(!store.temp_path().exists());
    }

    #[test]
    fn test_file_format_is_group_to_name_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, r#"{"CameraA": ["img001.JPG"]}"#).unwrap();

        let store = JsonCheckpointStore::new(&path);
        let cp = store.load().unwrap();
        assert!(cp.is_completed("CameraA", "img001.JPG"));

        store.persist(&cp).unwrap();
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"CameraA": ["img001.JPG"]}));
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonCheckpointStore::new(&path).load().unwrap_err();
        assert!(matches!(err, AppError::CheckpointCorruption { .. }));
        assert!(err.is_fatal());
        // 原文件不被改动
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");
    }
}
