//! 条目与分组模型

use std::fmt::Display;
use std::path::{Path, PathBuf};

/// 一个待处理的源文件
///
/// 发现之后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// 文件名（分组内唯一）
    pub name: String,
    /// 分组ID（所在目录名，例如相机型号）
    pub group_id: String,
    /// 本地源文件路径
    pub local_source_path: PathBuf,
}

impl Item {
    pub fn new(
        name: impl Into<String>,
        group_id: impl Into<String>,
        local_source_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            group_id: group_id.into(),
            local_source_path: local_source_path.into(),
        }
    }

    /// 本地结果路径: download_base/group_id/name
    pub fn local_result_path(&self, download_base: &Path) -> PathBuf {
        download_base.join(&self.group_id).join(&self.name)
    }
}

impl Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}/{}]", self.group_id, self.name)
    }
}

/// 设备端路径，只由文件名决定
///
/// 不同分组中的同名文件会映射到相同的设备路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePaths {
    pub upload: String,
    pub download: String,
}

impl RemotePaths {
    pub fn derive(upload_root: &str, download_root: &str, name: &str) -> Self {
        Self {
            upload: join_remote(upload_root, name),
            download: join_remote(download_root, name),
        }
    }
}

fn join_remote(root: &str, name: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), name)
}

/// 一个分组（源目录下的一个子目录）
#[derive(Debug, Clone)]
pub struct Group {
    pub id: String,
    pub dir: PathBuf,
    /// 按文件名排序
    pub items: Vec<Item>,
}
