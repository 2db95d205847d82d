//! 失败记录服务 - 业务能力层
//!
//! 只负责把重试耗尽的文件追加写入失败记录文件，不关心流程

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::Item;

/// 失败记录服务
///
/// 失败条目不写入进度文件，下次运行会重新尝试；
/// 这里只留一份人工可查的记录
pub struct FailureWriter {
    path: PathBuf,
}

impl FailureWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// 追加一条失败记录
    pub fn write(&self, item: &Item, attempts: u32, last_error: &str) -> AppResult<()> {
        debug!("写入失败记录: {} ({} 次尝试)", item, attempts);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AppError::io(format!("无法打开失败记录: {}", self.path.display()), e))?;

        let line = format!(
            "{} | 分组 {} | 文件 {} | 尝试 {} 次 | {}\n",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            item.group_id,
            item.name,
            attempts,
            last_error
        );

        file.write_all(line.as_bytes())
            .map_err(|e| AppError::io(format!("无法写入失败记录: {}", self.path.display()), e))?;

        Ok(())
    }
}
