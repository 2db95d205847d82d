use crate::error::{AppError, AppResult};
use crate::models::item::{Group, Item};
use std::path::Path;
use tokio::fs;

/// 扫描源根目录下的所有分组（子目录），按名称排序
pub async fn discover_groups(upload_base: &Path, extension: &str) -> AppResult<Vec<Group>> {
    if !upload_base.is_dir() {
        return Err(AppError::io(
            format!("源目录不存在: {}", upload_base.display()),
            std::io::Error::from(std::io::ErrorKind::NotFound),
        ));
    }

    let mut dirs = Vec::new();
    let mut entries = fs::read_dir(upload_base)
        .await
        .map_err(|e| AppError::io(format!("无法读取文件夹: {}", upload_base.display()), e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::io(format!("无法读取文件夹: {}", upload_base.display()), e))?
    {
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();

    let mut groups = Vec::with_capacity(dirs.len());
    for dir in dirs {
        groups.push(load_group(&dir, extension).await?);
    }

    Ok(groups)
}

/// 加载单个分组：只保留扩展名匹配的普通文件，按文件名排序
pub async fn load_group(dir: &Path, extension: &str) -> AppResult<Group> {
    let group_id = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let mut items = Vec::new();
    let mut entries = fs::read_dir(dir)
        .await
        .map_err(|e| AppError::io(format!("无法读取文件夹: {}", dir.display()), e))?;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AppError::io(format!("无法读取文件夹: {}", dir.display()), e))?
    {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().and_then(|s| s.to_str()) != Some(extension) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        items.push(Item::new(name, group_id.clone(), path));
    }
    items.sort_by(|a, b| a.name.cmp(&b.name));

    tracing::debug!("分组 {}: {} 个文件", group_id, items.len());

    Ok(Group {
        id: group_id,
        dir: dir.to_path_buf(),
        items,
    })
}
