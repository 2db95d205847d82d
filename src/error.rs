use std::path::PathBuf;

use thiserror::Error;

/// 应用程序错误类型
///
/// 致命错误：`Connectivity` / `CheckpointCorruption` / `CheckpointPersist` / `Config`
/// 可重试错误：`Transfer` / `UnconfirmedResult` / `Interaction` / `Bridge`
#[derive(Debug, Error)]
pub enum AppError {
    /// 没有可用的设备
    #[error("设备连接失败: {0}")]
    Connectivity(String),

    /// push / pull 传输失败（adb 返回非零或进程无法启动）
    #[error("传输失败 ({op} {path}): {reason}")]
    Transfer {
        op: TransferOp,
        path: String,
        reason: String,
    },

    /// pull 在传输层成功，但本地文件不存在
    #[error("拉取结果未确认: 本地文件不存在 {}", path.display())]
    UnconfirmedResult { path: PathBuf },

    /// 输入注入调用本身出错
    #[error("输入注入失败 (步骤: {step}): {reason}")]
    Interaction { step: String, reason: String },

    /// 其他设备命令（shell、devices 等）失败
    #[error("设备命令失败 ({command}): {reason}")]
    Bridge { command: String, reason: String },

    /// 已有的进度文件无法读取或解析
    #[error("进度文件损坏 ({}): {reason}", path.display())]
    CheckpointCorruption { path: PathBuf, reason: String },

    /// 进度文件写入失败
    #[error("进度文件写入失败 ({}): {source}", path.display())]
    CheckpointPersist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 交互脚本文件无法加载
    #[error("交互脚本加载失败 ({}): {reason}", path.display())]
    Script { path: PathBuf, reason: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 其他文件操作错误
    #[error("文件错误 ({context}): {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// 传输方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    Push,
    Pull,
}

impl std::fmt::Display for TransferOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransferOp::Push => write!(f, "push"),
            TransferOp::Pull => write!(f, "pull"),
        }
    }
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 环境变量不存在
    #[error("环境变量 {var_name} 不存在")]
    EnvVarNotFound { var_name: String },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件操作错误
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Io {
            context: context.into(),
            source,
        }
    }

    /// 创建传输错误
    pub fn transfer(op: TransferOp, path: impl Into<String>, reason: impl Into<String>) -> Self {
        AppError::Transfer {
            op,
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// 是否为致命错误（应中止整个运行）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Connectivity(_)
                | AppError::CheckpointCorruption { .. }
                | AppError::CheckpointPersist { .. }
                | AppError::Config(_)
        )
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
