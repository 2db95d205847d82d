use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppResult, ConfigError};

/// 程序配置
///
/// 启动时构造一次，之后显式传递给各层
#[derive(Clone, Debug)]
pub struct Config {
    /// 本地源图片根目录（每个子目录是一个分组）
    pub upload_base: PathBuf,
    /// 本地结果根目录（按分组镜像）
    pub download_base: PathBuf,
    /// 手机上传暂存目录
    pub phone_upload_dir: String,
    /// 手机下载目录（应用保存结果的位置）
    pub phone_download_dir: String,
    /// 进度文件路径
    pub progress_file: PathBuf,
    /// 每个条目的最大尝试次数
    pub max_retries: u32,
    /// 图片扩展名过滤（区分大小写）
    pub image_extension: String,
    /// 失败重试前的等待
    pub retry_delay: Duration,
    pub retry_jitter: Duration,
    /// 每个条目处理完之后的间隔
    pub item_gap: Duration,
    pub item_gap_jitter: Duration,
    /// push 之后、开始点击之前的等待
    pub push_settle: Duration,
    pub push_settle_jitter: Duration,
    /// adb 可执行文件
    pub adb_path: String,
    /// 指定设备序列号（adb -s）
    pub adb_serial: Option<String>,
    /// 启动时打开的 Activity，例如 com.discord/.main.MainActivity
    pub launch_activity: Option<String>,
    /// 自定义交互脚本（TOML）
    pub interaction_script: Option<PathBuf>,
    /// 永久失败条目记录文件
    pub failure_log_file: PathBuf,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_base: PathBuf::from("upload"),
            download_base: PathBuf::from("download"),
            phone_upload_dir: "/sdcard/create_dataset".to_string(),
            phone_download_dir: "/sdcard/Download".to_string(),
            progress_file: PathBuf::from("test_progress_discord.json"),
            max_retries: 100,
            image_extension: "JPG".to_string(),
            retry_delay: Duration::from_millis(5000),
            retry_jitter: Duration::from_millis(3000),
            item_gap: Duration::from_millis(1000),
            item_gap_jitter: Duration::from_millis(2000),
            push_settle: Duration::from_millis(1000),
            push_settle_jitter: Duration::from_millis(500),
            adb_path: "adb".to_string(),
            adb_serial: None,
            launch_activity: None,
            interaction_script: None,
            failure_log_file: PathBuf::from("failed_items.txt"),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 从环境变量（以及工作目录下的 .env）加载配置
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 从任意键值来源加载配置
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default = Self::default();
        let required = |key: &str| {
            lookup(key).filter(|v| !v.trim().is_empty()).ok_or_else(|| {
                ConfigError::EnvVarNotFound {
                    var_name: key.to_string(),
                }
            })
        };
        let millis = |key: &str, fallback: Duration| -> AppResult<Duration> {
            Ok(parse_var::<u64>(&lookup, key)?
                .map(Duration::from_millis)
                .unwrap_or(fallback))
        };

        let max_retries = parse_var::<u32>(&lookup, "MAX_RETRIES")?.unwrap_or(default.max_retries);
        if max_retries == 0 {
            return Err(ConfigError::EnvVarParseFailed {
                var_name: "MAX_RETRIES".to_string(),
                value: "0".to_string(),
                expected_type: "正整数".to_string(),
            }
            .into());
        }

        Ok(Self {
            upload_base: PathBuf::from(required("UPLOAD_BASE")?),
            download_base: PathBuf::from(required("DOWNLOAD_BASE")?),
            phone_upload_dir: lookup("PHONE_UPLOAD_DIR").unwrap_or(default.phone_upload_dir),
            phone_download_dir: lookup("PHONE_DOWNLOAD_DIR")
                .unwrap_or(default.phone_download_dir),
            progress_file: lookup("PROGRESS_FILE")
                .map(PathBuf::from)
                .unwrap_or(default.progress_file),
            max_retries,
            image_extension: lookup("IMAGE_EXTENSION").unwrap_or(default.image_extension),
            retry_delay: millis("RETRY_DELAY_MS", default.retry_delay)?,
            retry_jitter: millis("RETRY_JITTER_MS", default.retry_jitter)?,
            item_gap: millis("ITEM_GAP_MS", default.item_gap)?,
            item_gap_jitter: millis("ITEM_GAP_JITTER_MS", default.item_gap_jitter)?,
            push_settle: millis("PUSH_SETTLE_MS", default.push_settle)?,
            push_settle_jitter: millis("PUSH_SETTLE_JITTER_MS", default.push_settle_jitter)?,
            adb_path: lookup("ADB_PATH").unwrap_or(default.adb_path),
            adb_serial: lookup("ADB_SERIAL").filter(|v| !v.is_empty()),
            launch_activity: lookup("LAUNCH_ACTIVITY").filter(|v| !v.is_empty()),
            interaction_script: lookup("INTERACTION_SCRIPT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            failure_log_file: lookup("FAILURE_LOG_FILE")
                .map(PathBuf::from)
                .unwrap_or(default.failure_log_file),
            verbose_logging: parse_var(&lookup, "VERBOSE_LOGGING")?
                .unwrap_or(default.verbose_logging),
        })
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: key.to_string(),
                value: raw,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
    }
}
