//! 批量处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量处理和进度管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：检查设备、创建目录、加载交互脚本、加载进度
//! 2. **分组遍历**：按名称顺序处理每个分组，分组内按文件名顺序处理
//! 3. **跳过已完成**：进度中已有的条目不做任何设备操作
//! 4. **即时保存**：每完成一个条目立即写入进度文件
//! 5. **失败隔离**：单个条目重试耗尽只记录到报告，不中断批处理
//!
//! ## 设计特点
//!
//! - **唯一写入者**：只有 `BatchOrchestrator` 修改进度
//! - **严格串行**：一台设备，同一时间只处理一个条目

use anyhow::{Context, Result};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{self, AdbBridge, DeviceBridge};
use crate::models::{self, Group, InteractionScript, Item};
use crate::orchestrator::group_processor::{run_with_retries, ItemResult, RetryPolicy};
use crate::services::{
    Checkpoint, CheckpointStore, FailureWriter, JsonCheckpointStore, ScriptRunner,
    TransferGateway,
};
use crate::utils::logging::{
    log_group_complete, log_group_start, log_groups_loaded, log_startup, print_final_stats,
};
use crate::utils::sleep_jittered;
use crate::workflow::ItemJob;

/// 启动应用后的等待
const LAUNCH_SETTLE: Duration = Duration::from_secs(5);
const LAUNCH_SETTLE_JITTER: Duration = Duration::from_secs(2);

/// 条目标识
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemKey {
    pub group_id: String,
    pub name: String,
}

impl From<&Item> for ItemKey {
    fn from(item: &Item) -> Self {
        Self {
            group_id: item.group_id.clone(),
            name: item.name.clone(),
        }
    }
}

impl Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.group_id, self.name)
    }
}

/// 单个分组的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GroupStats {
    pub completed: usize,
    /// 进度中已存在，直接跳过
    pub skipped: usize,
    pub failed: usize,
}

/// 本次运行的报告
#[derive(Debug, Default)]
pub struct RunReport {
    pub groups_processed: usize,
    /// 没有匹配文件的分组
    pub empty_groups: Vec<String>,
    pub completed: Vec<ItemKey>,
    pub skipped: usize,
    /// 重试耗尽（未写入进度，下次运行会再试）
    pub failed: Vec<ItemKey>,
}

/// 批量编排器
pub struct BatchOrchestrator {
    job: ItemJob,
    store: Box<dyn CheckpointStore>,
    checkpoint: Checkpoint,
    policy: RetryPolicy,
    failure_writer: Option<FailureWriter>,
}

impl BatchOrchestrator {
    /// 创建编排器并加载进度；进度文件损坏时返回致命错误
    pub fn new(
        job: ItemJob,
        store: Box<dyn CheckpointStore>,
        policy: RetryPolicy,
    ) -> AppResult<Self> {
        let checkpoint = store.load()?;
        Ok(Self::with_checkpoint(job, store, checkpoint, policy))
    }

    /// 使用已加载的进度创建编排器
    pub fn with_checkpoint(
        job: ItemJob,
        store: Box<dyn CheckpointStore>,
        checkpoint: Checkpoint,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            job,
            store,
            checkpoint,
            policy,
            failure_writer: None,
        }
    }

    pub fn with_failure_writer(mut self, writer: FailureWriter) -> Self {
        self.failure_writer = Some(writer);
        self
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    /// 处理所有分组
    ///
    /// 只有进度写入失败会返回错误；单个条目的失败记录在报告中
    pub async fn run_all(&mut self, groups: &[Group]) -> AppResult<RunReport> {
        let mut report = RunReport::default();
        let total_groups = groups.len();

        for (index, group) in groups.iter().enumerate() {
            if group.items.is_empty() {
                warn!("⚠️ No images in {}", group.id);
                report.empty_groups.push(group.id.clone());
                continue;
            }

            log_group_start(index + 1, total_groups, &group.id, group.items.len());
            let stats = self.process_group(group, &mut report).await?;
            report.groups_processed += 1;
            log_group_complete(&group.id, &stats);
        }

        Ok(report)
    }

    async fn process_group(
        &mut self,
        group: &Group,
        report: &mut RunReport,
    ) -> AppResult<GroupStats> {
        let mut stats = GroupStats::default();
        let total = group.items.len();

        for (index, item) in group.items.iter().enumerate() {
            if self.checkpoint.is_completed(&item.group_id, &item.name) {
                stats.skipped += 1;
                report.skipped += 1;
                continue;
            }

            info!("[{} {}/{}] {}", group.id, index + 1, total, item.name);

            match run_with_retries(&self.job, item, &self.policy).await {
                ItemResult::Completed { attempts, .. } => {
                    self.mark_done(item)?;
                    info!("{} ✅ 已完成 ({} 次尝试)", item, attempts);
                    stats.completed += 1;
                    report.completed.push(ItemKey::from(item));
                }
                ItemResult::Exhausted {
                    attempts,
                    last_error,
                } => {
                    if let Some(writer) = &self.failure_writer {
                        if let Err(e) = writer.write(item, attempts, &last_error) {
                            warn!("⚠️ 写入失败记录失败: {}", e);
                        }
                    }
                    stats.failed += 1;
                    report.failed.push(ItemKey::from(item));
                }
            }

            sleep_jittered(self.policy.item_gap, self.policy.item_gap_jitter).await;
        }

        Ok(stats)
    }

    /// 标记完成并立即写入进度
    fn mark_done(&mut self, item: &Item) -> AppResult<()> {
        if self.checkpoint.mark_completed(&item.group_id, &item.name) {
            self.store.persist(&self.checkpoint)?;
        }
        Ok(())
    }
}

/// 应用主结构
pub struct App {
    config: Config,
    orchestrator: BatchOrchestrator,
}

impl App {
    /// 使用 adb 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let bridge: Arc<dyn DeviceBridge> =
            Arc::new(AdbBridge::new(&config.adb_path, config.adb_serial.clone()));
        Self::with_bridge(config, bridge).await
    }

    /// 使用指定的设备桥初始化应用
    pub async fn with_bridge(config: Config, bridge: Arc<dyn DeviceBridge>) -> Result<Self> {
        log_startup(&config);

        tokio::fs::create_dir_all(&config.download_base)
            .await
            .with_context(|| format!("无法创建结果目录: {}", config.download_base.display()))?;

        // 进度文件损坏时在任何设备操作之前中止
        let store = JsonCheckpointStore::new(&config.progress_file);
        let checkpoint = store.load().context("无法加载进度文件")?;

        // 没有设备时直接中止，不处理任何条目
        infrastructure::check_device(bridge.as_ref())
            .await
            .context("设备检查失败")?;

        let gateway = TransferGateway::new(
            bridge.clone(),
            &config.phone_upload_dir,
            &config.phone_download_dir,
        );
        gateway
            .ensure_remote_dirs()
            .await
            .context("无法创建设备目录")?;

        if let Some(activity) = &config.launch_activity {
            infrastructure::launch_activity(bridge.as_ref(), activity)
                .await
                .context("无法启动应用")?;
            sleep_jittered(LAUNCH_SETTLE, LAUNCH_SETTLE_JITTER).await;
        }

        let script = match &config.interaction_script {
            Some(path) => models::load_script_file(path).await?,
            None => InteractionScript::default(),
        };

        let runner = Arc::new(ScriptRunner::new(bridge.clone(), script));
        let job = ItemJob::new(gateway, runner, &config.download_base)
            .with_push_settle(config.push_settle, config.push_settle_jitter);

        let orchestrator = BatchOrchestrator::with_checkpoint(
            job,
            Box::new(store),
            checkpoint,
            RetryPolicy::from_config(&config),
        )
        .with_failure_writer(FailureWriter::new(&config.failure_log_file));

        Ok(Self {
            config,
            orchestrator,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&mut self) -> Result<RunReport> {
        info!("\n📁 正在扫描待处理的分组...");
        let groups =
            models::discover_groups(&self.config.upload_base, &self.config.image_extension)
                .await?;

        if groups.is_empty() {
            warn!("⚠️ No camera model folders found.");
            return Ok(RunReport::default());
        }

        let total_items: usize = groups.iter().map(|g| g.items.len()).sum();
        log_groups_loaded(groups.len(), total_items);

        let report = self.orchestrator.run_all(&groups).await?;

        print_final_stats(&report, &self.config);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::testing::FakeDevice;

    const UP: &str = "/sdcard/create_dataset";
    const DOWN: &str = "/sdcard/Download";

    struct Setup {
        device: Arc<FakeDevice>,
        dir: tempfile::TempDir,
    }

    impl Setup {
        fn new(device: FakeDevice) -> Self {
            Self {
                device: Arc::new(device),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn orchestrator(&self, max_retries: u32) -> AppResult<BatchOrchestrator> {
            let bridge: Arc<dyn DeviceBridge> = self.device.clone();
            let runner = Arc::new(ScriptRunner::new(
                bridge.clone(),
                InteractionScript::default().without_delays(),
            ));
            let job = ItemJob::new(
                TransferGateway::new(bridge, UP, DOWN),
                runner,
                self.dir.path().join("out"),
            );
            let store = Box::new(JsonCheckpointStore::new(self.progress_path()));
            BatchOrchestrator::new(job, store, RetryPolicy::immediate(max_retries))
        }

        fn progress_path(&self) -> std::path::PathBuf {
            self.dir.path().join("progress.json")
        }

        fn group(&self, id: &str, names: &[&str]) -> Group {
            let dir = self.dir.path().join("in").join(id);
            std::fs::create_dir_all(&dir).unwrap();
            let items = names
                .iter()
                .map(|name| {
                    let path = dir.join(name);
                    std::fs::write(&path, name.as_bytes()).unwrap();
                    Item::new(*name, id, path)
                })
                .collect();
            Group {
                id: id.to_string(),
                dir,
                items,
            }
        }
    }

    #[tokio::test]
    async fn test_checkpointed_items_do_no_remote_work() {
        let setup = Setup::new(FakeDevice::new(UP, DOWN));
        let groups = vec![setup.group("CameraA", &["img001.JPG", "img002.JPG"])];

        let mut first = setup.orchestrator(3).unwrap();
        let report = first.run_all(&groups).await.unwrap();
        assert_eq!(report.completed.len(), 2);
        let pushes_after_first = setup.device.push_count();

        let mut second = setup.orchestrator(3).unwrap();
        let report = second.run_all(&groups).await.unwrap();
        assert!(report.completed.is_empty());
        assert_eq!(report.skipped, 2);
        assert_eq!(setup.device.push_count(), pushes_after_first);
    }

    #[tokio::test]
    async fn test_resume_after_partial_progress() {
        let setup = Setup::new(FakeDevice::new(UP, DOWN));
        let groups = vec![setup.group("CameraA", &["img001.JPG", "img002.JPG"])];

        // 上一次运行在 img001 完成之后中断
        let mut cp = Checkpoint::new();
        cp.mark_completed("CameraA", "img001.JPG");
        JsonCheckpointStore::new(setup.progress_path())
            .persist(&cp)
            .unwrap();

        let mut orchestrator = setup.orchestrator(3).unwrap();
        let report = orchestrator.run_all(&groups).await.unwrap();

        assert_eq!(setup.device.pushed_names(), vec!["img002.JPG".to_string()]);
        assert_eq!(report.completed, vec![ItemKey::from(&groups[0].items[1])]);
        assert_eq!(
            orchestrator.checkpoint().completed_in("CameraA"),
            ["img001.JPG".to_string(), "img002.JPG".to_string()]
        );
    }

    #[tokio::test]
    async fn test_failed_item_not_checkpointed_and_batch_continues() {
        let setup = Setup::new(FakeDevice::new(UP, DOWN).unconfirmed_pull("img001.JPG"));
        let groups = vec![setup.group("CameraA", &["img001.JPG", "img002.JPG"])];

        let mut orchestrator = setup.orchestrator(2).unwrap();
        let report = orchestrator.run_all(&groups).await.unwrap();

        assert_eq!(report.failed, vec![ItemKey::from(&groups[0].items[0])]);
        assert_eq!(report.completed, vec![ItemKey::from(&groups[0].items[1])]);
        assert!(!orchestrator.checkpoint().is_completed("CameraA", "img001.JPG"));
        assert!(orchestrator.checkpoint().is_completed("CameraA", "img002.JPG"));
    }

    #[tokio::test]
    async fn test_empty_group_is_reported() {
        let setup = Setup::new(FakeDevice::new(UP, DOWN));
        let groups = vec![setup.group("Empty", &[]), setup.group("CameraA", &["a.JPG"])];

        let mut orchestrator = setup.orchestrator(1).unwrap();
        let report = orchestrator.run_all(&groups).await.unwrap();

        assert_eq!(report.empty_groups, vec!["Empty".to_string()]);
        assert_eq!(report.groups_processed, 1);
    }

    /// 每次写入都失败的进度存储
    struct ReadOnlyStore;

    impl CheckpointStore for ReadOnlyStore {
        fn load(&self) -> AppResult<Checkpoint> {
            Ok(Checkpoint::new())
        }

        fn persist(&self, _checkpoint: &Checkpoint) -> AppResult<()> {
            Err(AppError::CheckpointPersist {
                path: std::path::PathBuf::from("progress.json"),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            })
        }
    }

    #[tokio::test]
    async fn test_persist_failure_aborts_batch() {
        let setup = Setup::new(FakeDevice::new(UP, DOWN));
        let groups = vec![
            setup.group("CameraA", &["img001.JPG", "img002.JPG"]),
            setup.group("CameraB", &["img003.JPG"]),
        ];
        let bridge: Arc<dyn DeviceBridge> = setup.device.clone();
        let runner = Arc::new(ScriptRunner::new(
            bridge.clone(),
            InteractionScript::default().without_delays(),
        ));
        let job = ItemJob::new(
            TransferGateway::new(bridge, UP, DOWN),
            runner,
            setup.dir.path().join("out"),
        );
        let mut orchestrator =
            BatchOrchestrator::new(job, Box::new(ReadOnlyStore), RetryPolicy::immediate(3))
                .unwrap();

        let err = orchestrator.run_all(&groups).await.unwrap_err();

        assert!(matches!(err, AppError::CheckpointPersist { .. }));
        assert!(err.is_fatal());
        assert_eq!(setup.device.pushed_names(), vec!["img001.JPG".to_string()]);
    }

    #[tokio::test]
    async fn test_corrupt_checkpoint_refuses_to_start() {
        let setup = Setup::new(FakeDevice::new(UP, DOWN));
        std::fs::write(setup.progress_path(), "[[[").unwrap();

        let err = setup.orchestrator(1).err().expect("corrupt checkpoint must fail");
        assert!(matches!(err, AppError::CheckpointCorruption { .. }));
    }
}
