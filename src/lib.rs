//! # ADB Image Relay
//!
//! 把本地图片推送到 Android 设备，驱动设备上的应用重新压缩，再把结果拉回本地。
//! 支持断点续跑：已完成的条目记录在进度文件中，重启后不会重复处理。
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有设备连接，只暴露能力
//! - `DeviceBridge` - push / pull / 输入注入 / shell
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文件
//! - `TransferGateway` - 推导设备路径，确认拉取结果
//! - `ScriptRunner` - 按脚本点击
//! - `CheckpointStore` - 进度读写
//! - `FailureWriter` - 写失败记录
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个文件"的一次尝试
//! - `ItemJob` - push → interact → pull 状态机
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 分组遍历、进度、报告
//! - `orchestrator/group_processor` - 单个文件的重试循环

pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{AdbBridge, DeviceBridge};
pub use models::{Group, Item, RemotePaths};
pub use orchestrator::{App, BatchOrchestrator, RunReport};
pub use services::{Checkpoint, CheckpointStore, JsonCheckpointStore};
pub use workflow::{AttemptOutcome, ItemJob};
