//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理、重试和进度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量处理器
//! - 管理应用生命周期（设备检查、目录准备、进度加载）
//! - 遍历分组和条目，跳过进度中已完成的条目
//! - 每完成一个条目立即写入进度
//! - 汇总运行报告
//!
//! ### `group_processor` - 重试循环
//! - 对单个条目最多尝试 `max_retries` 次
//! - 两次尝试之间带抖动地等待
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<Group>)
//!     ↓
//! group_processor (单个 Item 的重试)
//!     ↓
//! workflow::ItemJob (单次尝试的状态机)
//!     ↓
//! services (能力层：transfer / interaction / checkpoint)
//!     ↓
//! infrastructure (基础设施：DeviceBridge)
//! ```

pub mod batch_processor;
pub mod group_processor;

// 重新导出主要类型
pub use batch_processor::{App, BatchOrchestrator, GroupStats, ItemKey, RunReport};
pub use group_processor::{run_with_retries, ItemResult, RetryPolicy};
