/// 日志工具模块
///
/// 提供启动、分组、最终统计的日志输出
use crate::config::Config;
use crate::orchestrator::{GroupStats, RunReport};
use tracing::{info, warn};

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 设备图片中转模式");
    info!("📂 源目录: {}", config.upload_base.display());
    info!("📥 结果目录: {}", config.download_base.display());
    info!("🔁 最大重试次数: {}", config.max_retries);
    info!("{}", "=".repeat(60));
}

/// 记录分组加载信息
pub fn log_groups_loaded(group_count: usize, total_items: usize) {
    info!(
        "🎯 找到 {} 个分组，共 {} 个文件",
        group_count, total_items
    );
}

/// 记录分组开始信息
pub fn log_group_start(group_num: usize, total_groups: usize, group_id: &str, item_count: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始处理第 {}/{} 个分组: {}", group_num, total_groups, group_id);
    info!("📂 待处理文件: {} 个", item_count);
    info!("{}", "=".repeat(60));
}

/// 记录分组完成信息
pub fn log_group_complete(group_id: &str, stats: &GroupStats) {
    info!("\n{}", "─".repeat(60));
    info!(
        "✓ 分组 {} 完成: 成功 {}, 已完成跳过 {}, 失败 {}",
        group_id, stats.completed, stats.skipped, stats.failed
    );
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(report: &RunReport, config: &Config) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("📂 处理分组: {}", report.groups_processed);
    info!("✅ 本次成功: {}", report.completed.len());
    info!("⏭️ 已完成跳过: {}", report.skipped);
    info!("❌ 永久失败: {}", report.failed.len());
    for item in &report.failed {
        warn!("   - {}", item);
    }
    info!("{}", "=".repeat(60));
    if !report.failed.is_empty() {
        info!("\n失败记录已保存至: {}", config.failure_log_file.display());
    }
}
