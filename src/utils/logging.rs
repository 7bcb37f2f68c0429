//! 日志工具模块
//!
//! 提供日志初始化和批处理各阶段的格式化输出
use std::path::Path;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// 初始化全局日志
///
/// 优先使用 `RUST_LOG`；未设置时按 `verbose` 选择 `debug` 或 `info`。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `groups`: 配置中的仿真分组数量
/// - `octave_binary`: 仿真器可执行文件
pub fn log_startup(groups: usize, octave_binary: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 儿科 CT 体模数据集生成");
    info!("📋 仿真分组: {}", groups);
    info!("🔧 仿真器: {}", octave_binary);
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `image_directory`: 输出根目录
/// - `phantoms`: 体模数量
/// - `diameters`: 直径数量
/// - `doses`: 剂量水平数量
pub fn log_batch_start(image_directory: &Path, phantoms: usize, diameters: usize, doses: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📦 开始批量仿真: {}", image_directory.display());
    info!(
        "📄 {} 个体模 × {} 个直径 × {} 个剂量 = {} 次剂量扫描",
        phantoms,
        diameters,
        doses,
        phantoms * diameters * doses
    );
    info!("{}", "=".repeat(60));
}

/// 记录体模开始信息
pub fn log_phantom_start(phantom: &str, index: usize, total: usize) {
    info!("\n{}", "─".repeat(60));
    info!("🧪 {} 仿真序列 {}/{}", phantom, index, total);
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
///
/// # 参数
/// - `simulations`: 仿真次数
/// - `series`: 写出的序列数
/// - `files`: 写出的文件数
/// - `elapsed`: 耗时
/// - `metadata_path`: 元数据表路径
pub fn print_final_stats(
    simulations: usize,
    series: usize,
    files: usize,
    elapsed: Duration,
    metadata_path: &Path,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 批量仿真完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 仿真次数: {}", simulations);
    info!("🗂️ 序列: {} | 文件: {}", series, files);
    info!("⏱️ 耗时: {:.1}s", elapsed.as_secs_f64());
    info!("{}", "=".repeat(60));
    info!("\n元数据已保存至: {}", metadata_path.display());
}
