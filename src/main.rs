use anyhow::{Context, Result};
use clap::Parser;
use pediatric_iq_phantoms::models::load_batch_requests;
use pediatric_iq_phantoms::utils::logging;
use pediatric_iq_phantoms::{BatchOrchestrator, Config};
use std::path::PathBuf;
use tracing::info;

/// 儿科 CT 图像质量体模生成器
#[derive(Debug, Parser)]
#[command(name = "pediatric-iq-phantoms", version, about)]
struct Cli {
    /// 包含 [[simulation]] 分组的 TOML 配置文件（缺省时使用内置 configs/defaults.toml）
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = Config::from_env().context("读取环境变量配置失败")?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let requests = load_batch_requests(cli.config.as_deref())
        .await
        .context("加载仿真配置失败")?;
    logging::log_startup(requests.len(), &config.octave_binary);

    let identities = config
        .identity_generator()
        .context("创建 UID 生成器失败")?;
    info!("🔑 UID 批次盐值: {}", identities.salt());

    let mut orchestrator = BatchOrchestrator::new(config.simulator(), identities);
    for (index, request) in requests.iter().enumerate() {
        let table = orchestrator
            .run_batch(request)
            .await
            .with_context(|| format!("第 {} 个仿真分组失败", index + 1))?;
        info!("✓ 分组 {} 完成，共 {} 条记录", index + 1, table.len());
    }

    Ok(())
}
