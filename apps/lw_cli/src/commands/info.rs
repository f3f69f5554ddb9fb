// apps/lw_cli/src/commands/info.rs

//! 信息显示命令
//!
//! 显示版本信息与默认配置。

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use lw_config::RunConfig;
use tracing::info;

/// 信息显示参数
#[derive(Args)]
pub struct InfoArgs {
    /// 将默认配置写入该文件
    #[arg(long)]
    pub write_defaults: Option<PathBuf>,
}

/// 执行信息命令
pub fn execute(args: InfoArgs) -> Result<()> {
    info!("=== Lawina 信息 ===");

    println!("=== 系统信息 ===");
    println!("Lawina CLI 版本: {}", env!("CARGO_PKG_VERSION"));
    println!("目标平台: {}", std::env::consts::ARCH);
    println!("操作系统: {}", std::env::consts::OS);
    println!("可用线程: {}", available_threads());
    println!();

    let config = RunConfig::default();
    println!("=== 默认配置 ===");
    println!("{}", serde_json::to_string_pretty(&config).context("序列化默认配置失败")?);

    if let Some(path) = args.write_defaults {
        config
            .save_to_file(&path)
            .with_context(|| format!("无法写入 {}", path.display()))?;
        println!("\n默认配置已写入 {}", path.display());
    }

    Ok(())
}

fn available_threads() -> usize {
    std::thread::available_parallelism().map_or(1, |n| n.get())
}
