// apps/lw_cli/src/commands/validate.rs

//! 配置验证命令
//!
//! 检查配置文件，并可选地读取全部输入栅格检查对齐与数值下限。

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use lw_config::RunConfig;
use lw_io::load_site;
use lw_physics::SimParams;
use tracing::{error, info};

/// 验证参数
#[derive(Args)]
pub struct ValidateArgs {
    /// 配置文件路径
    pub config: PathBuf,

    /// 同时读取并检查输入栅格
    #[arg(long)]
    pub inputs: bool,
}

/// 执行验证命令
pub fn execute(args: ValidateArgs) -> Result<()> {
    info!("=== Lawina 配置验证 ===");
    println!("\n检查配置文件: {}", args.config.display());

    let config = match RunConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(err) => {
            error!("  ✗ {}", err);
            println!("  ✗ {}", err);
            bail!("验证失败：配置无效");
        }
    };
    println!("  ✓ 配置有效");

    let params = SimParams::from_config(&config)?;
    println!("  侵蚀模型: {:?}", params.erosion);
    println!("  摩擦参数: {:?}", params.friction);
    println!("  rrb = {:.3}, rrd = {:.3}", params.rrb, params.rrd);
    println!(
        "  时间切片: {}",
        if params.writes_slices() { "是" } else { "否" }
    );

    if args.inputs {
        println!("\n检查输入栅格");
        match load_site(&config) {
            Ok(site) => {
                let f = site.frame;
                println!(
                    "  ✓ 网格 {}×{}, cellsize {}, 左下角 ({}, {})",
                    f.m, f.n, f.cellsize, f.xll, f.yll
                );
                println!("  释放体积（投影）: {:.1} m³", site.release_depth.sum() * f.cellsize * f.cellsize);
                println!("  续算: {}", if site.is_restart() { "是" } else { "否" });
            }
            Err(err) => {
                error!("  ✗ {}", err);
                println!("  ✗ {}", err);
                bail!("验证失败：输入栅格无效");
            }
        }
    }

    println!("\n✓ 验证通过");
    Ok(())
}
