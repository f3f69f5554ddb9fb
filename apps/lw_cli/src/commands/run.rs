// apps/lw_cli/src/commands/run.rs

//! 运行模拟命令
//!
//! 读取配置与输入栅格，建立初始状态，运行至终止并写出结果。

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use lw_config::RunConfig;
use lw_io::{load_site, AsciiSnapshotWriter};
use lw_physics::{SimParams, SimulationBuilder};
use tracing::{info, warn};

/// 运行模拟参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径（JSON）
    pub config: PathBuf,

    /// 输出目录（覆盖配置）
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// 结果文件名前缀（覆盖配置）
    #[arg(short, long)]
    pub name: Option<String>,

    /// 模拟时长 [秒]（覆盖配置）
    #[arg(short = 't', long)]
    pub t_max: Option<f64>,
}

/// 执行运行命令，返回按终止原因确定的退出码
pub fn execute(args: RunArgs) -> Result<ExitCode> {
    info!("=== Lawina 模拟启动 ===");

    let mut config = RunConfig::from_file(&args.config)
        .with_context(|| format!("无法加载配置: {}", args.config.display()))?;
    if let Some(dir) = args.output {
        config.output.directory = dir;
    }
    if let Some(name) = args.name {
        config.run.name = name;
    }
    if let Some(t_max) = args.t_max {
        config.numerics.t_max = t_max;
    }
    config.validate().context("配置无效")?;

    let params = SimParams::from_config(&config)?;
    info!(
        "模型: 侵蚀={:?}, 沉积={}, 森林={}, 曲率={}",
        params.erosion,
        params.deposition,
        params.forest.is_some(),
        params.curvature
    );
    info!(
        "数值参数: CFL={}, dt=[{}, {}] s, t_max={} s",
        params.cfl, params.dt_min, params.dt_max, params.t_max
    );

    let site = load_site(&config).context("读取输入栅格失败")?;
    let frame = site.frame;
    let mut sim = SimulationBuilder::new(params, site)
        .build()
        .context("建立初始状态失败")?;

    let mut writer = AsciiSnapshotWriter::new(&config.output.directory, &config.run.name, frame);
    let start = Instant::now();
    let outcome = sim.run(&mut writer).context("写出结果失败")?;
    let elapsed = start.elapsed();

    info!("=== 模拟结束 ===");
    info!("终止原因: {}", outcome.reason);
    info!("模拟时间: {:.2} s, 总步数: {}", outcome.t, outcome.n_step);
    info!("时间切片: {}, 输出文件: {}", outcome.n_dump, writer.files_written());
    info!("计算时间: {:.2} s", elapsed.as_secs_f64());
    if outcome.reason.is_failure() {
        warn!("数值失败，已写出的结果仅供诊断");
    }

    Ok(ExitCode::from(outcome.reason.exit_code()))
}
