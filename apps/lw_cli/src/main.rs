// apps/lw_cli/src/main.rs

//! Lawina 命令行界面
//!
//! 雪崩/碎屑流模拟的命令行工具。
//!
//! 进程退出码：0 达到模拟时长；1 流动停止或离开计算域；2 时间步长
//! 低于下限；10 配置、输入或输出错误。

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// 配置、输入或输出错误的退出码
const EXIT_FAILURE: u8 = 10;

/// Lawina 质量流模拟命令行工具
#[derive(Parser)]
#[command(name = "lw_cli")]
#[command(author = "Lawina Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Lawina gravitational mass-flow simulator", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行模拟
    Run(commands::run::RunArgs),
    /// 显示信息
    Info(commands::info::InfoArgs),
    /// 验证配置与输入栅格
    Validate(commands::validate::ValidateArgs),
}

fn main() -> ExitCode {
    match try_main() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("错误: {err:#}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

fn try_main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let level = cli.log_level.parse::<Level>().unwrap_or(Level::INFO);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args),
        Commands::Info(args) => commands::info::execute(args).map(|()| ExitCode::SUCCESS),
        Commands::Validate(args) => commands::validate::execute(args).map(|()| ExitCode::SUCCESS),
    }
}
