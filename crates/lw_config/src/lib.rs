// crates/lw_config/src/lib.rs

//! Lawina Config Layer
//!
//! 配置层，定义一次模拟运行所需的全部参数及其验证规则。
//!
//! # 模块概览
//!
//! - [`run_config`]: RunConfig 运行配置（JSON）
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 5: lw_cli       ─> uses RunConfig
//! Layer 3: lw_physics   ─> SimParams::from_config
//! Layer 2: lw_config    ─> RunConfig (本层)
//! Layer 1: lw_foundation
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod run_config;

// 重导出核心类型
pub use error::ConfigError;
pub use run_config::{
    BedStrengthProfile, ErosionConfig, ErosionKind, ForestConfig, FrictionParams, InputPaths,
    NumericsConfig, OutputConfig, PhysicsConfig, Rheology, RunConfig, RunSection,
};
