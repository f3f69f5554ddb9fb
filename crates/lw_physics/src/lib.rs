// crates/lw_physics/src/lib.rs

//! Lawina 物理引擎
//!
//! 在数字高程模型上积分深度平均的雪崩/碎屑流方程：
//!
//! - [`terrain`]: 地形几何（度量、重力分量、曲率）
//! - [`state`]: 守恒量与原始变量
//! - [`sources`]: Voellmy 摩擦、侵蚀/沉积、森林拖曳
//! - [`engine`]: 步长控制、输运与主循环
//! - [`setup`]: 由输入栅格建立初始状态
//! - [`output`]: 时间切片与极值快照

#![warn(missing_docs)]

pub mod engine;
pub mod material;
pub mod output;
pub mod setup;
pub mod sources;
pub mod state;
pub mod terrain;
pub mod types;

pub use engine::{RunOutcome, Simulation, StepReport, StopReason};
pub use material::{BedReservoirs, MaterialFields};
pub use output::{FieldKind, MaximaSet, MemorySink, OutputLayer, SnapshotSink, TimeSlice};
pub use setup::{SimulationBuilder, SiteData};
pub use state::{ConservedState, PrimitiveFields};
pub use terrain::TerrainGeometry;
pub use types::{ForestParams, SimParams};
