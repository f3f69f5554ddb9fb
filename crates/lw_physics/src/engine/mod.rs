// crates/lw_physics/src/engine/mod.rs

//! 时间积分引擎
//!
//! - [`timestep`]: CFL 步长
//! - [`transport`]: MoT 输运、重试与反向检查
//! - [`tracker`]: 活动区域、极值场与终止判据
//! - [`simulation`]: 模拟上下文与主循环

pub mod simulation;
pub mod timestep;
pub mod tracker;
pub mod transport;

pub use simulation::{RunOutcome, Simulation, StepReport, StopReason};
pub use timestep::CflController;
pub use tracker::{TrackerReport, TrackingFields};
pub use transport::{earth_pressure, static_friction_impulse, AdvanceOutcome, TransportStepper};
