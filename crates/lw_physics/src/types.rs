// crates/lw_physics/src/types.rs

//! 核心类型定义
//!
//! [`SimParams`] 是运行期只读的参数集合，在构建模拟时由 [`RunConfig`]
//! 一次性导出。所有隐含单位换算（按流体密度缩放的强度、动量阈值等）
//! 都在这里完成，数值核心只读取已换算的量。

use lw_config::{BedStrengthProfile, ErosionKind, FrictionParams, RunConfig};
use lw_foundation::{LwError, LwResult};
use serde::{Deserialize, Serialize};

/// 负质量重试时的默认步长缩减因子
pub const SHRINK_FACTOR: f64 = 0.8;

/// 动量停止判据生效前的默认预热步数
pub const WARMUP_STEPS: usize = 10;

/// 时间步长上限（与 dt_max 取小）
pub const DT_CEILING: f64 = 1000.0;

/// 床层强度按密度缩放后的下限 [m²/s²]
pub const TAU_C_FLOOR: f64 = 0.1;

/// 森林参数（已换算）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    /// 树干拖曳系数 c_D
    pub cd: f64,
    /// 断裂模量 [Pa]
    pub modulus_of_rupture: f64,
    /// 倒伏系数 [m/s]
    pub decay_coefficient: f64,
    /// 残余不透明度，低于此值的单元不再参与
    pub nd_min: f64,
}

/// 运行期参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimParams {
    // ---------- 物理 ----------
    /// 重力加速度 [m/s²]
    pub g: f64,
    /// 流体密度 [kg/m³]
    pub rho: f64,
    /// ρ / ρ_b
    pub rrb: f64,
    /// ρ / ρ_d
    pub rrd: f64,
    /// Goem 系数 1/√(rrb−1)，其他模型为 1
    pub sigma: f64,
    /// 摩擦参数来源
    pub friction: FrictionParams,
    /// 拖曳项有效最大深度 [m]（0 表示不启用）
    pub h_drag: f64,
    /// 被动土压力系数
    pub kp: f64,
    /// 曲率修正
    pub curvature: bool,
    /// 森林（None 表示不考虑）
    pub forest: Option<ForestParams>,
    /// 侵蚀模型
    pub erosion: ErosionKind,
    /// 侵蚀系数
    pub k_erod: f64,
    /// 床层强度剖面
    pub bed_strength: BedStrengthProfile,
    /// 沉积
    pub deposition: bool,
    /// 动态地表
    pub dynamic_surface: bool,

    // ---------- 数值 ----------
    /// 模拟时长 [s]
    pub t_max: f64,
    /// 最小步长 [s]
    pub dt_min: f64,
    /// 最大步长 [s]
    pub dt_max: f64,
    /// CFL 数
    pub cfl: f64,
    /// 最小流深 [m]
    pub h_min: f64,
    /// 最小速度 [m/s]
    pub u_min: f64,
    /// 动量阈值，已除以 ρ [m⁴/s]
    pub mom_thr: f64,
    /// 预热步数
    pub warmup_steps: usize,
    /// 重试缩减因子
    pub shrink: f64,

    // ---------- 输出 ----------
    /// 时间切片间隔 [s]
    pub dt_dump: f64,
    /// 输出速度分量
    pub write_velocity: bool,
    /// 输出最大压力
    pub write_max_pressure: bool,
    /// 输出瞬时压力
    pub write_pressure: bool,
}

impl SimParams {
    /// 从运行配置导出
    ///
    /// 配置需已通过 [`RunConfig::validate`]；此处再次验证以保证
    /// 任何入口构建的模拟都满足前置条件。
    pub fn from_config(config: &RunConfig) -> LwResult<Self> {
        config.validate().map_err(LwError::from)?;

        let p = &config.physics;
        let nm = &config.numerics;
        let rrb = p.flow_density / p.bed_density;
        let rrd = p.flow_density / p.deposit_density;
        let sigma = if p.erosion.model == ErosionKind::Goem {
            1.0 / (rrb - 1.0).sqrt()
        } else {
            1.0
        };

        let forest = p.forest.enabled.then(|| ForestParams {
            cd: p.forest.tree_drag_coefficient,
            modulus_of_rupture: p.forest.modulus_of_rupture_mpa * 1.0e6,
            decay_coefficient: p.forest.decay_coefficient,
            nd_min: p.forest.residual_density,
        });

        Ok(Self {
            g: p.gravity,
            rho: p.flow_density,
            rrb,
            rrd,
            sigma,
            friction: p.friction,
            h_drag: p.effective_drag_depth.max(0.0),
            kp: p.earth_pressure_coefficient,
            curvature: p.curvature,
            forest,
            erosion: p.erosion.model,
            k_erod: p.erosion.coefficient,
            bed_strength: p.erosion.bed_strength,
            deposition: p.deposition,
            dynamic_surface: p.dynamic_surface && p.erosion.model.is_active(),
            t_max: nm.t_max,
            dt_min: nm.dt_min,
            dt_max: nm.dt_max,
            cfl: nm.cfl,
            h_min: nm.h_min,
            u_min: nm.u_min,
            mom_thr: nm.momentum_threshold / p.flow_density,
            warmup_steps: nm.warmup_steps,
            shrink: nm.retry_shrink,
            dt_dump: config.output.interval,
            write_velocity: config.output.write_velocity,
            write_max_pressure: config.output.write_max_pressure,
            write_pressure: config.output.write_pressure,
        })
    }

    /// 是否启用侵蚀
    #[inline]
    pub fn erosion_active(&self) -> bool {
        self.erosion.is_active()
    }

    /// 是否输出时间切片
    #[inline]
    pub fn writes_slices(&self) -> bool {
        self.t_max >= self.dt_dump
    }

    /// 按流体密度缩放床层强度 [Pa → m²/s²]
    #[inline]
    pub fn scale_bed_strength(&self, tau_c: f64) -> f64 {
        (tau_c / self.rho).max(TAU_C_FLOOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> RunConfig {
        let mut config = RunConfig::default();
        config.inputs.grid = PathBuf::from("dem.asc");
        config.inputs.release_depth = PathBuf::from("h.asc");
        config
    }

    #[test]
    fn test_derived_ratios() {
        let mut cfg = config();
        cfg.physics.flow_density = 300.0;
        cfg.physics.bed_density = 200.0;
        cfg.physics.deposit_density = 400.0;
        cfg.numerics.momentum_threshold = 600.0;
        let p = SimParams::from_config(&cfg).unwrap();
        assert!((p.rrb - 1.5).abs() < 1e-12);
        assert!((p.rrd - 0.75).abs() < 1e-12);
        assert!((p.mom_thr - 2.0).abs() < 1e-12);
        assert_eq!(p.sigma, 1.0);
    }

    #[test]
    fn test_goem_sigma() {
        let mut cfg = config();
        cfg.inputs.bed_depth = Some(PathBuf::from("b.asc"));
        cfg.inputs.bed_strength = Some(PathBuf::from("t.asc"));
        cfg.physics.erosion.model = ErosionKind::Goem;
        cfg.physics.erosion.coefficient = 1.0;
        cfg.physics.flow_density = 400.0;
        cfg.physics.bed_density = 200.0;
        let p = SimParams::from_config(&cfg).unwrap();
        assert!((p.sigma - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_bed_strength_scaling_floor() {
        let p = SimParams::from_config(&config()).unwrap();
        assert!((p.scale_bed_strength(2500.0) - 10.0).abs() < 1e-12);
        assert_eq!(p.scale_bed_strength(1.0), TAU_C_FLOOR);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = config();
        cfg.numerics.cfl = 0.0;
        let err = SimParams::from_config(&cfg).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_forest_units() {
        let mut cfg = config();
        cfg.inputs.forest_density = Some(PathBuf::from("nd.asc"));
        cfg.inputs.tree_diameter = Some(PathBuf::from("td.asc"));
        cfg.physics.forest.enabled = true;
        let p = SimParams::from_config(&cfg).unwrap();
        let forest = p.forest.unwrap();
        assert!((forest.modulus_of_rupture - 5.0e7).abs() < 1e-3);
    }
}
