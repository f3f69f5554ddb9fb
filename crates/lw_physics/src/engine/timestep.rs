// crates/lw_physics/src/engine/timestep.rs

//! 时间步长控制模块
//!
//! 基于 CFL 条件在活动窗口内取最严格的单元限制：
//!
//! ```text
//! c   = max(√(u² + v²) + √(g_z·h), u_min)
//! Δt  = min(1000, C·min_窗口(min(dx, dy) / c), Δt_max)
//! ```
//!
//! `u_min` 下限保证静止单元不会产生无穷大的步长。

use lw_foundation::IndexWindow;
use rayon::prelude::*;

use crate::state::PrimitiveFields;
use crate::terrain::TerrainGeometry;
use crate::types::{SimParams, DT_CEILING};

/// 启用并行归约的单元数阈值
const PARALLEL_THRESHOLD: usize = 4096;

/// CFL 时间步计算器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CflController {
    /// CFL 数
    cfl: f64,
    /// 最大时间步长
    dt_max: f64,
    /// 特征速度下限
    u_min: f64,
}

impl CflController {
    /// 创建计算器
    pub fn new(cfl: f64, dt_max: f64, u_min: f64) -> Self {
        Self { cfl, dt_max, u_min }
    }

    /// 由运行参数创建
    pub fn from_params(params: &SimParams) -> Self {
        Self::new(params.cfl, params.dt_max, params.u_min)
    }

    /// 计算窗口内的稳定时间步长；空窗口只受上限约束
    pub fn find_dt(
        &self,
        geom: &TerrainGeometry,
        prim: &PrimitiveFields,
        window: &IndexWindow,
    ) -> f64 {
        let cell_dt = |(i, j): (usize, usize)| -> f64 {
            let (u, v) = (prim.u[(i, j)], prim.v[(i, j)]);
            let wave = (u * u + v * v).sqrt() + (geom.gz[(i, j)] * prim.h[(i, j)]).max(0.0).sqrt();
            let c = wave.max(self.u_min);
            self.cfl * geom.dx[(i, j)].min(geom.dy[(i, j)]) / c
        };

        let dt = if window.cell_count() >= PARALLEL_THRESHOLD {
            let cells: Vec<(usize, usize)> = window.cells().collect();
            cells
                .par_iter()
                .map(|&c| cell_dt(c))
                .reduce(|| DT_CEILING, f64::min)
        } else {
            window.cells().map(cell_dt).fold(DT_CEILING, f64::min)
        };

        dt.min(self.dt_max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ConservedState;
    use lw_foundation::Grid2;

    fn flat(m: usize, n: usize, cs: f64) -> TerrainGeometry {
        TerrainGeometry::build(&Grid2::new(m, n, 0.0), cs, 9.81).unwrap()
    }

    fn prim_with(geom: &TerrainGeometry, h: f64, u: f64) -> PrimitiveFields {
        let (m, n) = geom.shape();
        let state = ConservedState::from_primitives(
            &Grid2::new(m, n, h),
            &Grid2::new(m, n, u),
            &Grid2::new(m, n, 0.0),
            geom,
        )
        .unwrap();
        let mut prim = PrimitiveFields::new(m, n);
        prim.recover(&state, geom, &geom.full_window(), 250.0, 0.01);
        prim
    }

    #[test]
    fn test_wave_speed_limit() {
        let geom = flat(4, 4, 10.0);
        let prim = prim_with(&geom, 1.0, 3.0);
        let ctl = CflController::new(0.5, 100.0, 0.01);
        let dt = ctl.find_dt(&geom, &prim, &geom.full_window());
        let expected = 0.5 * 10.0 / (3.0 + 9.81_f64.sqrt());
        assert!((dt - expected).abs() < 1e-12);
    }

    #[test]
    fn test_dt_max_caps() {
        let geom = flat(3, 3, 10.0);
        let prim = prim_with(&geom, 1.0, 0.0);
        let ctl = CflController::new(0.7, 0.2, 0.01);
        assert_eq!(ctl.find_dt(&geom, &prim, &geom.full_window()), 0.2);
    }

    #[test]
    fn test_dry_cells_use_speed_floor() {
        let geom = flat(3, 3, 1.0);
        let prim = PrimitiveFields::new(3, 3);
        let ctl = CflController::new(0.5, 1.0e6, 0.01);
        // 0.5·1/0.01 = 50
        assert!((ctl.find_dt(&geom, &prim, &geom.full_window()) - 50.0).abs() < 1e-12);
        // 空窗口不受波速限制
        let empty = IndexWindow::new(0, 0, 0, 0);
        assert_eq!(ctl.find_dt(&geom, &prim, &empty), 1.0e6_f64.min(DT_CEILING));
    }
}
