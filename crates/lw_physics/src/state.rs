// crates/lw_physics/src/state.rs

//! 守恒量与原始变量
//!
//! - [`ConservedState`]: 每单元 `[h·dA, h·dA·u, h·dA·v]`，由输运步进推进
//! - [`PrimitiveFields`]: 深度、速度分量、速率、冲击压力，每步由守恒量恢复
//!
//! 原始变量从不独立持有，只能通过 [`PrimitiveFields::recover`] 更新。

use lw_foundation::{Grid2, IndexWindow, LwError, LwResult};
use rayon::prelude::*;

use crate::terrain::TerrainGeometry;

/// 启用并行恢复的单元数阈值
const PARALLEL_THRESHOLD: usize = 4096;

/// 守恒量分量索引
pub const MASS: usize = 0;
/// x 向动量
pub const MOM_X: usize = 1;
/// y 向动量
pub const MOM_Y: usize = 2;

/// 守恒状态
#[derive(Debug, Clone, PartialEq)]
pub struct ConservedState {
    cells: Grid2<[f64; 3]>,
}

impl ConservedState {
    /// 创建零状态
    pub fn new(m: usize, n: usize) -> Self {
        Self {
            cells: Grid2::new(m, n, [0.0; 3]),
        }
    }

    /// 由深度与速度场初始化：`f = (h dA, h dA u, h dA v)`
    pub fn from_primitives(
        h: &Grid2<f64>,
        u: &Grid2<f64>,
        v: &Grid2<f64>,
        geom: &TerrainGeometry,
    ) -> LwResult<Self> {
        let (m, n) = geom.shape();
        for (name, field) in [("depth", h), ("velocity u", u), ("velocity v", v)] {
            if !field.has_shape(m, n) {
                return Err(LwError::size_mismatch(name, m * n, field.len()));
            }
        }
        let mut state = Self::new(m, n);
        for i in 0..m {
            for j in 0..n {
                let mass = h[(i, j)] * geom.da[(i, j)];
                state.cells[(i, j)] = [mass, mass * u[(i, j)], mass * v[(i, j)]];
            }
        }
        Ok(state)
    }

    /// 网格形状
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        self.cells.shape()
    }

    /// 单元守恒量
    #[inline]
    pub fn cell(&self, i: usize, j: usize) -> &[f64; 3] {
        &self.cells[(i, j)]
    }

    /// 单元守恒量（可变）
    #[inline]
    pub fn cell_mut(&mut self, i: usize, j: usize) -> &mut [f64; 3] {
        &mut self.cells[(i, j)]
    }

    /// 单元质量（体积）
    #[inline]
    pub fn mass(&self, i: usize, j: usize) -> f64 {
        self.cells[(i, j)][MASS]
    }

    /// 整体复制（不重新分配）
    pub fn copy_from(&mut self, other: &ConservedState) {
        self.cells.copy_from(&other.cells);
    }

    /// 全网格总质量
    pub fn total_mass(&self) -> f64 {
        self.cells.as_slice().iter().map(|c| c[MASS]).sum()
    }

    /// 全网格总动量
    pub fn total_momentum(&self) -> [f64; 2] {
        self.cells
            .as_slice()
            .iter()
            .fold([0.0, 0.0], |acc, c| [acc[0] + c[MOM_X], acc[1] + c[MOM_Y]])
    }

    /// 最小单元质量
    pub fn min_mass(&self) -> f64 {
        self.cells
            .as_slice()
            .iter()
            .map(|c| c[MASS])
            .fold(f64::INFINITY, f64::min)
    }

    /// 底层网格
    #[inline]
    pub fn grid(&self) -> &Grid2<[f64; 3]> {
        &self.cells
    }
}

/// 原始变量场
#[derive(Debug, Clone)]
pub struct PrimitiveFields {
    /// 流深 [m]
    pub h: Grid2<f64>,
    /// x 向速度 [m/s]
    pub u: Grid2<f64>,
    /// y 向速度 [m/s]
    pub v: Grid2<f64>,
    /// 速率（含非正交度量）[m/s]
    pub s: Grid2<f64>,
    /// 冲击压力 ρ·s² [Pa]
    pub p: Grid2<f64>,
}

impl PrimitiveFields {
    /// 创建零场
    pub fn new(m: usize, n: usize) -> Self {
        let zero = Grid2::new(m, n, 0.0);
        Self {
            h: zero.clone(),
            u: zero.clone(),
            v: zero.clone(),
            s: zero.clone(),
            p: zero,
        }
    }

    /// 在窗口内由守恒量恢复原始变量
    pub fn recover(
        &mut self,
        state: &ConservedState,
        geom: &TerrainGeometry,
        window: &IndexWindow,
        rho: f64,
        h_min: f64,
    ) {
        let cells: Vec<(usize, usize)> = window.cells().collect();
        let compute = |&(i, j): &(usize, usize)| {
            recover_cell(state.cell(i, j), geom.da[(i, j)], geom.g_xy[(i, j)], rho, h_min)
        };

        let values: Vec<[f64; 5]> = if cells.len() >= PARALLEL_THRESHOLD {
            cells.par_iter().map(compute).collect()
        } else {
            cells.iter().map(compute).collect()
        };

        for (&(i, j), [h, u, v, s, p]) in cells.iter().zip(values) {
            self.h[(i, j)] = h;
            self.u[(i, j)] = u;
            self.v[(i, j)] = v;
            self.s[(i, j)] = s;
            self.p[(i, j)] = p;
        }
    }
}

/// 单元原始变量恢复，返回 `[h, u, v, s, p]`
///
/// 质量非正时速度为零；除数下限为 `h_min·dA`。
#[inline]
pub fn recover_cell(f: &[f64; 3], da: f64, g_xy: f64, rho: f64, h_min: f64) -> [f64; 5] {
    let h = f[MASS] / da;
    let inv = if f[MASS] > 0.0 {
        1.0 / f[MASS].max(h_min * da)
    } else {
        0.0
    };
    let u = f[MOM_X] * inv;
    let v = f[MOM_Y] * inv;
    let s2 = (u * u + v * v + 2.0 * g_xy * u * v).max(0.0);
    [h, u, v, s2.sqrt(), rho * s2]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recover_cell_basic() {
        let [h, u, v, s, p] = recover_cell(&[2.0, 4.0, -2.0], 1.0, 0.0, 250.0, 0.05);
        assert!((h - 2.0).abs() < 1e-12);
        assert!((u - 2.0).abs() < 1e-12);
        assert!((v + 1.0).abs() < 1e-12);
        assert!((s - 5.0_f64.sqrt()).abs() < 1e-12);
        assert!((p - 250.0 * 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_recover_empty_cell() {
        let [h, u, v, s, _] = recover_cell(&[0.0, 1.0, 1.0], 1.0, 0.0, 250.0, 0.05);
        assert_eq!((h, u, v, s), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_recover_thin_cell_floor() {
        // 质量低于 h_min·dA 时以下限为除数
        let [_, u, _, _, _] = recover_cell(&[0.01, 0.01, 0.0], 1.0, 0.0, 250.0, 0.05);
        assert!((u - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_speed_with_metric() {
        let [_, _, _, s, _] = recover_cell(&[1.0, 1.0, 1.0], 1.0, 0.5, 1.0, 0.05);
        assert!((s - 3.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_state_totals() {
        let mut state = ConservedState::new(3, 2);
        *state.cell_mut(0, 0) = [1.0, 2.0, 3.0];
        *state.cell_mut(2, 1) = [4.0, -1.0, 0.5];
        assert!((state.total_mass() - 5.0).abs() < 1e-12);
        assert_eq!(state.total_momentum(), [1.0, 3.5]);
        assert_eq!(state.min_mass(), 0.0);
    }
}
