// crates/lw_physics/src/sources/forest.rs

//! 森林状态
//!
//! 每个单元持有不透明度 `nD`（已按 cs²/dA 换算）、树干直径 `tD` 和倒伏速率。
//! 流体作用于树干的弯矩超过断裂弯矩时，单元进入倒伏阶段，此后
//! `nD` 按 `max(0, 1 − decay·dt)` 逐步衰减，不会回升。
//!
//! ```text
//! M_flow = 0.25·c_D·ρ·(s² + 5·g·h·cosθ)·tD·h·(h + 2·hs)
//! M_crit = MoR·tD³
//! ```

use lw_foundation::{Grid2, LwError, LwResult};

use crate::types::ForestParams;

/// 单元树木状态
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TreeState {
    /// 不透明度不高于残余值，不再参与
    Sparse,
    /// 完好
    Intact,
    /// 倒伏中
    Decaying {
        /// 衰减速率 [1/s]
        rate: f64,
    },
}

/// 单元受力输入
#[derive(Debug, Clone, Copy)]
pub struct TreeLoad {
    /// 流深
    pub h: f64,
    /// 速率
    pub s: f64,
    /// 树干以下雪层高度
    pub hs: f64,
    /// cs²/dA
    pub cos_th: f64,
}

/// 森林场
#[derive(Debug, Clone)]
pub struct ForestStand {
    /// 不透明度 [1/m]
    pub nd: Grid2<f64>,
    /// 树干直径 [m]
    pub td: Grid2<f64>,
    /// 倒伏速率，0 表示完好 [1/s]
    pub decay: Grid2<f64>,
}

impl ForestStand {
    /// 由投影不透明度与树干直径建立（`nd` 需已换算到斜面）
    pub fn new(nd: Grid2<f64>, td: Grid2<f64>) -> LwResult<Self> {
        let (m, n) = nd.shape();
        if !td.has_shape(m, n) {
            return Err(LwError::size_mismatch("tree diameter", m * n, td.len()));
        }
        Ok(Self {
            nd,
            td,
            decay: Grid2::new(m, n, 0.0),
        })
    }

    /// 单元状态
    pub fn state(&self, i: usize, j: usize, params: &ForestParams) -> TreeState {
        if self.nd[(i, j)] <= params.nd_min {
            TreeState::Sparse
        } else if self.decay[(i, j)] == 0.0 {
            TreeState::Intact
        } else {
            TreeState::Decaying {
                rate: self.decay[(i, j)],
            }
        }
    }

    /// 单元步进：完好时检查断裂，倒伏时衰减不透明度
    #[allow(clippy::too_many_arguments)]
    pub fn update_cell(
        &mut self,
        i: usize,
        j: usize,
        load: &TreeLoad,
        params: &ForestParams,
        g: f64,
        rho: f64,
        dt: f64,
    ) {
        match self.state(i, j, params) {
            TreeState::Sparse => {}
            TreeState::Intact => {
                let td = self.td[(i, j)];
                if td <= 0.0 {
                    return;
                }
                let moment = bending_moment(load, params.cd, rho, g, td);
                if moment > params.modulus_of_rupture * td * td * td {
                    self.decay[(i, j)] = params.decay_coefficient / td;
                }
            }
            TreeState::Decaying { rate } => {
                self.nd[(i, j)] *= (1.0 - rate * dt).max(0.0);
            }
        }
    }

    /// 当前不透明度场
    pub fn density(&self) -> &Grid2<f64> {
        &self.nd
    }
}

/// 流体作用在树干上的弯矩
#[inline]
pub fn bending_moment(load: &TreeLoad, cd: f64, rho: f64, g: f64, td: f64) -> f64 {
    let TreeLoad { h, s, hs, cos_th } = *load;
    0.25 * cd * rho * (s * s + 5.0 * g * h * cos_th) * td * h * (h + 2.0 * hs)
}
