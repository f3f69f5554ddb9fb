// crates/lw_physics/src/engine/tracker.rs

//! 活动区域与终止判据
//!
//! 每个接受步之后：
//!
//! - 在当前窗口内找出运动单元（质量 > `h_min·dA` 且速率 > `u_min`），
//!   以一格余量扩展包围盒并累计运动体积；
//! - 在全网格上更新最大值场（速度分量与压力取最大速率时刻的值）；
//! - 返回全网格动量指标 `Σ s·f_mass`，由调用方与阈值比较。

use lw_foundation::{Grid2, IndexWindow};
use serde::Serialize;
use tracing::trace;

use crate::material::BedReservoirs;
use crate::state::{ConservedState, PrimitiveFields, MASS};
use crate::terrain::TerrainGeometry;

/// 运行期极值场
#[derive(Debug, Clone)]
pub struct TrackingFields {
    /// 最大流深
    pub h_max: Grid2<f64>,
    /// 最大速率
    pub s_max: Grid2<f64>,
    /// 最大速率时刻的 u
    pub u_max: Grid2<f64>,
    /// 最大速率时刻的 v
    pub v_max: Grid2<f64>,
    /// 最大冲击压力 [Pa]
    pub p_max: Grid2<f64>,
    /// 最小床层深度
    pub b_min: Grid2<f64>,
    /// 最大沉积深度
    pub d_max: Grid2<f64>,
    erosion: bool,
    deposition: bool,
}

/// 单步跟踪结果
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrackerReport {
    /// 新的活动窗口
    pub window: IndexWindow,
    /// 运动体积 [m³]
    pub moving_volume: f64,
    /// 动量指标 Σ s·f_mass [m⁴/s]
    pub momentum: f64,
    /// 全网格体积 [m³]
    pub total_volume: f64,
}

impl TrackingFields {
    /// 初始化：`b_min` 取初始床层，其余为零
    pub fn new(bed: &BedReservoirs, erosion: bool, deposition: bool) -> Self {
        let (m, n) = bed.b.shape();
        let zero = Grid2::new(m, n, 0.0);
        Self {
            h_max: zero.clone(),
            s_max: zero.clone(),
            u_max: zero.clone(),
            v_max: zero.clone(),
            p_max: zero.clone(),
            b_min: bed.b.clone(),
            d_max: zero,
            erosion,
            deposition,
        }
    }

    /// 更新极值并计算新窗口
    #[allow(clippy::too_many_arguments)]
    pub fn update(
        &mut self,
        state: &ConservedState,
        prim: &PrimitiveFields,
        bed: &BedReservoirs,
        geom: &TerrainGeometry,
        window: &IndexWindow,
        h_min: f64,
        u_min: f64,
        rho: f64,
    ) -> TrackerReport {
        let (m, n) = state.shape();

        let (mut west, mut east, mut south, mut north) = (m as isize, 0_isize, n as isize, 0_isize);
        let mut moving_volume = 0.0;
        for (i, j) in window.cells() {
            let mass = state.mass(i, j);
            if mass > h_min * geom.da[(i, j)] && prim.s[(i, j)] > u_min {
                let (ii, jj) = (i as isize, j as isize);
                west = west.min(ii - 1);
                east = east.max(ii + 1);
                south = south.min(jj - 1);
                north = north.max(jj + 1);
                moving_volume += mass;
            }
        }

        let mut momentum = 0.0;
        let mut total_volume = 0.0;
        for i in 0..m {
            for j in 0..n {
                let mass = state.cell(i, j)[MASS];
                let s = prim.s[(i, j)];
                self.h_max[(i, j)] = self.h_max[(i, j)].max(prim.h[(i, j)]);
                if s > self.s_max[(i, j)] {
                    self.s_max[(i, j)] = s;
                    self.u_max[(i, j)] = prim.u[(i, j)];
                    self.v_max[(i, j)] = prim.v[(i, j)];
                    self.p_max[(i, j)] = rho * s * s;
                }
                if self.erosion {
                    self.b_min[(i, j)] = self.b_min[(i, j)].min(bed.b[(i, j)]);
                }
                if self.deposition {
                    self.d_max[(i, j)] = self.d_max[(i, j)].max(bed.d[(i, j)]);
                }
                momentum += s * mass;
                total_volume += mass;
            }
        }

        let window = if moving_volume > 0.0 {
            IndexWindow::new(
                west.max(0) as usize,
                ((east + 1) as usize).min(m),
                south.max(0) as usize,
                ((north + 1) as usize).min(n),
            )
        } else {
            IndexWindow::new(0, 0, 0, 0)
        };

        trace!(v_tot = total_volume, j_tot = rho * momentum, "总体积与总动量");

        TrackerReport {
            window,
            moving_volume,
            momentum,
            total_volume,
        }
    }
}
