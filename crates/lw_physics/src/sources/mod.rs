// crates/lw_physics/src/sources/mod.rs

//! 源项模块
//!
//! 每步在活动窗口内逐单元计算三个分量的源项 `[mass, mom_x, mom_y]`：
//!
//! - 摩擦：Voellmy 剪应力（[`friction`]），可叠加森林阻力
//! - 侵蚀：四种卷吸模型之一（[`erosion`]）
//! - 森林：树木断裂与不透明度衰减（[`forest`]）
//!
//! 动量源项只在 `s > u_min` 时计算，方向与流动相反：
//!
//! ```text
//! src_x = (g_x·h − u/s·τ_b)·dA
//! src_y = (g_y·h − v/s·τ_b)·dA
//! ```

pub mod erosion;
pub mod forest;
pub mod friction;

pub use erosion::{
    bed_gradient, limit_mass_source, ErosionCell, ErosionModel, ErosionRate, ReservoirRates,
};
pub use forest::{bending_moment, ForestStand, TreeLoad, TreeState};
pub use friction::{bed_shear_stress, drag_depth_correction, FrictionVariant};

use lw_foundation::{Grid2, IndexWindow};

use crate::material::{BedReservoirs, MaterialFields};
use crate::state::PrimitiveFields;
use crate::terrain::TerrainGeometry;
use crate::types::{ForestParams, SimParams};

/// 源项场：每单元 `[质量, x 动量, y 动量]`
pub type SourceField = Grid2<[f64; 3]>;

/// 源项计算器
#[derive(Debug, Clone)]
pub struct SourceTermEngine {
    friction: FrictionVariant,
    erosion: ErosionModel,
    forest: Option<ForestParams>,
    erosion_active: bool,
    h_drag: f64,
    h_min: f64,
    u_min: f64,
    g: f64,
    rho: f64,
}

impl SourceTermEngine {
    /// 由运行参数构建
    pub fn new(params: &SimParams) -> Self {
        Self {
            friction: FrictionVariant::select(params.friction, params.forest.map(|f| f.cd)),
            erosion: ErosionModel::from_params(params),
            forest: params.forest,
            erosion_active: params.erosion_active(),
            h_drag: params.h_drag,
            h_min: params.h_min,
            u_min: params.u_min,
            g: params.g,
            rho: params.rho,
        }
    }

    /// 摩擦变体
    pub fn friction(&self) -> FrictionVariant {
        self.friction
    }

    /// 侵蚀模型
    pub fn erosion(&self) -> ErosionModel {
        self.erosion
    }

    /// 在窗口内计算源项并推进森林状态
    ///
    /// 窗口外的 `out` 不被修改。
    #[allow(clippy::too_many_arguments)]
    pub fn evaluate(
        &self,
        geom: &TerrainGeometry,
        prim: &PrimitiveFields,
        mat: &MaterialFields,
        bed: &BedReservoirs,
        mut forest: Option<&mut ForestStand>,
        window: &IndexWindow,
        dt: f64,
        out: &mut SourceField,
    ) {
        for (i, j) in window.cells() {
            let h = prim.h[(i, j)];
            let s = prim.s[(i, j)];
            let u = prim.u[(i, j)];
            let v = prim.v[(i, j)];
            let gz = geom.gz[(i, j)];
            let da = geom.da[(i, j)];
            let cos_th = geom.cos_theta(i, j);
            let nd = forest.as_deref().map_or(0.0, |f| f.nd[(i, j)]);

            let (mu, k) = self.friction.coefficients(mat, i, j, h, nd, cos_th);
            let k = drag_depth_correction(k, h, self.h_drag, self.h_min);
            let tau_b = bed_shear_stress(mu, k, gz, h, s);

            let cell = ErosionCell {
                h,
                s,
                u,
                v,
                gz,
                da,
                g_xy: geom.g_xy[(i, j)],
                tau_c: mat.tau_c[(i, j)],
                mu_s: mat.mu_s[(i, j)],
                mu: mat.mu[(i, j)],
                k: mat.k[(i, j)],
                b: bed.b[(i, j)],
                bed_gradient: if self.erosion.needs_bed_gradient() {
                    bed_gradient(&bed.b, geom, i, j)
                } else {
                    (0.0, 0.0)
                },
            };
            let rate = self.erosion.evaluate(&cell, tau_b, self.h_min, self.u_min);

            let (mx, my) = if s > self.u_min {
                (
                    (geom.gx[(i, j)] * h - u / s * rate.tau_b) * da,
                    (geom.gy[(i, j)] * h - v / s * rate.tau_b) * da,
                )
            } else {
                (0.0, 0.0)
            };
            out[(i, j)] = [rate.src, mx, my];

            if let (Some(params), Some(stand)) = (self.forest.as_ref(), forest.as_deref_mut()) {
                let load = TreeLoad {
                    h,
                    s,
                    hs: if self.erosion_active { bed.b[(i, j)] } else { 1.0 },
                    cos_th,
                };
                stand.update_cell(i, j, &load, params, self.g, self.rho, dt);
            }
        }
    }
}
