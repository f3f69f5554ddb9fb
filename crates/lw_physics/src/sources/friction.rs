// crates/lw_physics/src/sources/friction.rs

//! Voellmy 摩擦
//!
//! 床面剪应力（已除以 ρ）：
//!
//! ```text
//! τ_b = μ·g_z·h + k·s²
//! ```
//!
//! 摩擦参数由两个独立开关决定：常数/逐单元系数，以及是否叠加森林阻力。
//! 森林阻力按局部不透明度 × 流深增大两个系数：
//!
//! ```text
//! μ += 1.25·cosθ·nD·h
//! k += 0.5·c_D·cosθ·nD·h
//! ```

use lw_config::FrictionParams;

use crate::material::MaterialFields;

/// 摩擦系数来源变体，配置时确定
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrictionVariant {
    /// 全场常数
    Constant {
        /// 干摩擦系数
        mu: f64,
        /// 拖曳系数
        k: f64,
    },
    /// 全场常数 + 森林
    ConstantForest {
        /// 干摩擦系数
        mu: f64,
        /// 拖曳系数
        k: f64,
        /// 树干拖曳系数
        cd: f64,
    },
    /// 逐单元系数
    Variable,
    /// 逐单元系数 + 森林
    VariableForest {
        /// 树干拖曳系数
        cd: f64,
    },
}

impl FrictionVariant {
    /// 由摩擦参数和森林拖曳系数选择变体
    pub fn select(params: FrictionParams, forest_cd: Option<f64>) -> Self {
        match (params, forest_cd) {
            (FrictionParams::Constant { mu, k }, None) => Self::Constant { mu, k },
            (FrictionParams::Constant { mu, k }, Some(cd)) => Self::ConstantForest { mu, k, cd },
            (FrictionParams::Variable, None) => Self::Variable,
            (FrictionParams::Variable, Some(cd)) => Self::VariableForest { cd },
        }
    }

    /// 局部摩擦系数 `(μ, k)`
    ///
    /// `nd` 为单元森林不透明度（无森林时忽略），`cos_th = cs²/dA`。
    #[inline]
    pub fn coefficients(
        &self,
        mat: &MaterialFields,
        i: usize,
        j: usize,
        h: f64,
        nd: f64,
        cos_th: f64,
    ) -> (f64, f64) {
        match *self {
            Self::Constant { mu, k } => (mu, k),
            Self::ConstantForest { mu, k, cd } => forest_augmented(mu, k, cd, nd, h, cos_th),
            Self::Variable => (mat.mu[(i, j)], mat.k[(i, j)]),
            Self::VariableForest { cd } => {
                forest_augmented(mat.mu[(i, j)], mat.k[(i, j)], cd, nd, h, cos_th)
            }
        }
    }

    /// 是否包含森林阻力
    pub fn has_forest(&self) -> bool {
        matches!(self, Self::ConstantForest { .. } | Self::VariableForest { .. })
    }
}

#[inline]
fn forest_augmented(mu: f64, k: f64, cd: f64, nd: f64, h: f64, cos_th: f64) -> (f64, f64) {
    let load = cos_th * nd * h;
    (mu + 1.25 * load, k + 0.5 * cd * load)
}

/// 有效最大拖曳深度修正
///
/// `h → 0` 时不变，`h → ∞` 时拖曳减速趋于 `h = h_drag` 时的值。
/// `h_drag <= 0` 时返回原系数。
#[inline]
pub fn drag_depth_correction(k: f64, h: f64, h_drag: f64, h_min: f64) -> f64 {
    if h_drag > 0.0 {
        k / (1.0 - (-h_drag / h.max(h_min)).exp())
    } else {
        k
    }
}

/// 床面剪应力 τ_b = μ·g_z·h + k·s²
#[inline]
pub fn bed_shear_stress(mu: f64, k: f64, gz: f64, h: f64, s: f64) -> f64 {
    mu * gz * h + k * s * s
}
