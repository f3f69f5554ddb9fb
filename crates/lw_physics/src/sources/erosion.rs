// crates/lw_physics/src/sources/erosion.rs

//! 侵蚀（卷吸）模型
//!
//! 质量源项 `src`（面积积分，m³/s）的四种模型：
//!
//! | 模型 | 源项 | 条件 |
//! |------|------|------|
//! | Ramms | `k_erod·s·dA` | `h > h_min`, `s > 1 m/s` |
//! | Tjem | `max(0, τ_b − τ_c,loc)·dA/s` | `s > 10 u_min`, `h > 10 h_min` |
//! | AvaFrame | `s·dA/τ_c·(μ g_z h + k s²)` | `h > h_min`, `s > 1 m/s` |
//! | Goem | `σ·√dp·dA·cos α` | 无 |
//!
//! 其中 `τ_c,loc = τ_c + μ_s·g_z·h`。Tjem 在仍有床层时把用于动量源项的
//! τ_b 下限提升至 τ_c,loc。
//!
//! 源项在输运步内还要经过 [`limit_mass_source`] 限幅：侵蚀不超过当前步
//! 可用的床层质量，沉积不超过单元现有质量。

use lw_config::ErosionKind;
use lw_foundation::Grid2;

use crate::terrain::TerrainGeometry;
use crate::types::SimParams;

/// Ramms/AvaFrame 的起始速度 [m/s]
const ENTRAINMENT_SPEED_MIN: f64 = 1.0;

/// Goem 中流向坡角计算的速度下限 [m/s]
const GOEM_SPEED_FLOOR: f64 = 0.01;

/// 侵蚀模型（配置时确定，每单元每步分派一次）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ErosionModel {
    /// 无侵蚀
    None,
    /// 速率型
    Ramms {
        /// 侵蚀系数
        k_erod: f64,
    },
    /// 强度超额型
    Tjem,
    /// 能量型（τ_c 表示比侵蚀能）
    AvaFrame,
    /// 压力型
    Goem {
        /// 拖曳对超压的贡献系数
        k_erod: f64,
        /// 1/√(ρ/ρ_b − 1)
        sigma: f64,
    },
}

/// 单元侵蚀输入
#[derive(Debug, Clone, Copy, Default)]
pub struct ErosionCell {
    /// 流深
    pub h: f64,
    /// 速率
    pub s: f64,
    /// x 向速度
    pub u: f64,
    /// y 向速度
    pub v: f64,
    /// 法向重力
    pub gz: f64,
    /// 斜面积
    pub da: f64,
    /// 非对角度量项
    pub g_xy: f64,
    /// 床层强度（已缩放）
    pub tau_c: f64,
    /// 床层摩擦系数
    pub mu_s: f64,
    /// 单元干摩擦系数（不含森林）
    pub mu: f64,
    /// 单元拖曳系数（不含森林）
    pub k: f64,
    /// 床层剩余深度
    pub b: f64,
    /// 床层表面梯度 (∂b/∂x, ∂b/∂y)，仅 Goem 使用
    pub bed_gradient: (f64, f64),
}

/// 侵蚀结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErosionRate {
    /// 质量源项 [m³/s]
    pub src: f64,
    /// 用于动量源项的床面剪应力
    pub tau_b: f64,
}

impl ErosionModel {
    /// 由运行参数选择
    pub fn from_params(params: &SimParams) -> Self {
        match params.erosion {
            ErosionKind::None => Self::None,
            ErosionKind::Ramms => Self::Ramms { k_erod: params.k_erod },
            ErosionKind::Tjem => Self::Tjem,
            ErosionKind::AvaFrame => Self::AvaFrame,
            ErosionKind::Goem => Self::Goem {
                k_erod: params.k_erod,
                sigma: params.sigma,
            },
        }
    }

    /// 是否需要床层梯度
    #[inline]
    pub fn needs_bed_gradient(&self) -> bool {
        matches!(self, Self::Goem { .. })
    }

    /// 计算质量源项，并返回可能被修正的 τ_b
    pub fn evaluate(&self, cell: &ErosionCell, tau_b: f64, h_min: f64, u_min: f64) -> ErosionRate {
        let c = cell;
        match *self {
            Self::None => ErosionRate { src: 0.0, tau_b },
            Self::Ramms { k_erod } => {
                let src = if c.h > h_min && c.s > ENTRAINMENT_SPEED_MIN {
                    k_erod * c.s * c.da
                } else {
                    0.0
                };
                ErosionRate { src, tau_b }
            }
            Self::Tjem => {
                let tau_c_loc = c.tau_c + c.mu_s * c.gz * c.h;
                let src = if c.s > 10.0 * u_min && c.h > 10.0 * h_min {
                    (tau_b - tau_c_loc).max(0.0) * c.da / c.s
                } else {
                    0.0
                };
                let tau_b = if src > 0.0 && c.b > 0.0 {
                    tau_b.max(tau_c_loc)
                } else {
                    tau_b
                };
                ErosionRate { src, tau_b }
            }
            Self::AvaFrame => {
                let src = if c.h > h_min && c.s > ENTRAINMENT_SPEED_MIN {
                    c.s * c.da / c.tau_c * (c.mu * c.gz * c.h + c.k * c.s * c.s)
                } else {
                    0.0
                };
                ErosionRate { src, tau_b }
            }
            Self::Goem { k_erod, sigma } => {
                let (dbdx, dbdy) = c.bed_gradient;
                let tan_a = ((c.u + c.v * c.g_xy) * dbdx + (c.v + c.u * c.g_xy) * dbdy)
                    / c.s.max(GOEM_SPEED_FLOOR);
                let cos_a = 1.0 / (1.0 + tan_a * tan_a).sqrt();
                let sin_a = tan_a * cos_a;
                let dp = (c.gz * c.h * cos_a + k_erod * c.s * c.s * sin_a - c.tau_c).max(0.0);
                ErosionRate {
                    src: sigma * dp.sqrt() * c.da * cos_a,
                    tau_b,
                }
            }
        }
    }
}

/// 床层表面梯度（内部中心差分，边界单侧差分）
pub fn bed_gradient(b: &Grid2<f64>, geom: &TerrainGeometry, i: usize, j: usize) -> (f64, f64) {
    let (m, n) = b.shape();
    let dbdx = if i > 0 && i < m - 1 {
        0.5 * (b[(i + 1, j)] - b[(i - 1, j)]) / geom.dx[(i, j)]
    } else if i == 0 {
        (b[(1, j)] - b[(0, j)]) / geom.dx[(0, j)]
    } else {
        (b[(m - 1, j)] - b[(m - 2, j)]) / geom.dx[(m - 2, j)]
    };
    let dbdy = if j > 0 && j < n - 1 {
        0.5 * (b[(i, j + 1)] - b[(i, j - 1)]) / geom.dy[(i, j)]
    } else if j == 0 {
        (b[(i, 1)] - b[(i, 0)]) / geom.dy[(i, 0)]
    } else {
        (b[(i, n - 1)] - b[(i, n - 2)]) / geom.dy[(i, n - 2)]
    };
    (dbdx, dbdy)
}

/// 储库换算参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReservoirRates {
    /// ρ / ρ_b
    pub rrb: f64,
    /// ρ / ρ_d
    pub rrd: f64,
    /// 侵蚀是否启用
    pub erosion: bool,
    /// 沉积是否启用
    pub deposition: bool,
}

impl ReservoirRates {
    /// 由运行参数构造
    pub fn from_params(params: &SimParams) -> Self {
        Self {
            rrb: params.rrb,
            rrd: params.rrd,
            erosion: params.erosion_active(),
            deposition: params.deposition,
        }
    }
}

/// 质量源项限幅并同步更新储库，返回限幅后的源项
///
/// - 侵蚀（`src > 0`）：`src ≤ b·dA/(rrb·dt)`，`b ← max(0, b − src·rrb·dt/dA)`
/// - 沉积（`src < 0`）：`src ≥ −f_old/dt`，`d ← d − src·rrd·dt/dA`
/// - 其余情况源项为零
pub fn limit_mass_source(
    src: f64,
    b: &mut f64,
    d: &mut f64,
    f_old: f64,
    da: f64,
    rates: &ReservoirRates,
    dt: f64,
) -> f64 {
    if rates.erosion && src > 0.0 {
        let limited = src.min(*b * da / (rates.rrb * dt));
        *b = (*b - limited * rates.rrb * dt / da).max(0.0);
        limited
    } else if rates.deposition && src < 0.0 {
        let limited = src.max(-f_old / dt);
        *d -= limited * rates.rrd * dt / da;
        limited
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell() -> ErosionCell {
        ErosionCell {
            h: 1.0,
            s: 10.0,
            u: 10.0,
            v: 0.0,
            gz: 9.0,
            da: 100.0,
            tau_c: 2.0,
            mu_s: 0.1,
            mu: 0.2,
            k: 0.003,
            b: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_ramms_threshold() {
        let model = ErosionModel::Ramms { k_erod: 0.001 };
        let r = model.evaluate(&cell(), 2.1, 0.05, 0.01);
        assert!((r.src - 0.001 * 10.0 * 100.0).abs() < 1e-12);

        let slow = ErosionCell { s: 0.5, ..cell() };
        assert_eq!(model.evaluate(&slow, 2.1, 0.05, 0.01).src, 0.0);
    }

    #[test]
    fn test_tjem_clamps_bed_stress() {
        // τ_c,loc = 2 + 0.1·9·1 = 2.9
        let model = ErosionModel::Tjem;
        let r = model.evaluate(&cell(), 5.0, 0.05, 0.01);
        assert!((r.src - (5.0 - 2.9) * 100.0 / 10.0).abs() < 1e-12);
        assert!((r.tau_b - 5.0).abs() < 1e-12);

        let r = model.evaluate(&cell(), 2.0, 0.05, 0.01);
        assert_eq!(r.src, 0.0);
        assert_eq!(r.tau_b, 2.0);
    }

    #[test]
    fn test_avaframe_energy() {
        let r = ErosionModel::AvaFrame.evaluate(&cell(), 0.0, 0.05, 0.01);
        let expected = 10.0 * 100.0 / 2.0 * (0.2 * 9.0 * 1.0 + 0.003 * 100.0);
        assert!((r.src - expected).abs() < 1e-9);
    }

    #[test]
    fn test_goem_flat_bed() {
        // 床层平整时 cos α = 1，dp = g_z h − τ_c
        let model = ErosionModel::Goem { k_erod: 0.5, sigma: 2.0 };
        let r = model.evaluate(&cell(), 0.0, 0.05, 0.01);
        assert!((r.src - 2.0 * (9.0_f64 - 2.0).sqrt() * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_erosion_rate_limited_by_bed() {
        let rates = ReservoirRates { rrb: 1.25, rrd: 1.25, erosion: true, deposition: false };
        let (mut b, mut d) = (0.2, 0.0);
        let (da, dt) = (100.0, 0.1);
        let src = limit_mass_source(1.0e6, &mut b, &mut d, 50.0, da, &rates, dt);
        assert!((src - 0.2 * da / (1.25 * dt)).abs() < 1e-9);
        assert_eq!(b, 0.0);
        assert_eq!(d, 0.0);
    }

    #[test]
    fn test_deposition_rate_limited_by_mass() {
        let rates = ReservoirRates { rrb: 1.25, rrd: 2.0, erosion: false, deposition: true };
        let (mut b, mut d) = (0.0, 0.0);
        let src = limit_mass_source(-1.0e3, &mut b, &mut d, 5.0, 10.0, &rates, 0.5);
        assert!((src + 10.0).abs() < 1e-12);
        assert!((d - 10.0 * 2.0 * 0.5 / 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_source_zeroed_without_switch() {
        let rates = ReservoirRates { rrb: 1.0, rrd: 1.0, erosion: false, deposition: false };
        let (mut b, mut d) = (1.0, 0.0);
        assert_eq!(limit_mass_source(3.0, &mut b, &mut d, 1.0, 1.0, &rates, 1.0), 0.0);
        assert_eq!(b, 1.0);
    }
}
