// crates/lw_physics/src/material.rs

//! 材料场与床层储库
//!
//! 材料场在初始化时一次性建立，运行中只读；床层 `b` 与沉积 `d`
//! 由侵蚀/沉积逐步修改。

use lw_foundation::Grid2;

/// 摩擦与床层强度材料场
#[derive(Debug, Clone)]
pub struct MaterialFields {
    /// 干摩擦系数 μ
    pub mu: Grid2<f64>,
    /// 湍流拖曳系数 k
    pub k: Grid2<f64>,
    /// 床层摩擦系数 μ_s
    pub mu_s: Grid2<f64>,
    /// 按 ρ 缩放的床层强度 τ_c [m²/s²]
    pub tau_c: Grid2<f64>,
}

impl MaterialFields {
    /// 常数摩擦，无床层强度
    pub fn uniform(m: usize, n: usize, mu: f64, k: f64) -> Self {
        Self {
            mu: Grid2::new(m, n, mu),
            k: Grid2::new(m, n, k),
            mu_s: Grid2::new(m, n, 0.0),
            tau_c: Grid2::new(m, n, 0.0),
        }
    }
}

/// 可侵蚀床层与沉积储库
#[derive(Debug, Clone, PartialEq)]
pub struct BedReservoirs {
    /// 可侵蚀床层深度 [m]
    pub b: Grid2<f64>,
    /// 沉积深度 [m]
    pub d: Grid2<f64>,
}

impl BedReservoirs {
    /// 空储库
    pub fn empty(m: usize, n: usize) -> Self {
        Self {
            b: Grid2::new(m, n, 0.0),
            d: Grid2::new(m, n, 0.0),
        }
    }

    /// 以给定床层深度初始化，沉积为零
    pub fn with_bed(b: Grid2<f64>) -> Self {
        let (m, n) = b.shape();
        Self {
            b,
            d: Grid2::new(m, n, 0.0),
        }
    }

    /// 整体复制
    pub fn copy_from(&mut self, other: &BedReservoirs) {
        self.b.copy_from(&other.b);
        self.d.copy_from(&other.d);
    }
}
