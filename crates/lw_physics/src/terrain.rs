// crates/lw_physics/src/terrain.rs

//! 地形几何
//!
//! 由高程场导出每个单元的度量量：斜边长、斜面积、切向/法向重力分量、
//! 第二基本形式系数和归一化的非对角度量项。
//!
//! 坡度采用中心差分，四条边界上采用单侧差分；曲率为二阶中心差分，
//! 边界上取零。高程变化时必须整体重建（[`TerrainGeometry::update`]）。
//!
//! ```text
//! ax = √(1+Zx²)   ay = √(1+Zy²)   q = 1+Zx²+Zy²
//! dx = cs·ax      dy = cs·ay      dA = cs²·√q
//! gx = −g·Zx·ax/q gy = −g·Zy·ay/q gz0 = g/√q
//! G_xy = Zx·Zy/(ax·ay)
//! ```

use lw_foundation::{Grid2, IndexWindow, LwError, LwResult};

/// 曲率修正分母下限
const CURVATURE_DENOM_MIN: f64 = 1e-4;

/// 单元几何
#[derive(Debug, Clone)]
pub struct TerrainGeometry {
    m: usize,
    n: usize,
    cellsize: f64,
    g: f64,
    /// 西→东斜边长 [m]
    pub dx: Grid2<f64>,
    /// 南→北斜边长 [m]
    pub dy: Grid2<f64>,
    /// 斜面积 [m²]
    pub da: Grid2<f64>,
    /// 切向重力 x 分量
    pub gx: Grid2<f64>,
    /// 切向重力 y 分量
    pub gy: Grid2<f64>,
    /// 法向重力（不含曲率）
    pub gz0: Grid2<f64>,
    /// 法向重力（可能含曲率修正）
    pub gz: Grid2<f64>,
    /// 归一化非对角度量项（x、y 方向夹角余弦）
    pub g_xy: Grid2<f64>,
    /// 第二基本形式 II_xx
    pub ii_xx: Grid2<f64>,
    /// 第二基本形式 II_yy
    pub ii_yy: Grid2<f64>,
    /// 第二基本形式 II_xy
    pub ii_xy: Grid2<f64>,
}

impl TerrainGeometry {
    /// 由高程场构建
    pub fn build(z: &Grid2<f64>, cellsize: f64, g: f64) -> LwResult<Self> {
        let (m, n) = z.shape();
        if m < 2 || n < 2 {
            return Err(LwError::invalid_input(format!(
                "网格至少需要 2×2 个单元，实际 {m}×{n}"
            )));
        }
        if !(cellsize > 0.0) {
            return Err(LwError::out_of_range("cellsize", cellsize, f64::MIN_POSITIVE, f64::MAX));
        }

        let zero = Grid2::new(m, n, 0.0);
        let mut geom = Self {
            m,
            n,
            cellsize,
            g,
            dx: zero.clone(),
            dy: zero.clone(),
            da: zero.clone(),
            gx: zero.clone(),
            gy: zero.clone(),
            gz0: zero.clone(),
            gz: zero.clone(),
            g_xy: zero.clone(),
            ii_xx: zero.clone(),
            ii_yy: zero.clone(),
            ii_xy: zero,
        };
        geom.update(z)?;
        Ok(geom)
    }

    /// 按新的高程场重建全部几何量（`gz` 重置为 `gz0`）
    pub fn update(&mut self, z: &Grid2<f64>) -> LwResult<()> {
        if !z.has_shape(self.m, self.n) {
            return Err(LwError::size_mismatch("elevation", self.m * self.n, z.len()));
        }

        let (m, n) = (self.m, self.n);
        let cs = self.cellsize;
        let cs2 = cs * cs;
        let g = self.g;

        for i in 0..m {
            for j in 0..n {
                let zx = if i == 0 {
                    (z[(1, j)] - z[(0, j)]) / cs
                } else if i == m - 1 {
                    (z[(m - 1, j)] - z[(m - 2, j)]) / cs
                } else {
                    0.5 * (z[(i + 1, j)] - z[(i - 1, j)]) / cs
                };
                let zy = if j == 0 {
                    (z[(i, 1)] - z[(i, 0)]) / cs
                } else if j == n - 1 {
                    (z[(i, n - 1)] - z[(i, n - 2)]) / cs
                } else {
                    0.5 * (z[(i, j + 1)] - z[(i, j - 1)]) / cs
                };

                let ax = (1.0 + zx * zx).sqrt();
                let ay = (1.0 + zy * zy).sqrt();
                let q = 1.0 + zx * zx + zy * zy;
                let sq = q.sqrt();

                self.dx[(i, j)] = cs * ax;
                self.dy[(i, j)] = cs * ay;
                self.gx[(i, j)] = -g * zx * ax / q;
                self.gy[(i, j)] = -g * zy * ay / q;
                self.gz0[(i, j)] = g / sq;
                self.gz[(i, j)] = g / sq;
                self.da[(i, j)] = cs2 * sq;
                self.g_xy[(i, j)] = zx * zy / (ax * ay);

                let i_edge = i == 0 || i == m - 1;
                let j_edge = j == 0 || j == n - 1;
                let zxx = if i_edge {
                    0.0
                } else {
                    (z[(i + 1, j)] + z[(i - 1, j)] - 2.0 * z[(i, j)]) / cs2
                };
                let zyy = if j_edge {
                    0.0
                } else {
                    (z[(i, j + 1)] + z[(i, j - 1)] - 2.0 * z[(i, j)]) / cs2
                };
                let zxy = if i_edge || j_edge {
                    0.0
                } else {
                    (z[(i + 1, j + 1)] + z[(i - 1, j - 1)] - z[(i + 1, j - 1)] - z[(i - 1, j + 1)])
                        / (4.0 * cs2)
                };
                self.ii_xx[(i, j)] = zxx / sq;
                self.ii_yy[(i, j)] = zyy / sq;
                self.ii_xy[(i, j)] = zxy / sq;
            }
        }
        Ok(())
    }

    /// 在活动区域内按当前速度修正法向重力
    ///
    /// `gz = max(0, gz0 + (IIxx U² + IIyy V² + 2 IIxy U V) / max(1e-4, U² + V² + 2 G_xy U V))`，
    /// 下限 0 防止凸地形上的脱离。
    pub fn apply_curvature(&mut self, u: &Grid2<f64>, v: &Grid2<f64>, window: &IndexWindow) {
        for (i, j) in window.cells() {
            let (uu, vv) = (u[(i, j)], v[(i, j)]);
            let num = self.ii_xx[(i, j)] * uu * uu
                + self.ii_yy[(i, j)] * vv * vv
                + 2.0 * self.ii_xy[(i, j)] * uu * vv;
            let den = (uu * uu + vv * vv + 2.0 * self.g_xy[(i, j)] * uu * vv).max(CURVATURE_DENOM_MIN);
            self.gz[(i, j)] = (self.gz0[(i, j)] + num / den).max(0.0);
        }
    }

    /// 网格形状
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.m, self.n)
    }

    /// 水平投影网格尺寸
    #[inline]
    pub fn cellsize(&self) -> f64 {
        self.cellsize
    }

    /// 重力加速度
    #[inline]
    pub fn gravity(&self) -> f64 {
        self.g
    }

    /// 投影面积与斜面积之比 cos θ = cs² / dA
    #[inline]
    pub fn cos_theta(&self, i: usize, j: usize) -> f64 {
        self.cellsize * self.cellsize / self.da[(i, j)]
    }

    /// 全网格窗口
    #[inline]
    pub fn full_window(&self) -> IndexWindow {
        IndexWindow::full(self.m, self.n)
    }
}
