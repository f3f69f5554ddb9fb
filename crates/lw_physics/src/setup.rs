// crates/lw_physics/src/setup.rs

//! 初始状态构建
//!
//! [`SimulationBuilder`] 把已读入的栅格（[`SiteData`]）与运行参数组装为
//! [`Simulation`]，顺序如下：
//!
//! 1. 由原始地形建立几何
//! 2. 侵蚀：读入床层深度，释放区内置零
//! 3. 需要强度的侵蚀模型：床层强度按密度缩放，床层摩擦取栅格或常数
//! 4. 非续算时把释放体嵌入地表并重建几何
//! 5. 摩擦系数：常数填充或栅格
//! 6. 森林：不透明度换算到斜面
//! 7. 守恒量 `f = (h dA, h dA u, h dA v)`

use lw_config::{BedStrengthProfile, FrictionParams};
use lw_foundation::{Grid2, GridFrame, LwError, LwResult};
use tracing::info;

use crate::engine::Simulation;
use crate::material::{BedReservoirs, MaterialFields};
use crate::sources::ForestStand;
use crate::state::ConservedState;
use crate::terrain::TerrainGeometry;
use crate::types::SimParams;

/// 输入栅格集合（均与 `frame` 对齐）
#[derive(Debug, Clone)]
pub struct SiteData {
    /// 栅格参照
    pub frame: GridFrame,
    /// 地形高程 [m]
    pub elevation: Grid2<f64>,
    /// 释放深度 [m]
    pub release_depth: Grid2<f64>,
    /// 初始速度 (u, v)，给出即为续算
    pub start_velocity: Option<(Grid2<f64>, Grid2<f64>)>,
    /// 可侵蚀床层深度 [m]
    pub bed_depth: Option<Grid2<f64>>,
    /// 床层强度 [Pa]
    pub bed_strength: Option<Grid2<f64>>,
    /// 床层摩擦系数
    pub bed_friction: Option<Grid2<f64>>,
    /// 干摩擦系数
    pub dry_friction: Option<Grid2<f64>>,
    /// 湍流拖曳系数
    pub turbulent_drag: Option<Grid2<f64>>,
    /// 投影森林不透明度 [1/m]
    pub forest_density: Option<Grid2<f64>>,
    /// 树干直径 [m]
    pub tree_diameter: Option<Grid2<f64>>,
}

impl SiteData {
    /// 仅含必需栅格
    pub fn new(frame: GridFrame, elevation: Grid2<f64>, release_depth: Grid2<f64>) -> Self {
        Self {
            frame,
            elevation,
            release_depth,
            start_velocity: None,
            bed_depth: None,
            bed_strength: None,
            bed_friction: None,
            dry_friction: None,
            turbulent_drag: None,
            forest_density: None,
            tree_diameter: None,
        }
    }

    /// 是否为续算
    pub fn is_restart(&self) -> bool {
        self.start_velocity.is_some()
    }

    fn check_shapes(&self) -> LwResult<()> {
        let (m, n) = (self.frame.m, self.frame.n);
        let check = |name: &'static str, g: &Grid2<f64>| {
            if g.has_shape(m, n) {
                Ok(())
            } else {
                Err(LwError::size_mismatch(name, m * n, g.len()))
            }
        };
        check("elevation", &self.elevation)?;
        check("release depth", &self.release_depth)?;
        if let Some((u, v)) = &self.start_velocity {
            check("start velocity u", u)?;
            check("start velocity v", v)?;
        }
        let optional = [
            ("bed depth", &self.bed_depth),
            ("bed strength", &self.bed_strength),
            ("bed friction", &self.bed_friction),
            ("dry friction", &self.dry_friction),
            ("turbulent drag", &self.turbulent_drag),
            ("forest density", &self.forest_density),
            ("tree diameter", &self.tree_diameter),
        ];
        for (name, grid) in optional {
            if let Some(g) = grid {
                check(name, g)?;
            }
        }
        Ok(())
    }
}

/// 模拟构建器
#[derive(Debug, Clone)]
pub struct SimulationBuilder {
    params: SimParams,
    site: SiteData,
}

impl SimulationBuilder {
    /// 创建构建器
    pub fn new(params: SimParams, site: SiteData) -> Self {
        Self { params, site }
    }

    /// 建立初始状态
    pub fn build(self) -> LwResult<Simulation> {
        self.site.check_shapes()?;
        let params = self.params;
        let SiteData {
            frame,
            elevation,
            release_depth: h,
            start_velocity,
            bed_depth,
            bed_strength,
            bed_friction,
            dry_friction,
            turbulent_drag,
            forest_density,
            tree_diameter,
        } = self.site;
        let (m, n) = (frame.m, frame.n);
        let cs = frame.cellsize;
        let g = params.g;
        let restart = start_velocity.is_some();

        let mut geom = TerrainGeometry::build(&elevation, cs, g)?;

        // 床层：释放区内无可侵蚀雪
        let bed = if params.erosion_active() {
            let mut b = bed_depth.ok_or(LwError::missing_field("bed_depth"))?;
            for i in 0..m {
                for j in 0..n {
                    if h[(i, j)] > 0.0 {
                        b[(i, j)] = 0.0;
                    }
                }
            }
            BedReservoirs::with_bed(b)
        } else {
            BedReservoirs::empty(m, n)
        };

        let mut mat = MaterialFields::uniform(m, n, 0.0, 0.0);
        if params.erosion.needs_bed_strength() {
            let tau = bed_strength.ok_or(LwError::missing_field("bed_strength"))?;
            mat.tau_c = tau.map(|&t| params.scale_bed_strength(t));
            mat.mu_s = match params.bed_strength {
                BedStrengthProfile::Local => {
                    bed_friction.ok_or(LwError::missing_field("bed_friction"))?
                }
                profile => Grid2::new(m, n, profile.uniform_mu_s().unwrap_or(0.0)),
            };
        }

        // 释放体嵌入地表
        let mut z0 = elevation;
        if !restart {
            for i in 0..m {
                for j in 0..n {
                    let lift = if params.erosion_active() {
                        bed.b[(i, j)] - h[(i, j)]
                    } else {
                        -h[(i, j)]
                    };
                    z0[(i, j)] += lift * geom.gz[(i, j)] / g;
                }
            }
            geom.update(&z0)?;
        }

        match params.friction {
            FrictionParams::Constant { mu, k } => {
                mat.mu.fill(mu);
                mat.k.fill(k);
            }
            FrictionParams::Variable => {
                mat.mu = dry_friction.ok_or(LwError::missing_field("dry_friction"))?;
                mat.k = turbulent_drag.ok_or(LwError::missing_field("turbulent_drag"))?;
            }
        }

        let forest = match params.forest {
            Some(_) => {
                let mut nd = forest_density.ok_or(LwError::missing_field("forest_density"))?;
                for i in 0..m {
                    for j in 0..n {
                        nd[(i, j)] *= geom.cos_theta(i, j);
                    }
                }
                let td = tree_diameter.ok_or(LwError::missing_field("tree_diameter"))?;
                Some(ForestStand::new(nd, td)?)
            }
            None => None,
        };

        let (u, v) = start_velocity
            .unwrap_or_else(|| (Grid2::new(m, n, 0.0), Grid2::new(m, n, 0.0)));
        let state = ConservedState::from_primitives(&h, &u, &v, &geom)?;

        info!(
            m,
            n,
            cellsize = cs,
            volume = state.total_mass(),
            restart,
            erosion = ?params.erosion,
            "初始状态已建立"
        );

        Ok(Simulation::assemble(params, geom, z0, state, mat, bed, forest))
    }
}
