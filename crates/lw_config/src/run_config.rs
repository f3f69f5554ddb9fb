// crates/lw_config/src/run_config.rs

//! RunConfig - 单次模拟运行的完整配置
//!
//! JSON 文档，分为五个部分：
//!
//! - `run`: 运行名称与研究区域
//! - `inputs`: 输入栅格路径
//! - `physics`: 物理参数与模型选择
//! - `numerics`: 数值参数
//! - `output`: 输出控制
//!
//! 加载流程为 解析 → [`RunConfig::normalize`] → [`RunConfig::validate`]，
//! 任何验证失败都在积分开始前终止运行。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::ConfigError;

/// 运行配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunConfig {
    /// 运行信息
    #[serde(default)]
    pub run: RunSection,

    /// 输入栅格
    #[serde(default)]
    pub inputs: InputPaths,

    /// 物理参数
    #[serde(default)]
    pub physics: PhysicsConfig,

    /// 数值参数
    #[serde(default)]
    pub numerics: NumericsConfig,

    /// 输出控制
    #[serde(default)]
    pub output: OutputConfig,
}

// ============================================================
// run
// ============================================================

/// 运行信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    /// 运行名称，同时作为输出文件名前缀
    #[serde(default = "default_run_name")]
    pub name: String,

    /// 研究区域描述
    #[serde(default)]
    pub area_of_interest: String,
}

fn default_run_name() -> String { "result".to_string() }

impl Default for RunSection {
    fn default() -> Self {
        Self {
            name: default_run_name(),
            area_of_interest: String::new(),
        }
    }
}

// ============================================================
// inputs
// ============================================================

/// 输入栅格路径
///
/// 除 `grid` 与 `release_depth` 外均可缺省，是否必需由物理配置决定。
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct InputPaths {
    /// 地形高程
    #[serde(default)]
    pub grid: PathBuf,

    /// 释放区深度
    #[serde(default)]
    pub release_depth: PathBuf,

    /// 初始 x 向速度（存在即视为续算，不嵌入释放体）
    #[serde(default)]
    pub start_velocity_u: Option<PathBuf>,

    /// 初始 y 向速度
    #[serde(default)]
    pub start_velocity_v: Option<PathBuf>,

    /// 可侵蚀床层深度
    #[serde(default)]
    pub bed_depth: Option<PathBuf>,

    /// 床层剪切强度 [Pa]
    #[serde(default)]
    pub bed_strength: Option<PathBuf>,

    /// 床层摩擦系数（Local 剖面）
    #[serde(default)]
    pub bed_friction: Option<PathBuf>,

    /// 干摩擦系数（Variable 摩擦参数）
    #[serde(default)]
    pub dry_friction: Option<PathBuf>,

    /// 湍流拖曳系数（Variable 摩擦参数）
    #[serde(default)]
    pub turbulent_drag: Option<PathBuf>,

    /// 森林不透明度 n·D [1/m]
    #[serde(default)]
    pub forest_density: Option<PathBuf>,

    /// 平均树干直径 [m]
    #[serde(default)]
    pub tree_diameter: Option<PathBuf>,
}

impl InputPaths {
    /// 是否给出了初始速度（续算）
    pub fn is_restart(&self) -> bool {
        self.start_velocity_u.is_some() || self.start_velocity_v.is_some()
    }

    fn resolve_against(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };
        join(&mut self.grid);
        join(&mut self.release_depth);
        for p in [
            &mut self.start_velocity_u,
            &mut self.start_velocity_v,
            &mut self.bed_depth,
            &mut self.bed_strength,
            &mut self.bed_friction,
            &mut self.dry_friction,
            &mut self.turbulent_drag,
            &mut self.forest_density,
            &mut self.tree_diameter,
        ]
        .into_iter()
        .flatten()
        {
            join(p);
        }
    }
}

// ============================================================
// physics
// ============================================================

/// 流变模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Rheology {
    /// Voellmy 摩擦律：τ = μ·g_z·h + k·s²
    #[default]
    Voellmy,
}

/// 摩擦参数来源
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FrictionParams {
    /// 全场常数
    Constant {
        /// 干摩擦系数
        mu: f64,
        /// 湍流拖曳系数
        k: f64,
    },
    /// 由 `inputs.dry_friction` 与 `inputs.turbulent_drag` 栅格给出
    Variable,
}

impl Default for FrictionParams {
    fn default() -> Self {
        Self::Constant { mu: 0.25, k: 0.005 }
    }
}

/// 侵蚀模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ErosionKind {
    /// 无侵蚀
    #[default]
    None,
    /// 速率型（与速度成正比）
    Ramms,
    /// 强度超额型（切向跳跃）
    Tjem,
    /// 能量型
    #[serde(alias = "AvaFrame", alias = "AVAFRAME")]
    AvaFrame,
    /// 压力型（Grigorian–Ostroumov）
    Goem,
}

impl ErosionKind {
    /// 是否启用侵蚀
    pub fn is_active(self) -> bool {
        !matches!(self, Self::None)
    }

    /// 是否需要床层强度栅格
    pub fn needs_bed_strength(self) -> bool {
        matches!(self, Self::Tjem | Self::AvaFrame | Self::Goem)
    }

    /// 是否使用侵蚀系数
    pub fn uses_coefficient(self) -> bool {
        matches!(self, Self::Ramms | Self::AvaFrame | Self::Goem)
    }
}

/// 床层强度随深度的分布
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BedStrengthProfile {
    /// 强度不随深度变化
    Constant {
        /// 仅为兼容保留，归一化后恒为 0
        #[serde(default)]
        mu_s: f64,
    },
    /// 全场统一的床层摩擦系数
    Global {
        /// 床层摩擦系数
        mu_s: f64,
    },
    /// 由 `inputs.bed_friction` 栅格给出
    Local,
}

impl Default for BedStrengthProfile {
    fn default() -> Self {
        Self::Constant { mu_s: 0.0 }
    }
}

impl BedStrengthProfile {
    /// 常数床层摩擦系数（Local 返回 None）
    pub fn uniform_mu_s(&self) -> Option<f64> {
        match *self {
            Self::Constant { mu_s } | Self::Global { mu_s } => Some(mu_s),
            Self::Local => None,
        }
    }
}

/// 侵蚀配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ErosionConfig {
    /// 侵蚀模型
    #[serde(default)]
    pub model: ErosionKind,

    /// 侵蚀系数（Ramms/AvaFrame/Goem）
    #[serde(default)]
    pub coefficient: f64,

    /// 床层强度剖面
    #[serde(default)]
    pub bed_strength: BedStrengthProfile,
}

/// 森林配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// 是否考虑森林拖曳与破坏
    #[serde(default)]
    pub enabled: bool,

    /// 树干拖曳系数 c_D
    #[serde(default = "default_tree_drag")]
    pub tree_drag_coefficient: f64,

    /// 木材断裂模量 [MPa]
    #[serde(default = "default_modulus_of_rupture")]
    pub modulus_of_rupture_mpa: f64,

    /// 树木倒伏系数 [m/s]
    #[serde(default = "default_decay_coefficient")]
    pub decay_coefficient: f64,

    /// 破坏后残余不透明度 [1/m]
    #[serde(default = "default_residual_density")]
    pub residual_density: f64,
}

fn default_tree_drag() -> f64 { 1.0 }
fn default_modulus_of_rupture() -> f64 { 50.0 }
fn default_decay_coefficient() -> f64 { 0.1 }
fn default_residual_density() -> f64 { 0.001 }

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tree_drag_coefficient: default_tree_drag(),
            modulus_of_rupture_mpa: default_modulus_of_rupture(),
            decay_coefficient: default_decay_coefficient(),
            residual_density: default_residual_density(),
        }
    }
}

/// 物理参数配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhysicsConfig {
    /// 重力加速度 [m/s²]
    #[serde(default = "default_gravity")]
    pub gravity: f64,

    /// 流体密度 [kg/m³]
    #[serde(default = "default_flow_density")]
    pub flow_density: f64,

    /// 床层密度 [kg/m³]
    #[serde(default = "default_bed_density")]
    pub bed_density: f64,

    /// 沉积层密度 [kg/m³]
    #[serde(default = "default_bed_density")]
    pub deposit_density: f64,

    /// 流变模型
    #[serde(default)]
    pub rheology: Rheology,

    /// 摩擦参数
    #[serde(default)]
    pub friction: FrictionParams,

    /// 拖曳项有效最大深度 [m]，0 表示不启用
    #[serde(default)]
    pub effective_drag_depth: f64,

    /// 是否考虑曲率（离心）效应
    #[serde(default)]
    pub curvature: bool,

    /// 被动土压力系数
    #[serde(default = "default_earth_pressure")]
    pub earth_pressure_coefficient: f64,

    /// 森林
    #[serde(default)]
    pub forest: ForestConfig,

    /// 侵蚀
    #[serde(default)]
    pub erosion: ErosionConfig,

    /// 是否沉积
    #[serde(default)]
    pub deposition: bool,

    /// 是否随床层/沉积变化更新地表
    #[serde(default)]
    pub dynamic_surface: bool,
}

fn default_gravity() -> f64 { 9.81 }
fn default_flow_density() -> f64 { 250.0 }
fn default_bed_density() -> f64 { 200.0 }
fn default_earth_pressure() -> f64 { 1.0 }

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            flow_density: default_flow_density(),
            bed_density: default_bed_density(),
            deposit_density: default_bed_density(),
            rheology: Rheology::default(),
            friction: FrictionParams::default(),
            effective_drag_depth: 0.0,
            curvature: false,
            earth_pressure_coefficient: default_earth_pressure(),
            forest: ForestConfig::default(),
            erosion: ErosionConfig::default(),
            deposition: false,
            dynamic_surface: false,
        }
    }
}

// ============================================================
// numerics
// ============================================================

/// 数值参数配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericsConfig {
    /// 模拟时长 [s]
    #[serde(default = "default_t_max")]
    pub t_max: f64,

    /// 最小时间步长 [s]
    #[serde(default = "default_dt_min")]
    pub dt_min: f64,

    /// 最大时间步长 [s]
    #[serde(default = "default_dt_max")]
    pub dt_max: f64,

    /// CFL 数
    #[serde(default = "default_cfl")]
    pub cfl: f64,

    /// 最小流深 [m]
    #[serde(default = "default_h_min")]
    pub h_min: f64,

    /// 最小速度 [m/s]
    #[serde(default = "default_u_min")]
    pub u_min: f64,

    /// 停止判据：总动量阈值 [kg·m/s]
    #[serde(default = "default_momentum_threshold")]
    pub momentum_threshold: f64,

    /// 动量判据生效前的预热步数
    #[serde(default = "default_warmup_steps")]
    pub warmup_steps: usize,

    /// 出现负质量时的步长缩减因子
    #[serde(default = "default_retry_shrink")]
    pub retry_shrink: f64,
}

fn default_t_max() -> f64 { 1000.0 }
fn default_dt_min() -> f64 { 1e-4 }
fn default_dt_max() -> f64 { 0.2 }
fn default_cfl() -> f64 { 0.7 }
fn default_h_min() -> f64 { 0.05 }
fn default_u_min() -> f64 { 0.01 }
fn default_momentum_threshold() -> f64 { 1000.0 }
fn default_warmup_steps() -> usize { 10 }
fn default_retry_shrink() -> f64 { 0.8 }

impl Default for NumericsConfig {
    fn default() -> Self {
        Self {
            t_max: default_t_max(),
            dt_min: default_dt_min(),
            dt_max: default_dt_max(),
            cfl: default_cfl(),
            h_min: default_h_min(),
            u_min: default_u_min(),
            momentum_threshold: default_momentum_threshold(),
            warmup_steps: default_warmup_steps(),
            retry_shrink: default_retry_shrink(),
        }
    }
}

// ============================================================
// output
// ============================================================

/// 输出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// 输出根目录
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// 时间切片输出间隔 [s]
    #[serde(default = "default_output_interval")]
    pub interval: f64,

    /// 是否输出速度分量
    #[serde(default)]
    pub write_velocity: bool,

    /// 是否输出最大冲击压力
    #[serde(default)]
    pub write_max_pressure: bool,

    /// 是否输出瞬时冲击压力
    #[serde(default)]
    pub write_pressure: bool,
}

fn default_output_dir() -> PathBuf { PathBuf::from("output") }
fn default_output_interval() -> f64 { 1.0 }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            interval: default_output_interval(),
            write_velocity: false,
            write_max_pressure: false,
            write_pressure: false,
        }
    }
}

impl OutputConfig {
    /// 是否输出时间切片
    pub fn writes_slices(&self, t_max: f64) -> bool {
        t_max >= self.interval
    }
}

// ============================================================
// 加载 / 归一化 / 验证
// ============================================================

impl RunConfig {
    /// 从文件加载配置
    ///
    /// 相对路径以配置文件所在目录为基准解析。
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        let mut config = Self::from_json_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// 从 JSON 字符串解析、归一化并验证
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let mut config: RunConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }

    /// 将相对输入/输出路径解析到 `base` 下
    pub fn resolve_paths(&mut self, base: &Path) {
        self.inputs.resolve_against(base);
        if self.output.directory.is_relative() {
            self.output.directory = base.join(&self.output.directory);
        }
    }

    /// 修正可容忍的不一致参数，每项修正输出一条警告
    pub fn normalize(&mut self) {
        let erosion = &mut self.physics.erosion;
        let model = erosion.model;

        if !model.uses_coefficient() && erosion.coefficient != 0.0 {
            warn!("侵蚀模型 {:?} 不使用侵蚀系数，已置为 0", model);
            erosion.coefficient = 0.0;
        } else if model.uses_coefficient() && erosion.coefficient <= 0.0 {
            warn!(
                "侵蚀系数 {} 非正，模型 {:?} 将不产生侵蚀",
                erosion.coefficient, model
            );
            erosion.coefficient = 0.0;
        }

        if let BedStrengthProfile::Constant { mu_s } = &mut erosion.bed_strength {
            if *mu_s != 0.0 {
                warn!("常数床层强度剖面不使用床层摩擦系数，已将 mu_s={} 置为 0", mu_s);
                *mu_s = 0.0;
            }
        }

        if self.physics.effective_drag_depth < 0.0 {
            warn!(
                "有效拖曳深度 {} 为负，已置为 0",
                self.physics.effective_drag_depth
            );
            self.physics.effective_drag_depth = 0.0;
        }

        if self.physics.dynamic_surface && !model.is_active() {
            warn!("未启用侵蚀，动态地表已关闭");
            self.physics.dynamic_surface = false;
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        let p = &self.physics;
        let nm = &self.numerics;

        // 密度与重力
        positive("physics.flow_density", p.flow_density)?;
        positive("physics.bed_density", p.bed_density)?;
        positive("physics.deposit_density", p.deposit_density)?;
        if !(p.gravity >= 0.0) {
            return Err(ConfigError::invalid("physics.gravity", p.gravity, "重力不能为负"));
        }
        if !(p.earth_pressure_coefficient >= 0.0) {
            return Err(ConfigError::invalid(
                "physics.earth_pressure_coefficient",
                p.earth_pressure_coefficient,
                "土压力系数不能为负",
            ));
        }

        // 时间控制
        if !(nm.t_max >= 0.0) {
            return Err(ConfigError::invalid("numerics.t_max", nm.t_max, "模拟时长不能为负"));
        }
        if !(nm.dt_min > 0.0) || nm.dt_min > nm.dt_max {
            return Err(ConfigError::invalid(
                "numerics.dt_min",
                nm.dt_min,
                format!("需满足 0 < dt_min <= dt_max ({})", nm.dt_max),
            ));
        }
        positive("numerics.cfl", nm.cfl)?;
        positive("numerics.h_min", nm.h_min)?;
        positive("numerics.u_min", nm.u_min)?;
        positive("numerics.momentum_threshold", nm.momentum_threshold)?;
        if !(nm.retry_shrink > 0.0 && nm.retry_shrink < 1.0) {
            return Err(ConfigError::invalid(
                "numerics.retry_shrink",
                nm.retry_shrink,
                "缩减因子必须在 (0, 1) 内",
            ));
        }
        positive("output.interval", self.output.interval)?;

        // 必需输入
        if self.inputs.grid.as_os_str().is_empty() {
            return Err(ConfigError::missing("inputs.grid"));
        }
        if self.inputs.release_depth.as_os_str().is_empty() {
            return Err(ConfigError::missing("inputs.release_depth"));
        }

        // 摩擦参数
        match p.friction {
            FrictionParams::Constant { mu, k } => {
                if !(mu >= 0.0) || !(k >= 0.0) {
                    return Err(ConfigError::invalid(
                        "physics.friction",
                        format!("mu={mu}, k={k}"),
                        "常数摩擦参数不能为负",
                    ));
                }
            }
            FrictionParams::Variable => {
                require(&self.inputs.dry_friction, "inputs.dry_friction")?;
                require(&self.inputs.turbulent_drag, "inputs.turbulent_drag")?;
            }
        }

        // 侵蚀
        let erosion = &p.erosion;
        if erosion.model.is_active() {
            require(&self.inputs.bed_depth, "inputs.bed_depth")?;
        }
        if erosion.model.needs_bed_strength() {
            require(&self.inputs.bed_strength, "inputs.bed_strength")?;
            match erosion.bed_strength {
                BedStrengthProfile::Local => {
                    require(&self.inputs.bed_friction, "inputs.bed_friction")?;
                }
                BedStrengthProfile::Global { mu_s } if !(mu_s >= 0.0) => {
                    return Err(ConfigError::invalid(
                        "physics.erosion.bed_strength.mu_s",
                        mu_s,
                        "床层摩擦系数不能为负",
                    ));
                }
                _ => {}
            }
        }
        if erosion.model == ErosionKind::Goem && p.flow_density <= p.bed_density {
            return Err(ConfigError::Unsupported(format!(
                "Goem 侵蚀模型要求流体密度 ({}) 大于床层密度 ({})",
                p.flow_density, p.bed_density
            )));
        }

        // 森林
        if p.forest.enabled {
            require(&self.inputs.forest_density, "inputs.forest_density")?;
            require(&self.inputs.tree_diameter, "inputs.tree_diameter")?;
            positive("physics.forest.modulus_of_rupture_mpa", p.forest.modulus_of_rupture_mpa)?;
            if !(p.forest.tree_drag_coefficient >= 0.0) || !(p.forest.decay_coefficient >= 0.0) {
                return Err(ConfigError::invalid(
                    "physics.forest",
                    format!(
                        "c_D={}, decay={}",
                        p.forest.tree_drag_coefficient, p.forest.decay_coefficient
                    ),
                    "森林参数不能为负",
                ));
            }
        }

        Ok(())
    }
}

fn positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::invalid(key, value, "必须为正"))
    }
}

fn require(path: &Option<PathBuf>, key: &str) -> Result<(), ConfigError> {
    match path {
        Some(p) if !p.as_os_str().is_empty() => Ok(()),
        _ => Err(ConfigError::missing(key)),
    }
}
