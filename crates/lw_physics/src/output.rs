// crates/lw_physics/src/output.rs

//! 输出快照
//!
//! 数值核心只产出 SI 单位的场（压力为 Pa），按输出习惯的换算
//! （压力 kPa）由 [`FieldKind::display_scale`] 给出，写出端负责应用。
//! 具体文件格式由实现 [`SnapshotSink`] 的写出器决定。

use lw_foundation::{Grid2, IndexWindow, LwResult};
use serde::Serialize;

/// 输出场类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    /// 流深 [m]
    Depth,
    /// 速率 [m/s]
    Speed,
    /// x 向速度 [m/s]
    VelocityX,
    /// y 向速度 [m/s]
    VelocityY,
    /// 冲击压力 [Pa]
    Pressure,
    /// 可侵蚀床层深度 [m]
    BedDepth,
    /// 沉积深度 [m]
    Deposit,
    /// 森林不透明度 [1/m]
    ForestDensity,
}

impl FieldKind {
    /// 短名（目录名与文件名后缀）
    pub fn key(self) -> &'static str {
        match self {
            Self::Depth => "h",
            Self::Speed => "s",
            Self::VelocityX => "u",
            Self::VelocityY => "v",
            Self::Pressure => "p",
            Self::BedDepth => "b",
            Self::Deposit => "d",
            Self::ForestDensity => "n",
        }
    }

    /// 写出时的数值缩放
    pub fn display_scale(self) -> f64 {
        match self {
            Self::Pressure => 1.0e-3,
            _ => 1.0,
        }
    }

    /// 说明文字
    pub fn description(self) -> &'static str {
        match self {
            Self::Depth => "flow depth (m)",
            Self::Speed => "flow speed (m/s)",
            Self::VelocityX => "x-velocity (m/s)",
            Self::VelocityY => "y-velocity (m/s)",
            Self::Pressure => "impact pressure (kPa)",
            Self::BedDepth => "erodible bed depth (m)",
            Self::Deposit => "deposit depth (m)",
            Self::ForestDensity => "forest opacity (1/m)",
        }
    }
}

/// 单个输出层
#[derive(Debug, Clone, PartialEq)]
pub struct OutputLayer {
    /// 场类型
    pub kind: FieldKind,
    /// 标签（切片为短名，极值为 `h_max` 等）
    pub label: String,
    /// 在全网格中的位置
    pub window: IndexWindow,
    /// 窗口内数据（SI 单位）
    pub data: Grid2<f64>,
}

impl OutputLayer {
    /// 截取全网格场的窗口
    pub fn from_field(
        kind: FieldKind,
        label: impl Into<String>,
        field: &Grid2<f64>,
        window: IndexWindow,
    ) -> Self {
        Self {
            kind,
            label: label.into(),
            window,
            data: field.window(&window),
        }
    }
}

/// 时间切片
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSlice {
    /// 序号（从 0 开始）
    pub index: usize,
    /// 模拟时间 [s]
    pub time: f64,
    /// 各输出层
    pub layers: Vec<OutputLayer>,
}

/// 运行结束时的极值集合（全网格）
#[derive(Debug, Clone, PartialEq)]
pub struct MaximaSet {
    /// 结束时间 [s]
    pub time: f64,
    /// 各输出层
    pub layers: Vec<OutputLayer>,
}

impl MaximaSet {
    /// 按标签查找
    pub fn layer(&self, label: &str) -> Option<&OutputLayer> {
        self.layers.iter().find(|l| l.label == label)
    }
}

/// 快照接收端
pub trait SnapshotSink {
    /// 写出时间切片
    fn write_slice(&mut self, slice: &TimeSlice) -> LwResult<()>;

    /// 写出极值集合
    fn write_maxima(&mut self, maxima: &MaximaSet) -> LwResult<()>;
}

/// 内存接收端，保存全部快照
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    /// 时间切片
    pub slices: Vec<TimeSlice>,
    /// 极值
    pub maxima: Option<MaximaSet>,
}

impl SnapshotSink for MemorySink {
    fn write_slice(&mut self, slice: &TimeSlice) -> LwResult<()> {
        self.slices.push(slice.clone());
        Ok(())
    }

    fn write_maxima(&mut self, maxima: &MaximaSet) -> LwResult<()> {
        self.maxima = Some(maxima.clone());
        Ok(())
    }
}
