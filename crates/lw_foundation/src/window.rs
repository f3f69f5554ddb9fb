// crates/lw_foundation/src/window.rs

//! 活动区域索引矩形
//!
//! `[i_min, i_max) × [j_min, j_max)`；当 `i_min >= i_max` 或 `j_min >= j_max`
//! 时窗口为空，遍历不产生任何单元。

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// 轴对齐索引矩形
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexWindow {
    /// 西边界（含）
    pub i_min: usize,
    /// 东边界（不含）
    pub i_max: usize,
    /// 南边界（含）
    pub j_min: usize,
    /// 北边界（不含）
    pub j_max: usize,
}

impl IndexWindow {
    /// 创建窗口
    pub fn new(i_min: usize, i_max: usize, j_min: usize, j_max: usize) -> Self {
        Self {
            i_min,
            i_max,
            j_min,
            j_max,
        }
    }

    /// 覆盖整个 `m × n` 网格
    pub fn full(m: usize, n: usize) -> Self {
        Self::new(0, m, 0, n)
    }

    /// `i` 方向范围
    #[inline]
    pub fn i_range(&self) -> Range<usize> {
        self.i_min..self.i_max
    }

    /// `j` 方向范围
    #[inline]
    pub fn j_range(&self) -> Range<usize> {
        self.j_min..self.j_max
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.i_min >= self.i_max || self.j_min >= self.j_max
    }

    /// `i` 方向单元数
    #[inline]
    pub fn width(&self) -> usize {
        self.i_max.saturating_sub(self.i_min)
    }

    /// `j` 方向单元数
    #[inline]
    pub fn height(&self) -> usize {
        self.j_max.saturating_sub(self.j_min)
    }

    /// 单元数
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.width() * self.height()
    }

    /// 是否包含单元
    #[inline]
    pub fn contains(&self, i: usize, j: usize) -> bool {
        i >= self.i_min && i < self.i_max && j >= self.j_min && j < self.j_max
    }

    /// 向四周扩展 `margin` 个单元，并裁剪到 `m × n`
    pub fn grown(&self, margin: usize, m: usize, n: usize) -> Self {
        if self.is_empty() {
            return *self;
        }
        Self::new(
            self.i_min.saturating_sub(margin),
            (self.i_max + margin).min(m),
            self.j_min.saturating_sub(margin),
            (self.j_max + margin).min(n),
        )
    }

    /// 是否完全位于 `other` 内（空窗口视为被任何窗口包含）
    pub fn is_within(&self, other: &IndexWindow) -> bool {
        self.is_empty()
            || (self.i_min >= other.i_min
                && self.i_max <= other.i_max
                && self.j_min >= other.j_min
                && self.j_max <= other.j_max)
    }

    /// 按栅格顺序遍历（外层 i，内层 j）
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.i_range()
            .flat_map(move |i| self.j_range().map(move |j| (i, j)))
    }
}
