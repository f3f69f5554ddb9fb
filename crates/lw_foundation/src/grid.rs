// crates/lw_foundation/src/grid.rs

//! 稠密二维场容器
//!
//! 以 `(i, j)` 索引的连续存储，`i` 为外层（西→东），`j` 为内层（南→北），
//! 与求解器的栅格遍历顺序一致。

use crate::error::{LwError, LwResult};
use crate::window::IndexWindow;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// 栅格地理参照
///
/// 左下角坐标与投影网格尺寸；`m × n` 为单元数。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridFrame {
    /// 列数（西→东）
    pub m: usize,
    /// 行数（南→北）
    pub n: usize,
    /// 左下角 x 坐标
    pub xll: f64,
    /// 左下角 y 坐标
    pub yll: f64,
    /// 水平投影网格尺寸
    pub cellsize: f64,
}

impl GridFrame {
    /// 两个参照是否描述同一网格（坐标容差 1e-3，尺寸容差 1e-4）
    pub fn matches(&self, other: &GridFrame) -> bool {
        self.m == other.m
            && self.n == other.n
            && (self.cellsize - other.cellsize).abs() <= 1e-4
            && (self.xll - other.xll).abs() <= 1e-3
            && (self.yll - other.yll).abs() <= 1e-3
    }

    /// 窗口对应的子参照
    pub fn sub_frame(&self, window: &IndexWindow) -> GridFrame {
        GridFrame {
            m: window.width(),
            n: window.height(),
            xll: self.xll + window.i_min as f64 * self.cellsize,
            yll: self.yll + window.j_min as f64 * self.cellsize,
            cellsize: self.cellsize,
        }
    }
}

/// 二维场
///
/// 尺寸在创建后不变；越界访问 `grid[(i, j)]` 会 panic，
/// 需要容错时使用 [`Grid2::get`]。
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2<T> {
    m: usize,
    n: usize,
    data: Vec<T>,
}

impl<T: Clone> Grid2<T> {
    /// 创建以 `value` 填充的场
    pub fn new(m: usize, n: usize, value: T) -> Self {
        Self {
            m,
            n,
            data: vec![value; m * n],
        }
    }

    /// 用同一值覆盖全部单元
    pub fn fill(&mut self, value: T) {
        self.data.iter_mut().for_each(|x| *x = value.clone());
    }

    /// 从同尺寸场复制全部数据（不重新分配）
    pub fn copy_from(&mut self, other: &Grid2<T>) {
        debug_assert_eq!(self.shape(), other.shape());
        self.data.clone_from_slice(&other.data);
    }

    /// 提取窗口内的子场（用于分窗口输出）
    pub fn window(&self, window: &IndexWindow) -> Grid2<T> {
        let (wi, wj) = (window.width(), window.height());
        let mut data = Vec::with_capacity(wi * wj);
        for i in window.i_range() {
            for j in window.j_range() {
                data.push(self[(i, j)].clone());
            }
        }
        Self { m: wi, n: wj, data }
    }
}

impl<T> Grid2<T> {
    /// 从按 `i * n + j` 排列的数据创建
    pub fn from_vec(m: usize, n: usize, data: Vec<T>) -> LwResult<Self> {
        if data.len() != m * n {
            return Err(LwError::size_mismatch("grid data", m * n, data.len()));
        }
        Ok(Self { m, n, data })
    }

    /// 列数（西→东）
    #[inline]
    pub fn m(&self) -> usize {
        self.m
    }

    /// 行数（南→北）
    #[inline]
    pub fn n(&self) -> usize {
        self.n
    }

    /// (m, n)
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.m, self.n)
    }

    /// 单元总数
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 线性偏移
    #[inline]
    pub fn offset(&self, i: usize, j: usize) -> usize {
        i * self.n + j
    }

    /// 带边界检查的读取
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Option<&T> {
        if i < self.m && j < self.n {
            self.data.get(i * self.n + j)
        } else {
            None
        }
    }

    /// 带边界检查的可变读取
    #[inline]
    pub fn get_mut(&mut self, i: usize, j: usize) -> Option<&mut T> {
        if i < self.m && j < self.n {
            self.data.get_mut(i * self.n + j)
        } else {
            None
        }
    }

    /// 底层切片
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// 底层可变切片
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// 是否与给定尺寸一致
    #[inline]
    pub fn has_shape(&self, m: usize, n: usize) -> bool {
        self.m == m && self.n == n
    }

    /// 逐单元映射为新场
    pub fn map<U>(&self, f: impl Fn(&T) -> U) -> Grid2<U> {
        Grid2 {
            m: self.m,
            n: self.n,
            data: self.data.iter().map(f).collect(),
        }
    }
}

impl Grid2<f64> {
    /// 所有单元之和
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    /// 最大值（空场返回 `f64::NEG_INFINITY`）
    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

impl<T> Index<(usize, usize)> for Grid2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &T {
        debug_assert!(i < self.m && j < self.n, "grid index ({i}, {j}) out of {}x{}", self.m, self.n);
        &self.data[i * self.n + j]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid2<T> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        debug_assert!(i < self.m && j < self.n, "grid index ({i}, {j}) out of {}x{}", self.m, self.n);
        &mut self.data[i * self.n + j]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_column_major_in_i() {
        let g = Grid2::from_vec(2, 3, vec![0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(g[(0, 2)], 2);
        assert_eq!(g[(1, 0)], 3);
        assert_eq!(g.offset(1, 1), 4);
    }

    #[test]
    fn test_from_vec_size_mismatch() {
        let err = Grid2::from_vec(2, 2, vec![1.0; 3]).unwrap_err();
        assert!(matches!(err, LwError::SizeMismatch { expected: 4, actual: 3, .. }));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let g: Grid2<f64> = Grid2::new(2, 2, 1.0);
        assert!(g.get(2, 0).is_none());
        assert!(g.get(0, 2).is_none());
        assert_eq!(g.get(1, 1), Some(&1.0));
    }

    #[test]
    fn test_window_extract() {
        let mut g: Grid2<f64> = Grid2::new(4, 4, 0.0);
        g[(2, 1)] = 7.0;
        let w = IndexWindow::new(1, 3, 1, 3);
        let sub = g.window(&w);
        assert_eq!(sub.shape(), (2, 2));
        assert_eq!(sub[(1, 0)], 7.0);
    }

    #[test]
    fn test_sub_frame() {
        let frame = GridFrame { m: 10, n: 8, xll: 1000.0, yll: 2000.0, cellsize: 5.0 };
        let sub = frame.sub_frame(&IndexWindow::new(2, 6, 1, 3));
        assert_eq!((sub.m, sub.n), (4, 2));
        assert!((sub.xll - 1010.0).abs() < 1e-12);
        assert!((sub.yll - 2005.0).abs() < 1e-12);
        assert!(frame.matches(&GridFrame { xll: 1000.0005, ..frame }));
        assert!(!frame.matches(&GridFrame { m: 11, ..frame }));
    }

    #[test]
    fn test_sum_and_max() {
        let g = Grid2::from_vec(1, 3, vec![1.0, -2.0, 4.0]).unwrap();
        assert!((g.sum() - 3.0).abs() < 1e-12);
        assert_eq!(g.max_value(), 4.0);
    }
}
