// crates/lw_foundation/src/lib.rs

//! Lawina Foundation Layer
//!
//! 基础层，提供整个项目共享的最小抽象。
//!
//! # 模块概览
//!
//! - [`error`]: 统一错误类型
//! - [`grid`]: 按 `(i, j)` 索引的稠密二维场容器
//! - [`window`]: 轴对齐索引矩形（活动计算区域）
//!
//! # 设计原则
//!
//! 1. **极少依赖**: 仅依赖 serde 和 thiserror
//! 2. **单一所有权**: 所有场在模拟上下文中一次性分配，连续存储
//! 3. **索引约定**: `i` 为西→东列号，`j` 为南→北行号
//!
//! # 示例
//!
//! ```
//! use lw_foundation::{Grid2, IndexWindow, LwResult};
//!
//! let mut h: Grid2<f64> = Grid2::new(4, 3, 0.0);
//! h[(1, 2)] = 1.5;
//! assert_eq!(h.get(1, 2), Some(&1.5));
//!
//! let window = IndexWindow::full(4, 3);
//! assert_eq!(window.cell_count(), 12);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod grid;
pub mod window;

// 重导出常用类型
pub use error::{LwError, LwResult};
pub use grid::{Grid2, GridFrame};
pub use window::IndexWindow;
