// crates/lw_io/src/lib.rs

//! Lawina IO Layer
//!
//! 栅格输入与快照输出。
//!
//! # 模块概览
//!
//! - [`ascii_grid`]: ESRI ASCII 栅格读写
//! - [`site`]: 按运行配置读入输入栅格
//! - [`writer`]: 实现 `SnapshotSink` 的 ASCII 写出器
//! - [`error`]: IO 错误类型

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ascii_grid;
pub mod error;
pub mod site;
pub mod writer;

pub use ascii_grid::{read_aligned, read_ascii_grid, write_ascii_grid, AsciiGrid};
pub use error::{IoError, IoResult};
pub use site::load_site;
pub use writer::AsciiSnapshotWriter;
