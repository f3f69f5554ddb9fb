// crates/lw_io/src/error.rs

//! IO 错误类型定义
//!
//! 栅格读写的错误枚举，均可转换为 [`LwError`] 以跨层传递。

use std::path::PathBuf;

use lw_foundation::LwError;
use thiserror::Error;

/// IO 模块结果类型别名
pub type IoResult<T> = Result<T, IoError>;

/// IO 错误枚举
#[derive(Error, Debug)]
pub enum IoError {
    /// 底层读写失败
    #[error("读写失败: {path}: {source}")]
    Io {
        /// 文件路径
        path: PathBuf,
        /// 底层错误
        #[source]
        source: std::io::Error,
    },

    /// 文件解析错误
    #[error("文件解析错误: {file}:{line} - {message}")]
    Parse {
        /// 文件路径
        file: PathBuf,
        /// 行号（从 1 开始）
        line: usize,
        /// 错误信息
        message: String,
    },

    /// 栅格头与参考网格不一致
    #[error("栅格头不一致: {file} 的 {key} 为 {actual}, 参考网格为 {expected}")]
    HeaderMismatch {
        /// 文件路径
        file: PathBuf,
        /// 头字段名
        key: &'static str,
        /// 参考值
        expected: String,
        /// 实际值
        actual: String,
    },

    /// 数值低于允许下限
    #[error("数值低于下限: {file} 单元 ({i}, {j}) 为 {value}, 下限 {min}")]
    BelowBound {
        /// 文件路径
        file: PathBuf,
        /// 列号（西→东）
        i: usize,
        /// 行号（南→北）
        j: usize,
        /// 实际值
        value: f64,
        /// 下限
        min: f64,
    },

    /// 配置未给出必需的栅格
    #[error("缺少必需的栅格: {name}")]
    MissingRaster {
        /// 栅格名称
        name: &'static str,
    },

    /// 基础层错误
    #[error("基础层错误: {0}")]
    Foundation(#[from] LwError),
}

impl IoError {
    /// 包装底层 IO 错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// 解析错误
    pub fn parse(file: impl Into<PathBuf>, line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

impl From<IoError> for LwError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Io { path, source } => {
                if source.kind() == std::io::ErrorKind::NotFound {
                    LwError::file_not_found(path)
                } else {
                    LwError::io_with_source(format!("{}", path.display()), source)
                }
            }
            IoError::Parse { file, line, message } => LwError::parse(file, line, message),
            IoError::HeaderMismatch { file, key, expected, actual } => LwError::invalid_input(format!(
                "栅格头不一致 [{}]: {key} 为 {actual}, 参考网格为 {expected}",
                file.display()
            )),
            IoError::BelowBound { file, i, j, value, min } => LwError::invalid_input(format!(
                "数值低于下限 [{}]: 单元 ({i}, {j}) 为 {value}, 下限 {min}",
                file.display()
            )),
            IoError::MissingRaster { name } => LwError::missing_field(name),
            IoError::Foundation(err) => err,
        }
    }
}
