// crates/lw_config/src/error.rs

//! 配置层错误类型

use lw_foundation::LwError;

/// 配置错误
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析错误
    #[error("解析错误: {0}")]
    Parse(String),

    /// 无效值
    #[error("无效值 '{key}': {value} - {reason}")]
    InvalidValue {
        /// 配置键
        key: String,
        /// 配置值
        value: String,
        /// 原因
        reason: String,
    },

    /// 缺失配置
    #[error("缺失配置: {0}")]
    Missing(String),

    /// 不支持的模型组合
    #[error("不支持的配置: {0}")]
    Unsupported(String),
}

impl ConfigError {
    /// 无效值的便捷构造
    pub fn invalid(key: &str, value: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    /// 缺失配置的便捷构造
    pub fn missing(key: &str) -> Self {
        Self::Missing(key.to_string())
    }
}

impl From<ConfigError> for LwError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Io(e) => LwError::io_with_source("读取配置文件失败", e),
            other => LwError::config(other.to_string()),
        }
    }
}
